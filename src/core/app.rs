//! Session-scoped state shared by the command interpreter and the chat loop.

use tracing::debug;

use super::constants::{DIRECTORY, MACHINE_NAME, PROMPT_SYMBOL};
use super::context::{ContextId, ContextStore, DocumentContext};
use super::conversation::ConversationLog;
use super::input_history::InputHistory;
use super::message::Turn;
use super::modes::Mode;
use super::preview::extract_preview;
use super::session::SessionConfig;

/// Which side panels are open. The document viewer points at a stored
/// context; the preview holds the last extracted html/svg body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub document: Option<ContextId>,
    pub preview: Option<String>,
    /// Bumped every time the viewer is asked to show a document, even the
    /// one already on screen.
    pub document_shown: u64,
}

impl PanelState {
    pub fn close_all(&mut self) {
        self.document = None;
        self.preview = None;
    }

    pub fn any_open(&self) -> bool {
        self.document.is_some() || self.preview.is_some()
    }
}

/// Values `connect` falls back to when arguments are omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDefaults {
    pub cloud_model: String,
    pub local_model: String,
    pub local_url: String,
}

pub struct App {
    pub session: SessionConfig,
    pub conversation: ConversationLog,
    pub contexts: ContextStore,
    pub mode: Mode,
    pub panels: PanelState,
    pub input_history: InputHistory,
    pub defaults: ConnectionDefaults,
}

impl App {
    pub fn new(session: SessionConfig, defaults: ConnectionDefaults) -> Self {
        Self {
            session,
            conversation: ConversationLog::new(),
            contexts: ContextStore::new(),
            mode: Mode::default(),
            panels: PanelState::default(),
            input_history: InputHistory::new(),
            defaults,
        }
    }

    /// Switch mode and push its instruction into the session config. Any
    /// live preview belongs to the old mode and is closed.
    pub fn set_mode(&mut self, mode: Mode) {
        debug!(from = self.mode.id(), to = mode.id(), "switching mode");
        self.mode = mode;
        self.session.set_instruction(mode.instruction());
        self.panels.preview = None;
    }

    /// Drop the cloud session and all uploaded context, back to chat mode.
    pub fn reset_session(&mut self) {
        self.contexts.clear();
        self.set_mode(Mode::Chat);
        self.session.invalidate_session();
        self.panels.close_all();
    }

    pub fn clear_conversation(&mut self) {
        self.conversation.clear();
        self.panels.close_all();
    }

    pub fn show_document(&mut self, id: ContextId) {
        self.panels.document = Some(id);
        self.panels.document_shown += 1;
    }

    /// Drop one stored context. The viewer closes if it was showing it.
    pub fn remove_context(&mut self, id: ContextId) -> bool {
        let removed = self.contexts.remove(id);
        if removed && self.panels.document == Some(id) {
            self.panels.document = None;
        }
        removed
    }

    /// Document currently shown in the viewer, if it still exists.
    pub fn open_document(&self) -> Option<&DocumentContext> {
        self.panels.document.and_then(|id| self.contexts.find(id))
    }

    /// Record the user's line and open an empty assistant turn. Returns the
    /// turns that preceded the line, which is the history sent with it.
    pub fn start_chat_turn(&mut self, message: &str) -> Vec<Turn> {
        let history = self.conversation.turns().to_vec();
        self.conversation.add_user_message(message);
        self.conversation.begin_streaming();
        history
    }

    pub fn append_fragment(&mut self, fragment: &str) {
        self.conversation.append_to_streaming(fragment);
    }

    /// Close the streaming turn. In code mode the last html/svg block of
    /// the reply becomes the live preview; returns true when it changed.
    pub fn finish_chat_turn(&mut self) -> bool {
        let mode = self.mode;
        let Some(turn) = self.conversation.finish_streaming() else {
            return false;
        };
        if mode != Mode::Code {
            return false;
        }
        match extract_preview(&turn.content) {
            Some(body) => {
                debug!(bytes = body.len(), "updated live preview");
                self.panels.preview = Some(body);
                true
            }
            None => false,
        }
    }

    /// `local ~ [gemini:chat] ➜`
    pub fn prompt_label(&self) -> String {
        format!(
            "{MACHINE_NAME} {DIRECTORY} [{}:{}] {PROMPT_SYMBOL} ",
            self.session.provider().id(),
            self.mode.id()
        )
    }
}
