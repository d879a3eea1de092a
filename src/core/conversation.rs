//! Ordered conversation log with a single in-progress entry.

use super::message::{Turn, TurnId, TurnRole};

#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<Turn>,
    next_id: TurnId,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: TurnRole, content: impl Into<String>) -> TurnId {
        let id = self.allocate_id();
        self.turns.push(Turn::new(id, role, content));
        id
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) -> TurnId {
        self.push(TurnRole::User, content)
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) -> TurnId {
        self.push(TurnRole::System, content)
    }

    pub fn add_info_message(&mut self, content: impl Into<String>) -> TurnId {
        self.push(TurnRole::Info, content)
    }

    pub fn add_error_message(&mut self, content: impl Into<String>) -> TurnId {
        self.push(TurnRole::Error, content)
    }

    /// Open an empty streaming assistant turn. Any turn still marked as
    /// streaming is finalized first so at most one is ever in progress.
    pub fn begin_streaming(&mut self) -> TurnId {
        self.finish_streaming();
        let id = self.allocate_id();
        let mut turn = Turn::new(id, TurnRole::Assistant, String::new());
        turn.is_streaming = true;
        self.turns.push(turn);
        id
    }

    /// Append a fragment to the in-progress turn. Returns false when no turn
    /// is streaming.
    pub fn append_to_streaming(&mut self, fragment: &str) -> bool {
        match self.streaming_turn_mut() {
            Some(turn) => {
                turn.content.push_str(fragment);
                true
            }
            None => false,
        }
    }

    pub fn finish_streaming(&mut self) -> Option<&Turn> {
        let index = self.turns.iter().rposition(|turn| turn.is_streaming)?;
        let turn = &mut self.turns[index];
        turn.is_streaming = false;
        Some(turn)
    }

    pub fn streaming_turn(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|turn| turn.is_streaming)
    }

    fn streaming_turn_mut(&mut self) -> Option<&mut Turn> {
        self.turns.iter_mut().rev().find(|turn| turn.is_streaming)
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn count_role(&self, role: TurnRole) -> usize {
        self.turns.iter().filter(|turn| turn.role == role).count()
    }

    fn allocate_id(&mut self) -> TurnId {
        self.next_id += 1;
        self.next_id
    }
}
