//! Line-oriented rendering of the transcript and side panels.
//!
//! Nothing here redraws the screen: new turns are appended below the prompt
//! and panels are printed when they open, change, or close.

use std::io::{self, Write};
use std::path::PathBuf;

use ratatui::crossterm::{
    cursor::MoveTo,
    queue,
    style::Stylize,
    terminal::{Clear, ClearType},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::app::{App, PanelState};
use crate::core::context::{ContextId, DocumentContext};
use crate::core::conversation::ConversationLog;
use crate::core::message::{Turn, TurnId, TurnRole};

/// Body lines shown by the document lens before it is cut off.
pub const LENS_MAX_LINES: usize = 24;

/// Remembers which turns already reached the terminal.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    last_printed: Option<TurnId>,
    showing_turns: bool,
}

#[derive(Debug, Default)]
pub struct TranscriptUpdate<'a> {
    /// The log was emptied since the last sync.
    pub cleared: bool,
    pub turns: Vec<&'a Turn>,
}

impl TranscriptPrinter {
    /// Turns added since the previous call. User and assistant turns are
    /// skipped; the line editor already echoed the one and the other was
    /// streamed as it arrived.
    pub fn sync<'a>(&mut self, log: &'a ConversationLog) -> TranscriptUpdate<'a> {
        let cleared = self.showing_turns && log.is_empty();
        if cleared {
            self.showing_turns = false;
        }

        let last = self.last_printed;
        let fresh: Vec<&Turn> = log
            .turns()
            .iter()
            .filter(|turn| last.map_or(true, |id| turn.id > id))
            .collect();
        if let Some(turn) = fresh.last() {
            self.last_printed = Some(turn.id);
            self.showing_turns = true;
        }

        TranscriptUpdate {
            cleared,
            turns: fresh
                .into_iter()
                .filter(|turn| !matches!(turn.role, TurnRole::User | TurnRole::Assistant))
                .collect(),
        }
    }

    pub fn flush<W: Write>(&mut self, log: &ConversationLog, out: &mut W) -> io::Result<()> {
        let update = self.sync(log);
        if update.cleared {
            queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        for turn in update.turns {
            print_turn(out, turn)?;
        }
        out.flush()
    }
}

pub fn print_turn<W: Write>(out: &mut W, turn: &Turn) -> io::Result<()> {
    match turn.role {
        TurnRole::System => writeln!(out, "{}", turn.content.as_str().dark_grey())?,
        TurnRole::Info => writeln!(out, "{}", turn.content.as_str().cyan())?,
        TurnRole::Error => writeln!(out, "{}", turn.content.as_str().red())?,
        TurnRole::User => writeln!(out, "{}", turn.content.as_str().bold())?,
        TurnRole::Assistant => writeln!(out, "{}", turn.content)?,
    }
    writeln!(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelChange {
    DocumentOpened(ContextId),
    DocumentClosed,
    PreviewUpdated,
    PreviewClosed,
}

pub fn diff_panels(before: &PanelState, after: &PanelState) -> Vec<PanelChange> {
    let mut changes = Vec::new();
    let reshown = before.document_shown != after.document_shown;
    match (before.document, after.document) {
        (_, Some(id)) if reshown || before.document != Some(id) => {
            changes.push(PanelChange::DocumentOpened(id))
        }
        (Some(_), None) => changes.push(PanelChange::DocumentClosed),
        _ => {}
    }
    match (&before.preview, &after.preview) {
        (_, Some(body)) if before.preview.as_ref() != Some(body) => {
            changes.push(PanelChange::PreviewUpdated)
        }
        (Some(_), None) => changes.push(PanelChange::PreviewClosed),
        _ => {}
    }
    changes
}

/// Print whatever panels opened, changed, or closed between two snapshots.
pub fn print_panel_changes<W: Write>(
    out: &mut W,
    app: &App,
    before: &PanelState,
    width: usize,
) -> io::Result<()> {
    for change in diff_panels(before, &app.panels) {
        match change {
            PanelChange::DocumentOpened(_) => {
                if let Some(document) = app.open_document() {
                    for line in render_lens(document, width) {
                        writeln!(out, "{}", line.as_str().yellow())?;
                    }
                    writeln!(out)?;
                }
            }
            PanelChange::DocumentClosed => {
                writeln!(out, "{}\n", "[document lens closed]".dark_grey())?
            }
            PanelChange::PreviewUpdated => {
                if let Some(body) = &app.panels.preview {
                    match write_preview(body) {
                        Ok(path) => writeln!(
                            out,
                            "{} {}\n",
                            "[live preview]".magenta().bold(),
                            path.display()
                        )?,
                        Err(err) => writeln!(
                            out,
                            "{}\n",
                            format!("Could not write preview: {err}").red()
                        )?,
                    }
                }
            }
            PanelChange::PreviewClosed => {
                writeln!(out, "{}\n", "[live preview closed]".dark_grey())?
            }
        }
    }
    out.flush()
}

/// Framed view of a stored document: header, then at most
/// [`LENS_MAX_LINES`] body lines clipped to `width` columns.
pub fn render_lens(document: &DocumentContext, width: usize) -> Vec<String> {
    let inner = width.saturating_sub(2).max(10);
    let mut lines = vec![format!(
        "┌─ {} · {} · {} chars",
        document.name(),
        document.type_label(),
        document.char_count()
    )];

    let body: Vec<&str> = document.content().lines().collect();
    for line in body.iter().take(LENS_MAX_LINES) {
        lines.push(format!("│ {}", clip_to_width(line, inner)));
    }
    if body.len() > LENS_MAX_LINES {
        lines.push(format!("└─ … {} more lines", body.len() - LENS_MAX_LINES));
    } else {
        lines.push("└─".to_string());
    }
    lines
}

fn clip_to_width(line: &str, width: usize) -> String {
    if UnicodeWidthStr::width(line) <= width {
        return line.to_string();
    }
    let mut clipped = String::new();
    let mut used = 0;
    for c in line.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        clipped.push(c);
    }
    clipped.push('…');
    clipped
}

/// Persist the preview body as an `.html` file a browser can open.
pub fn write_preview(body: &str) -> io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("neuralterm-preview-")
        .suffix(".html")
        .tempfile()?;
    file.write_all(body.as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|err| err.error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{ContextStore, ExtractedDocument};

    fn stored(content: &str) -> DocumentContext {
        let mut store = ContextStore::new();
        store
            .add(ExtractedDocument {
                name: "notes.md".to_string(),
                mime_type: "text/markdown".to_string(),
                content: content.to_string(),
            })
            .clone()
    }

    #[test]
    fn printer_reports_only_new_local_turns() {
        let mut log = ConversationLog::new();
        let mut printer = TranscriptPrinter::default();
        log.add_system_message("greeting");

        let update = printer.sync(&log);
        assert!(!update.cleared);
        assert_eq!(update.turns.len(), 1);

        log.add_user_message("hi");
        log.push(TurnRole::Assistant, "hello");
        log.add_error_message("boom");
        let update = printer.sync(&log);
        let roles: Vec<TurnRole> = update.turns.iter().map(|turn| turn.role).collect();
        assert_eq!(roles, vec![TurnRole::Error]);

        assert!(printer.sync(&log).turns.is_empty());
    }

    #[test]
    fn printer_notices_clear() {
        let mut log = ConversationLog::new();
        let mut printer = TranscriptPrinter::default();
        log.add_info_message("help text");
        printer.sync(&log);

        log.clear();
        assert!(printer.sync(&log).cleared);
        assert!(!printer.sync(&log).cleared);

        log.add_system_message("after");
        let update = printer.sync(&log);
        assert_eq!(update.turns.len(), 1);
        assert_eq!(update.turns[0].content, "after");
    }

    #[test]
    fn panel_diffs() {
        let closed = PanelState::default();
        let open = PanelState {
            document: Some(3),
            preview: Some("<svg/>".to_string()),
            ..PanelState::default()
        };
        assert_eq!(
            diff_panels(&closed, &open),
            vec![PanelChange::DocumentOpened(3), PanelChange::PreviewUpdated]
        );
        assert_eq!(
            diff_panels(&open, &closed),
            vec![PanelChange::DocumentClosed, PanelChange::PreviewClosed]
        );
        assert!(diff_panels(&open, &open.clone()).is_empty());

        let replaced = PanelState {
            document: Some(4),
            preview: Some("<p>new</p>".to_string()),
            ..PanelState::default()
        };
        assert_eq!(
            diff_panels(&open, &replaced),
            vec![PanelChange::DocumentOpened(4), PanelChange::PreviewUpdated]
        );
    }

    #[test]
    fn reopening_same_document_prints_lens_again() {
        let showing = PanelState {
            document: Some(2),
            document_shown: 1,
            ..PanelState::default()
        };
        let reshown = PanelState {
            document_shown: 2,
            ..showing.clone()
        };
        assert_eq!(
            diff_panels(&showing, &reshown),
            vec![PanelChange::DocumentOpened(2)]
        );
    }

    #[test]
    fn lens_frames_and_truncates() {
        let content = (1..=30)
            .map(|n| format!("line {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        let lines = render_lens(&stored(&content), 80);
        assert_eq!(lines[0], format!("┌─ notes.md · MARKDOWN · {} chars", content.chars().count()));
        assert_eq!(lines[1], "│ line 1");
        assert_eq!(lines.len(), LENS_MAX_LINES + 2);
        assert_eq!(lines.last().map(String::as_str), Some("└─ … 6 more lines"));
    }

    #[test]
    fn lens_clips_wide_lines() {
        let lines = render_lens(&stored(&"x".repeat(100)), 22);
        assert_eq!(lines[1], format!("│ {}…", "x".repeat(19)));
        assert_eq!(lines.last().map(String::as_str), Some("└─"));
    }

    #[test]
    fn preview_file_holds_body() {
        let path = write_preview("<svg></svg>").unwrap();
        assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("html"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg></svg>");
        std::fs::remove_file(path).unwrap();
    }
}
