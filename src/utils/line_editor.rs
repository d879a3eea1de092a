//! Raw-mode single-line editor for the chat prompt, with input recall.

use crate::core::input_history::InputHistory;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::io::{self, Write};
use thiserror::Error;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEditorState {
    pub text: String,
    pub cursor: usize,
}

impl LineEditorState {
    pub fn with_text(text: String) -> Self {
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    fn replace(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEditAction {
    Insert(char),
    Backspace,
    Delete,
    MoveLeft,
    MoveRight,
    MoveStart,
    MoveEnd,
    DeleteToEnd,
    DeleteWord,
    ClearAll,
    HistoryPrevious,
    HistoryNext,
    Paste(String),
    Submit,
    /// Ctrl+C, or Ctrl+D on an empty line.
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEditOutcome {
    Continue { redraw: bool },
    Submit(String),
    Quit,
}

#[derive(Debug, Error)]
#[error("terminal input failed: {0}")]
pub struct LineEditorError(#[from] io::Error);

/// Read one line. `Ok(None)` means the user asked to quit.
pub fn prompt_line(
    prompt: &str,
    history: &mut InputHistory,
) -> Result<Option<String>, LineEditorError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, event::EnableBracketedPaste)?;

    let result = read_until_submit(prompt, history);

    let disable_raw_result = disable_raw_mode();
    let disable_paste_result = execute!(stdout, event::DisableBracketedPaste);
    println!();

    let line = result?;
    disable_raw_result?;
    disable_paste_result?;
    Ok(line)
}

fn read_until_submit(
    prompt: &str,
    history: &mut InputHistory,
) -> Result<Option<String>, LineEditorError> {
    let mut state = LineEditorState::default();
    let mut needs_redraw = true;

    loop {
        if needs_redraw {
            redraw_line(prompt, &state)?;
        }

        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                map_key_event_to_action(&key, &state)
            }
            Event::Paste(text) => Some(LineEditAction::Paste(text)),
            Event::Resize(_, _) => {
                needs_redraw = true;
                continue;
            }
            _ => None,
        };
        let Some(action) = action else {
            needs_redraw = false;
            continue;
        };

        match apply_line_edit_action(&mut state, action, history) {
            LineEditOutcome::Continue { redraw } => needs_redraw = redraw,
            LineEditOutcome::Submit(value) => {
                redraw_line(prompt, &state)?;
                return Ok(Some(value));
            }
            LineEditOutcome::Quit => return Ok(None),
        }
    }
}

fn redraw_line(prompt: &str, state: &LineEditorState) -> io::Result<()> {
    let prefix: String = state.text.chars().take(state.cursor).collect();
    let cursor_columns = UnicodeWidthStr::width(prompt) + UnicodeWidthStr::width(prefix.as_str());

    let mut stdout = io::stdout();
    write!(stdout, "\r\x1b[K{}{}", prompt, state.text)?;
    if cursor_columns > 0 {
        write!(stdout, "\r\x1b[{}C", cursor_columns)?;
    } else {
        write!(stdout, "\r")?;
    }
    stdout.flush()
}

pub fn map_key_event_to_action(key: &KeyEvent, state: &LineEditorState) -> Option<LineEditAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => Some(LineEditAction::Submit),
        KeyCode::Esc => Some(LineEditAction::ClearAll),
        KeyCode::Backspace => Some(LineEditAction::Backspace),
        KeyCode::Delete => Some(LineEditAction::Delete),
        KeyCode::Left => Some(LineEditAction::MoveLeft),
        KeyCode::Right => Some(LineEditAction::MoveRight),
        KeyCode::Home => Some(LineEditAction::MoveStart),
        KeyCode::End => Some(LineEditAction::MoveEnd),
        KeyCode::Up => Some(LineEditAction::HistoryPrevious),
        KeyCode::Down => Some(LineEditAction::HistoryNext),
        KeyCode::Char('a') if ctrl => Some(LineEditAction::MoveStart),
        KeyCode::Char('e') if ctrl => Some(LineEditAction::MoveEnd),
        KeyCode::Char('k') if ctrl => Some(LineEditAction::DeleteToEnd),
        KeyCode::Char('w') if ctrl => Some(LineEditAction::DeleteWord),
        KeyCode::Char('u') if ctrl => Some(LineEditAction::ClearAll),
        KeyCode::Char('p') if ctrl => Some(LineEditAction::HistoryPrevious),
        KeyCode::Char('n') if ctrl => Some(LineEditAction::HistoryNext),
        KeyCode::Char('c') if ctrl => Some(LineEditAction::Quit),
        KeyCode::Char('d') if ctrl && state.text.is_empty() => Some(LineEditAction::Quit),
        KeyCode::Char('d') if ctrl => Some(LineEditAction::Delete),
        KeyCode::Char(c) if !ctrl => match c {
            '\n' | '\r' => Some(LineEditAction::Submit),
            _ => Some(LineEditAction::Insert(c)),
        },
        _ => None,
    }
}

pub fn apply_line_edit_action(
    state: &mut LineEditorState,
    action: LineEditAction,
    history: &mut InputHistory,
) -> LineEditOutcome {
    let changed = match action {
        LineEditAction::Insert(c) => {
            insert_str_at_cursor(&mut state.text, state.cursor, c.encode_utf8(&mut [0; 4]));
            state.cursor += 1;
            true
        }
        LineEditAction::Backspace => {
            let removed = state.cursor > 0 && remove_char_at(&mut state.text, state.cursor - 1);
            if removed {
                state.cursor -= 1;
            }
            removed
        }
        LineEditAction::Delete => remove_char_at(&mut state.text, state.cursor),
        LineEditAction::MoveLeft => move_cursor(state, state.cursor.saturating_sub(1)),
        LineEditAction::MoveRight => {
            let target = (state.cursor + 1).min(state.text.chars().count());
            move_cursor(state, target)
        }
        LineEditAction::MoveStart => move_cursor(state, 0),
        LineEditAction::MoveEnd => move_cursor(state, state.text.chars().count()),
        LineEditAction::DeleteToEnd => {
            let byte_idx = char_to_byte_index(&state.text, state.cursor);
            let had_tail = byte_idx < state.text.len();
            state.text.truncate(byte_idx);
            had_tail
        }
        LineEditAction::DeleteWord => {
            let had_prefix = state.cursor > 0;
            state.cursor = delete_word_before_cursor(&mut state.text, state.cursor);
            had_prefix
        }
        LineEditAction::ClearAll => {
            let had_text = !state.text.is_empty();
            state.replace("");
            history.reset_cursor();
            had_text
        }
        LineEditAction::HistoryPrevious => match history.previous() {
            Some(entry) => {
                state.replace(entry);
                true
            }
            None => false,
        },
        LineEditAction::HistoryNext => match history.next() {
            Some(entry) => {
                state.replace(entry);
                true
            }
            None => false,
        },
        LineEditAction::Paste(text) => {
            let sanitized = sanitize_paste(&text);
            let first_line = sanitized.split('\n').next().unwrap_or_default();
            insert_str_at_cursor(&mut state.text, state.cursor, first_line);
            state.cursor += first_line.chars().count();
            if sanitized.contains('\n') {
                return LineEditOutcome::Submit(state.text.clone());
            }
            !first_line.is_empty()
        }
        LineEditAction::Submit => return LineEditOutcome::Submit(state.text.clone()),
        LineEditAction::Quit => return LineEditOutcome::Quit,
    };
    LineEditOutcome::Continue { redraw: changed }
}

/// Tabs become spaces, `\r` becomes a line break, other control characters
/// are dropped.
fn sanitize_paste(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .filter_map(|c| match c {
            '\t' => Some(' '),
            '\r' | '\n' => Some('\n'),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

fn move_cursor(state: &mut LineEditorState, target: usize) -> bool {
    let moved = state.cursor != target;
    state.cursor = target;
    moved
}

fn insert_str_at_cursor(input: &mut String, cursor: usize, text: &str) {
    let byte_idx = char_to_byte_index(input, cursor);
    input.insert_str(byte_idx, text);
}

fn remove_char_at(input: &mut String, index: usize) -> bool {
    let start = char_to_byte_index(input, index);
    if start >= input.len() {
        return false;
    }
    let end = char_to_byte_index(input, index + 1);
    input.replace_range(start..end, "");
    true
}

fn delete_word_before_cursor(input: &mut String, cursor: usize) -> usize {
    let mut chars: Vec<char> = input.chars().collect();
    let end = cursor.min(chars.len());
    let mut idx = end;
    while idx > 0 && chars[idx - 1] == ' ' {
        idx -= 1;
    }
    while idx > 0 && chars[idx - 1] != ' ' {
        idx -= 1;
    }
    chars.drain(idx..end);
    *input = chars.into_iter().collect();
    idx
}

fn char_to_byte_index(input: &str, char_index: usize) -> usize {
    input
        .char_indices()
        .nth(char_index)
        .map(|(idx, _)| idx)
        .unwrap_or(input.len())
}
