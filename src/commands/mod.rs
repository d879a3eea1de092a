mod handlers;
mod registry;

pub use handlers::context::complete_upload;
pub use handlers::io::{default_export_filename, export_conversation, render_transcript, ExportError};
pub use registry::{all_commands, find_command, Command, CommandInvocation};

use crate::core::app::App;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    /// The caller should run the file picker and hand the outcome to
    /// [`complete_upload`].
    SelectFile,
}

/// Interpret one submitted line. The first whitespace-separated token picks
/// a command (case-insensitively); anything else is a chat message.
pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return CommandResult::Continue;
    }
    app.input_history.push(trimmed);

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let Some((name, args)) = tokens.split_first() else {
        return CommandResult::Continue;
    };

    match registry::find_command(name) {
        Some(command) => {
            debug!(command = command.name, args = args.len(), "dispatching command");
            (command.handler)(
                app,
                CommandInvocation {
                    input: trimmed,
                    args,
                },
            )
        }
        None => CommandResult::ProcessAsMessage(trimmed.to_string()),
    }
}
