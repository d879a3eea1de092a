use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::info;

use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::config::path_display;
use crate::core::message::{Turn, TurnRole};

use super::usage_error;

const USAGE_EXPORT: &str = "export [filename]";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No conversation to export - the chat history is empty.")]
    Empty,

    #[error("File '{}' already exists. Choose another name with: export <filename>", path_display(.0))]
    AlreadyExists(PathBuf),

    #[error("Could not write {}: {source}", path_display(.path))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn default_export_filename(date: NaiveDate) -> String {
    format!("neuralterm-export-{}.txt", date.format("%Y-%m-%d"))
}

/// User lines are quoted with `> `; assistant replies are kept verbatim.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .filter(|turn| turn.role.is_exported())
        .map(|turn| match turn.role {
            TurnRole::User => format!("> {}", turn.content),
            _ => turn.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Write the transcript to a new file. Existing files are never replaced.
pub fn export_conversation(turns: &[Turn], path: &Path) -> Result<(), ExportError> {
    let transcript = render_transcript(turns);
    if transcript.is_empty() {
        return Err(ExportError::Empty);
    }

    let write_error = |source: std::io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| match source.kind() {
            ErrorKind::AlreadyExists => ExportError::AlreadyExists(path.to_path_buf()),
            _ => write_error(source),
        })?;

    let mut writer = BufWriter::new(file);
    writeln!(writer, "{transcript}").map_err(write_error)?;
    writer.flush().map_err(write_error)?;
    Ok(())
}

pub(crate) fn handle_export(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let filename = match invocation.args {
        [] => default_export_filename(Local::now().date_naive()),
        [name] => (*name).to_string(),
        _ => return usage_error(app, USAGE_EXPORT),
    };
    let path = PathBuf::from(&filename);

    match export_conversation(app.conversation.turns(), &path) {
        Ok(()) => {
            info!(path = %path.display(), "exported conversation");
            app.conversation
                .add_system_message(format!("Conversation exported to {filename}"));
        }
        Err(err) => {
            app.conversation.add_error_message(err.to_string());
        }
    }
    CommandResult::Continue
}
