use std::path::PathBuf;

use directories::BaseDirs;
use tracing::warn;

use crate::core::context::ExtractedDocument;
use crate::core::files::{is_accepted, FileError, FileSource, ACCEPTED_EXTENSIONS};
use crate::core::input_history::InputHistory;
use crate::utils::line_editor::prompt_line;

const FILE_PROMPT: &str = "file> ";

/// Asks for a path on the prompt line. An empty line or Ctrl+C cancels.
#[derive(Default)]
pub struct TerminalFileSource {
    history: InputHistory,
}

impl FileSource for TerminalFileSource {
    fn select_file(&mut self) -> Result<Option<PathBuf>, FileError> {
        println!(
            "Path to a document ({}). Leave empty to cancel.",
            ACCEPTED_EXTENSIONS.join(", ")
        );
        loop {
            let line = match prompt_line(FILE_PROMPT, &mut self.history) {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(None),
                Err(err) => {
                    warn!(error = %err, "file prompt failed");
                    return Err(err.into());
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            self.history.push(trimmed);

            let path = expand_home(trimmed);
            if is_accepted(&path) {
                return Ok(Some(path));
            }
            println!("Unsupported file type. Accepted: {}", ACCEPTED_EXTENSIONS.join(", "));
        }
    }
}

/// Run the selection and extraction steps of an upload. `Ok(None)` means
/// the user cancelled.
pub fn pick_document<S: FileSource>(
    source: &mut S,
) -> Result<Option<ExtractedDocument>, FileError> {
    match source.select_file()? {
        Some(path) => source.extract_text(&path).map(Some),
        None => Ok(None),
    }
}

fn expand_home(input: &str) -> PathBuf {
    let Some(rest) = input.strip_prefix("~/") else {
        return PathBuf::from(input);
    };
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => PathBuf::from(input),
    }
}
