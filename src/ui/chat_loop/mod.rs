//! Main chat loop
//!
//! Reads one line at a time, hands it to the command interpreter and
//! streams chat replies. Output is appended below the prompt.

mod file_prompt;
mod stream;

pub use self::file_prompt::{pick_document, TerminalFileSource};

use std::error::Error;
use std::io::{self, Write};

use ratatui::crossterm::terminal;
use tracing::info;

use self::stream::stream_reply;
use crate::commands::{complete_upload, process_input, CommandResult};
use crate::core::app::App;
use crate::core::chat_stream::ResponseStreamEngine;
use crate::core::constants::GREETING;
use crate::ui::renderer::{print_panel_changes, TranscriptPrinter};
use crate::utils::line_editor::prompt_line;

const FALLBACK_WIDTH: usize = 80;

pub async fn run_chat(mut app: App, engine: ResponseStreamEngine) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout();
    let mut printer = TranscriptPrinter::default();
    let mut file_source = TerminalFileSource::default();

    info!(
        provider = app.session.provider().id(),
        model = app.session.model(),
        mode = app.mode.id(),
        "starting chat"
    );
    app.conversation.add_system_message(GREETING);
    printer.flush(&app.conversation, &mut stdout)?;

    loop {
        let panels_before = app.panels.clone();
        let prompt = app.prompt_label();
        let Some(line) = prompt_line(&prompt, &mut app.input_history)? else {
            break;
        };

        match process_input(&mut app, &line) {
            CommandResult::Continue => {}
            CommandResult::ProcessAsMessage(message) => {
                stream_reply(&mut app, &engine, &message, &mut stdout).await?;
            }
            CommandResult::SelectFile => {
                let outcome = pick_document(&mut file_source);
                complete_upload(&mut app, outcome);
            }
        }

        printer.flush(&app.conversation, &mut stdout)?;
        print_panel_changes(&mut stdout, &app, &panels_before, terminal_width())?;
    }

    writeln!(stdout, "Goodbye.")?;
    info!("chat ended");
    Ok(())
}

fn terminal_width() -> usize {
    terminal::size()
        .map(|(columns, _)| usize::from(columns))
        .unwrap_or(FALLBACK_WIDTH)
}
