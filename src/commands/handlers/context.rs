use tracing::{info, warn};

use super::usage_error;
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::context::ExtractedDocument;
use crate::core::files::FileError;

const USAGE_CONTEXT: &str = "context [remove <n|name>]";

pub(crate) fn handle_upload(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::SelectFile
}

/// Finish an `upload` once the file collaborator has answered. Nothing is
/// stored unless extraction succeeded.
pub fn complete_upload(app: &mut App, outcome: Result<Option<ExtractedDocument>, FileError>) {
    match outcome {
        Ok(Some(document)) => {
            let stored = app.contexts.add(document);
            let id = stored.id();
            let summary = format!(
                "Context loaded: {} ({}, {})",
                stored.name(),
                stored.size_label(),
                stored.type_label()
            );
            info!(id, name = stored.name(), "stored document context");
            app.show_document(id);
            app.conversation.add_system_message(summary);
        }
        Ok(None) => {
            app.conversation.add_system_message("No file selected.");
        }
        Err(err) => {
            warn!(error = %err, "upload failed");
            app.conversation
                .add_error_message(format!("Failed to read file: {err}"));
        }
    }
}

pub(crate) fn handle_context(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.args {
        [] => list_context(app),
        [action, target @ ..] if action.eq_ignore_ascii_case("remove") && !target.is_empty() => {
            remove_context(app, &target.join(" "))
        }
        _ => return usage_error(app, USAGE_CONTEXT),
    }
    CommandResult::Continue
}

fn list_context(app: &mut App) {
    if app.contexts.is_empty() {
        app.conversation
            .add_info_message("No context loaded. Use 'upload' to add a document.");
        return;
    }

    let mut summary = format!("Loaded context ({}):\n", app.contexts.len());
    for (index, context) in app.contexts.as_slice().iter().enumerate() {
        summary.push_str(&format!(
            "  {}. {} ({}, {}, {} chars)\n",
            index + 1,
            context.name(),
            context.size_label(),
            context.type_label(),
            context.char_count()
        ));
    }
    summary.push_str("\nRemove one with: context remove <n|name>");
    app.conversation.add_info_message(summary);
}

/// `target` is the 1-based position from the listing or a file name.
fn remove_context(app: &mut App, target: &str) {
    let by_position = target
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| app.contexts.as_slice().get(index));
    let found = by_position
        .or_else(|| {
            app.contexts
                .as_slice()
                .iter()
                .find(|context| context.name().eq_ignore_ascii_case(target))
        })
        .map(|context| (context.id(), context.name().to_string()));

    match found {
        Some((id, name)) => {
            app.remove_context(id);
            info!(id, %name, "removed document context");
            app.conversation
                .add_system_message(format!("Context removed: {name}"));
        }
        None => {
            app.conversation
                .add_error_message(format!("No loaded context matches '{target}'."));
        }
    }
}

pub(crate) fn handle_open(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    match app.contexts.latest().map(|context| context.id()) {
        Some(id) => app.show_document(id),
        None => {
            app.conversation
                .add_error_message("No document loaded. Use 'upload' first.");
        }
    }
    CommandResult::Continue
}

pub(crate) fn handle_close(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.panels.close_all();
    CommandResult::Continue
}

/// Only `preview close` is a command; any other line starting with
/// "preview" is an ordinary chat message.
pub(crate) fn handle_preview(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.args {
        [action] if action.eq_ignore_ascii_case("close") => {
            app.panels.preview = None;
            CommandResult::Continue
        }
        _ => CommandResult::ProcessAsMessage(invocation.input.to_string()),
    }
}
