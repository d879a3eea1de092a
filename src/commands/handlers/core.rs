use super::usage_error;
use crate::commands::registry::CommandInvocation;
use crate::commands::{all_commands, CommandResult};
use crate::core::app::App;
use crate::core::constants::LOCAL_SERVER_NOTE;
use crate::core::modes::{all_modes, find_mode};
use crate::core::session::Provider;

const USAGE_CONNECT: &str = "connect [gemini|local] [model_name] [url]";

pub(crate) fn handle_help(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.chars().count())
        .max()
        .unwrap_or(0);

    let mut help = String::from("Commands:\n");
    for command in all_commands() {
        help.push_str(&format!("  {:<width$}  {}\n", command.usage, command.help));
    }
    help.push_str(&format!(
        "\nCurrent mode: {} ({})\n",
        app.mode.id(),
        app.mode.description()
    ));
    help.push_str(&format!("\nNote for Local: {LOCAL_SERVER_NOTE}"));

    app.conversation.add_info_message(help);
    CommandResult::Continue
}

pub(crate) fn handle_clear(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.clear_conversation();
    CommandResult::Continue
}

pub(crate) fn handle_reset(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.reset_session();
    app.conversation
        .add_system_message("Conversation context reset.");
    CommandResult::Continue
}

pub(crate) fn handle_connect(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    // Only the two documented targets; `cloud` and `ollama` are config spellings.
    let target = match invocation.arg(0) {
        Some(name) if name.eq_ignore_ascii_case("local") => Some(Provider::Local),
        Some(name) if name.eq_ignore_ascii_case("gemini") => Some(Provider::Cloud),
        _ => None,
    };

    match target {
        Some(Provider::Local) => {
            let model = invocation
                .arg(1)
                .map(str::to_string)
                .unwrap_or_else(|| app.defaults.local_model.clone());
            let url = invocation
                .arg(2)
                .map(str::to_string)
                .unwrap_or_else(|| app.defaults.local_url.clone());

            app.session.set_provider(Provider::Local);
            app.session.set_model(model.clone());
            app.session.set_endpoint(url.clone());
            tracing::info!(%model, %url, "connected to local provider");
            app.conversation.add_system_message(format!(
                "Switched to LOCAL provider.\nTarget: {url}\nModel: {model}"
            ));
            CommandResult::Continue
        }
        Some(Provider::Cloud) => {
            let model = app.defaults.cloud_model.clone();
            app.session.set_provider(Provider::Cloud);
            app.session.set_model(model.clone());
            tracing::info!(%model, "connected to cloud provider");
            app.conversation.add_system_message(format!(
                "Switched to GEMINI provider (Cloud).\nModel: {model}"
            ));
            CommandResult::Continue
        }
        None => usage_error(app, USAGE_CONNECT),
    }
}

pub(crate) fn handle_mode(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(name) = invocation.arg(0) else {
        let mut listing = String::from("Available modes:\n");
        for spec in all_modes() {
            let marker = if spec.mode == app.mode { " (active)" } else { "" };
            listing.push_str(&format!("  {:<8} {}{}\n", spec.id, spec.description, marker));
        }
        listing.push_str("\nSwitch with: mode <name>");
        app.conversation.add_info_message(listing);
        return CommandResult::Continue;
    };

    match find_mode(name) {
        Some(spec) => {
            app.set_mode(spec.mode);
            app.conversation.add_system_message(format!(
                "Mode switched to {}: {}",
                spec.id.to_ascii_uppercase(),
                spec.description
            ));
        }
        None => {
            app.conversation.add_error_message(format!(
                "Unknown mode: {name}. Type 'mode' to list available modes."
            ));
        }
    }
    CommandResult::Continue
}
