pub(super) mod context;
pub(super) mod core;
pub(super) mod io;

use crate::commands::CommandResult;
use crate::core::app::App;

pub(super) fn usage_error(app: &mut App, usage: &str) -> CommandResult {
    app.conversation.add_error_message(format!("Usage: {usage}"));
    CommandResult::Continue
}
