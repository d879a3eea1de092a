use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

impl Command {
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a [&'a str],
}

impl<'a> CommandInvocation<'a> {
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied()
    }

    pub fn args_len(&self) -> usize {
        self.args.len()
    }
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands().iter().find(|command| command.matches(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "connect",
        aliases: &[],
        usage: "connect gemini | connect local [model] [url]",
        help: "Switch between Gemini cloud and a local Ollama server.",
        handler: super::handlers::core::handle_connect,
    },
    Command {
        name: "mode",
        aliases: &[],
        usage: "mode [name]",
        help: "List modes, or switch the assistant's system instruction.",
        handler: super::handlers::core::handle_mode,
    },
    Command {
        name: "upload",
        aliases: &[],
        usage: "upload",
        help: "Load a document (.pdf .txt .md .json .js .ts .tsx) as context.",
        handler: super::handlers::context::handle_upload,
    },
    Command {
        name: "context",
        aliases: &[],
        usage: "context [remove <n|name>]",
        help: "Show the loaded context files, or drop one.",
        handler: super::handlers::context::handle_context,
    },
    Command {
        name: "open",
        aliases: &["view"],
        usage: "open | view",
        help: "Open the document viewer on the latest upload.",
        handler: super::handlers::context::handle_open,
    },
    Command {
        name: "close",
        aliases: &[],
        usage: "close",
        help: "Close the document viewer and the live preview.",
        handler: super::handlers::context::handle_close,
    },
    Command {
        name: "preview",
        aliases: &[],
        usage: "preview close",
        help: "Close the live preview.",
        handler: super::handlers::context::handle_preview,
    },
    Command {
        name: "export",
        aliases: &[],
        usage: "export [filename]",
        help: "Save the conversation to a text file.",
        handler: super::handlers::io::handle_export,
    },
    Command {
        name: "clear",
        aliases: &["cls"],
        usage: "clear | cls",
        help: "Clear the terminal.",
        handler: super::handlers::core::handle_clear,
    },
    Command {
        name: "reset",
        aliases: &[],
        usage: "reset",
        help: "Reset conversation context, uploads and mode.",
        handler: super::handlers::core::handle_reset,
    },
    Command {
        name: "help",
        aliases: &[],
        usage: "help",
        help: "Show this help.",
        handler: super::handlers::core::handle_help,
    },
];
