//! Shared constants used across the application

pub const APP_NAME: &str = "NeuralTerm";

pub const DEFAULT_CLOUD_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_LOCAL_MODEL: &str = "llama3";
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";

/// Shown as the first system turn of every session.
pub const GREETING: &str = "NeuralTerm CLI // Multi-Model Interface
---------------------------------------
Default: Gemini 3 Flash (Cloud)
To connect locally: connect local <model_name>

Type 'help' for commands.";

pub const MACHINE_NAME: &str = "local";
pub const DIRECTORY: &str = "~";
pub const PROMPT_SYMBOL: &str = "➜";

/// Local servers must accept requests from this client.
pub const LOCAL_SERVER_NOTE: &str =
    "Local mode expects an Ollama-compatible server exposing /api/chat (start it with OLLAMA_ORIGINS=\"*\" if requests are rejected).";
