pub mod app;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod context;
pub mod conversation;
pub mod files;
pub mod input_history;
pub mod message;
pub mod modes;
pub mod preview;
pub mod providers;
pub mod session;
