//! NeuralTerm is a line-oriented terminal chat client for Gemini and local
//! Ollama-compatible models.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns session state, modes, uploaded document context, the
//!   conversation log and the response stream engine for both backends.
//! - [`commands`] interprets each input line as a command or a chat message.
//! - [`ui`] runs the interactive loop and prints turns and panels.
//! - [`api`] defines the wire payloads exchanged with both backends.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which loads configuration, builds
//! [`core::app::App`] and hands it to [`ui::chat_loop`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
