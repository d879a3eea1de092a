//! Terminal UI layer for interactive chat sessions.
//!
//! The UI is line oriented: turns and panels are printed below the prompt
//! rather than drawn into a full-screen layout.
//!
//! - [`chat_loop`]: reads lines, dispatches them to [`crate::commands`] and
//!   streams replies from [`crate::core::chat_stream`].
//! - [`renderer`]: transcript printing, the document lens and the preview file.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns domain logic and backend coordination.

pub mod chat_loop;
pub mod renderer;
