//! Persistent user preferences (TOML in the platform config directory).

pub mod data;
pub mod io;

#[cfg(test)]
mod tests;

pub use data::{path_display, Config, ConfigKey};
pub use io::ConfigError;
