//! Newline framing for streamed response bodies.
//!
//! Bodies arrive in arbitrary buffers. Complete lines are handed out as they
//! become available; the trailing partial line stays buffered until its
//! newline arrives. Splitting happens on raw bytes, which is safe for UTF-8
//! because `\n` never occurs inside a multi-byte sequence.

use memchr::memchr;
use tracing::debug;

#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete, non-blank line with surrounding whitespace (including
    /// `\r`) removed. Lines that are not valid UTF-8 are dropped.
    pub fn next_line(&mut self) -> Option<String> {
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line = match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(text) => Some(text.trim().to_string()),
                Err(err) => {
                    debug!(error = %err, "dropping stream line with invalid UTF-8");
                    None
                }
            };
            self.buffer.drain(..=newline_pos);
            match line {
                Some(line) if !line.is_empty() => return Some(line),
                _ => continue,
            }
        }
        None
    }

    /// Bytes still waiting for a terminating newline.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Take whatever partial line remains once the body has ended.
    pub fn take_remainder(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8(rest).ok()?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
