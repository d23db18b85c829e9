//! Pluggable byte↔text conversion for named encodings.

use core::fmt;
use std::sync::Arc;

/// Extension point overriding byte↔text conversion for named encodings.
///
/// Implementations are stateless capabilities: every operation receives the
/// encoding name and returns `None` to signal "not handled", letting a
/// fallback chain try the next handler. Implementations must be safe under
/// concurrent invocation, which the `Send + Sync` bounds enforce for the
/// common case of handlers without interior mutability.
pub trait ExtraEncoding: Send + Sync {
    /// Converts text to bytes under the named encoding.
    fn encode_text(&self, text: &str, encoding: &str) -> Option<Vec<u8>>;

    /// Converts a single character to bytes under the named encoding.
    fn encode_char(&self, ch: char, encoding: &str) -> Option<Vec<u8>> {
        self.encode_text(ch.encode_utf8(&mut [0; 4]), encoding)
    }

    /// Converts bytes back to text under the named encoding.
    fn decode_bytes(&self, bytes: &[u8], encoding: &str) -> Option<String>;
}

/// Ordered fallback chain of [`ExtraEncoding`] handlers.
///
/// Each operation walks the registered handlers in insertion order and
/// returns the first non-`None` answer.
#[derive(Default, Clone)]
pub struct EncodingChain {
    handlers: Vec<Arc<dyn ExtraEncoding>>,
}

impl EncodingChain {
    /// Creates an empty chain; every conversion returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to the end of the chain.
    pub fn push(&mut self, handler: Arc<dyn ExtraEncoding>) {
        self.handlers.push(handler);
    }

    /// Converts text to bytes via the first handler claiming the encoding.
    pub fn encode_text(&self, text: &str, encoding: &str) -> Option<Vec<u8>> {
        self.handlers
            .iter()
            .find_map(|handler| handler.encode_text(text, encoding))
    }

    /// Converts a character to bytes via the first handler claiming the
    /// encoding.
    pub fn encode_char(&self, ch: char, encoding: &str) -> Option<Vec<u8>> {
        self.handlers
            .iter()
            .find_map(|handler| handler.encode_char(ch, encoding))
    }

    /// Converts bytes to text via the first handler claiming the encoding.
    pub fn decode_bytes(&self, bytes: &[u8], encoding: &str) -> Option<String> {
        self.handlers
            .iter()
            .find_map(|handler| handler.decode_bytes(bytes, encoding))
    }
}

impl fmt::Debug for EncodingChain {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EncodingChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
