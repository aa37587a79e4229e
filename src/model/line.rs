//! Tokenized log line record.

/// One sanitized, tokenized log line. Created once by ingestion and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Monotonically increasing identifier in ingestion order.
    pub id: usize,
    /// Fixed-length timestamp prefix (empty when `timestamp_length` is 0).
    pub timestamp: String,
    /// Line content after the timestamp prefix.
    pub remainder: String,
    /// Tokens of `remainder`, with delimiters as standalone tokens.
    pub tokens: Vec<String>,
}

impl LogLine {
    pub fn new(id: usize, timestamp: String, remainder: String, tokens: Vec<String>) -> Self {
        Self {
            id,
            timestamp,
            remainder,
            tokens,
        }
    }
}
