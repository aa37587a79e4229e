//! Ingestion layer: raw log reading, sanitization, and tokenization.

pub mod error;
pub mod reader;
pub mod tokenizer;

pub use error::IngestError;
pub use reader::LogReader;
pub use tokenizer::Tokenizer;
