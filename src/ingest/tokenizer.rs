//! Delimiter-based tokenization.

use std::collections::BTreeSet;

/// Splits line content on a configured delimiter set.
///
/// Delimiters are emitted as standalone single-character tokens, so the
/// concatenation of all tokens reproduces the input exactly. Consecutive
/// delimiters produce consecutive delimiter tokens; empty tokens never occur.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    delimiters: BTreeSet<char>,
}

impl Tokenizer {
    pub fn new(delimiters: &[char]) -> Self {
        Self {
            delimiters: delimiters.iter().copied().collect(),
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            if self.delimiters.contains(&ch) {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            } else {
                current.push(ch);
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }
        tokens
    }

    /// A token is a delimiter token iff it is exactly one configured
    /// delimiter character.
    pub fn is_delimiter(&self, token: &str) -> bool {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => self.delimiters.contains(&ch),
            _ => false,
        }
    }

    pub fn delimiters(&self) -> &BTreeSet<char> {
        &self.delimiters
    }
}
