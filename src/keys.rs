#![forbid(unsafe_code)]

use anyhow::{Result, bail};

/// Ordered credential pool with a cyclic cursor. Never shrinks.
#[derive(Debug, Clone)]
pub struct KeyPool {
    keys: Vec<String>,
    index: usize,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Result<Self> {
        if keys.is_empty() {
            bail!("the API key pool needs at least one key");
        }
        Ok(Self { keys, index: 0 })
    }

    pub fn current(&self) -> &str {
        &self.keys[self.index]
    }

    /// The key used for one-shot lookups that never rotate.
    pub fn first(&self) -> &str {
        &self.keys[0]
    }

    /// Advances to the next key, wrapping around, and returns the new index.
    pub fn rotate(&mut self) -> usize {
        self.index = (self.index + 1) % self.keys.len();
        self.index
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based position of the current key, as printed in logs.
    pub fn position(&self) -> usize {
        self.index + 1
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
