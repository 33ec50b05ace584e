/*
 * id.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder tokens for aliased content.
//!
//! Tokens have the shape `{prefix}{n}_`. The prefix is chosen per document so
//! that it never occurs in the source, which makes every token impossible to
//! confuse with literal text. The trailing `_` keeps tokens prefix-free, so
//! `_gt1_` never matches inside `_gt11_`.

const BASE_PREFIX: &str = "_gt";

/// Produces unique placeholder tokens for one parse run.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    next: usize,
}

impl IdGenerator {
    /// Create a generator whose tokens cannot collide with `source`.
    pub fn new(source: &str) -> Self {
        let mut prefix = BASE_PREFIX.to_string();
        while source.contains(&prefix) {
            prefix.push('x');
        }
        Self { prefix, next: 0 }
    }

    /// Return the next token.
    pub fn next_id(&mut self) -> String {
        let id = format!("{}{}_", self.prefix, self.next);
        self.next += 1;
        id
    }

    /// The prefix shared by every token of this run.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
