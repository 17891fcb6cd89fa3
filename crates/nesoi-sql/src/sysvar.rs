//! System variables readable with `@@name`.
//!
//! The table is built once at startup and shared read-only by every
//! session. Names are case-insensitive.

use std::collections::HashMap;

use crate::types::Datum;

/// Server identification reported by `@@version_comment`.
pub const VERSION_COMMENT: &str = "MySQL Community Server (GPL)";

/// Server version reported by `@@version`.
pub const VERSION: &str = concat!("5.7.25-Nesoi-", env!("CARGO_PKG_VERSION"));

/// Read-only name to value table.
#[derive(Debug, Clone, Default)]
pub struct SystemVariables {
    vars: HashMap<String, Datum>,
}

impl SystemVariables {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the table every server starts with.
    pub fn defaults() -> Self {
        Self::new()
            .with("version_comment", VERSION_COMMENT)
            .with("version", VERSION)
            .with("max_allowed_packet", Datum::int(64 * 1024 * 1024))
            .with("character_set_client", "utf8")
            .with("autocommit", Datum::int(1))
    }

    /// Adds or replaces a variable.
    pub fn with(mut self, name: &str, value: impl Into<Datum>) -> Self {
        self.vars.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Looks up a variable by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Datum> {
        self.vars.get(&name.to_ascii_lowercase())
    }

    /// Returns the variable names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
