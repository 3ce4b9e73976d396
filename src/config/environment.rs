//! # Environment Lookup
//!
//! Injectable access to environment variables, so configuration can be
//! resolved in tests without touching the real process environment.

use std::collections::HashMap;

/// Source of environment variables
pub trait Environment: Send + Sync {
    /// Value of `key`, or `None` when unset or empty
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Resolve one setting by ordered fallback
///
/// An explicit non-empty value wins, then a non-empty environment variable.
pub fn resolve_setting(explicit: Option<&str>, env: &dyn Environment, key: &str) -> Option<String> {
    explicit
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .or_else(|| env.var(key))
}
