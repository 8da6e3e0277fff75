//! Process-wide table of configured authentications.
//!
//! # Design
//! The table lives in an `ArcSwap`. Readers load a snapshot without locking;
//! writers build a new vector from the current one and publish it with
//! `rcu`, which retries if another writer got in first. Lookups running
//! concurrently with configuration changes therefore see either the old or
//! the new table, never a half-modified one.
//!
//! Key names are unique and non-empty. Every structural change checks this,
//! so request-time lookup can assume at most one match.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::auth::AuthenticationEntry;
use crate::error::ConfigurationError;

#[derive(Debug, Default)]
pub struct AuthRegistry {
    entries: ArcSwap<Vec<AuthenticationEntry>>,
}

impl AuthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate or empty key names.
    pub fn with_entries(entries: Vec<AuthenticationEntry>) -> Result<Self, ConfigurationError> {
        check_keys(&entries)?;
        Ok(Self {
            entries: ArcSwap::from_pointee(entries),
        })
    }

    /// Load entries from a JSON array of tagged entries.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let entries: Vec<AuthenticationEntry> = serde_json::from_str(json)?;
        let registry = Self::with_entries(entries)?;
        info!(entries = registry.len(), "loaded authentication registry");
        Ok(registry)
    }

    /// The entry named exactly `key_name`, if configured.
    pub fn lookup(&self, key_name: &str) -> Option<AuthenticationEntry> {
        self.entries
            .load()
            .iter()
            .find(|e| e.key_name() == key_name)
            .cloned()
    }

    /// Every entry, in configuration order.
    pub fn list_all(&self) -> Arc<Vec<AuthenticationEntry>> {
        self.entries.load_full()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    pub fn add(&self, entry: impl Into<AuthenticationEntry>) -> Result<(), ConfigurationError> {
        let entry = entry.into();
        let mut outcome = Ok(());
        self.entries.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(entry.clone());
            outcome = check_keys(&next);
            match outcome {
                Ok(()) => Arc::new(next),
                Err(_) => Arc::clone(current),
            }
        });
        outcome
    }

    /// Remove and return the entry named `key_name`.
    pub fn remove(&self, key_name: &str) -> Option<AuthenticationEntry> {
        let mut removed = None;
        self.entries.rcu(|current| {
            let mut next = Vec::clone(current);
            removed = next
                .iter()
                .position(|e| e.key_name() == key_name)
                .map(|pos| next.remove(pos));
            next
        });
        removed
    }

    /// Replace the whole table.
    pub fn replace_all(&self, entries: Vec<AuthenticationEntry>) -> Result<(), ConfigurationError> {
        check_keys(&entries)?;
        self.entries.store(Arc::new(entries));
        Ok(())
    }
}

fn check_keys(entries: &[AuthenticationEntry]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for entry in entries {
        let key = entry.key_name();
        if key.trim().is_empty() {
            return Err(ConfigurationError::EmptyKeyName);
        }
        if !seen.insert(key) {
            return Err(ConfigurationError::DuplicateKeyName(key.to_string()));
        }
    }
    Ok(())
}
