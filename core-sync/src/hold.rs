//! Names a pass must leave alone.
//!
//! When a row folder or a published file cannot be read, the pass cannot
//! tell "removed" apart from "temporarily unreadable". Everything under the
//! affected prefix (or the affected identity) is held: the orphan sweep,
//! the fingerprint prune and remote deletes all skip it until a later pass
//! can read it again.

use core_media::identity::{normalize_separators, published_identity};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoldSet {
    /// Identity prefixes without a trailing `/`; empty holds everything
    prefixes: BTreeSet<String>,
    identities: BTreeSet<String>,
}

impl HoldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every identity below `prefix` (a relative folder).
    pub fn hold_prefix(&mut self, prefix: &str) {
        self.prefixes.insert(normalize_separators(prefix));
    }

    pub fn hold_identity(&mut self, identity: &str) {
        self.identities.insert(identity.to_string());
    }

    pub fn extend(&mut self, other: &HoldSet) {
        self.prefixes.extend(other.prefixes.iter().cloned());
        self.identities.extend(other.identities.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.identities.is_empty()
    }

    pub fn holds_identity(&self, identity: &str) -> bool {
        self.identities.contains(identity)
            || self.prefixes.iter().any(|prefix| {
                prefix.is_empty()
                    || identity
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
    }

    /// Whether a published name (with extension) or remote object name is held.
    pub fn holds_name(&self, name: &str) -> bool {
        self.holds_identity(published_identity(name).identity.as_str())
    }
}
