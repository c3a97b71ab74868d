use serde::{Deserialize, Serialize};
use std::fmt;

/// How an online `load_all` treats notes that only exist in the local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Overwrite the cache with the remote collection. Pending local notes are
    /// discarded.
    Replace,
    /// Push pending local notes before overwriting the cache.
    #[default]
    Reconcile,
}

impl fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => f.write_str("replace"),
            Self::Reconcile => f.write_str("reconcile"),
        }
    }
}
