use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::DetectionKey;

/// How the poller treats a holiday it already announced in an earlier cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "configs", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum RepeatPolicy {
    /// Announce each `(country, date)` once while it stays inside the look-ahead window.
    #[default]
    SuppressRepeats,
    /// Announce every match on every cycle.
    Reaffirm,
}

/// Identities published by previous cycles.
#[derive(Debug, Default)]
pub struct DetectionLedger {
    seen: HashSet<DetectionKey>,
}

impl DetectionLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` was published by an earlier cycle.
    pub fn contains(&self, key: &DetectionKey) -> bool {
        self.seen.contains(key)
    }

    /// Records several published identities.
    pub fn extend<I: IntoIterator<Item = DetectionKey>>(&mut self, keys: I) {
        self.seen.extend(keys);
    }

    /// Forgets identities dated before `today`; they can no longer match the window.
    pub fn prune_before(&mut self, today: NaiveDate) -> usize {
        let before = self.seen.len();
        self.seen.retain(|k| k.date >= today);
        before - self.seen.len()
    }

    /// Number of remembered identities.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
