use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The set of countries a user wants alerts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub user_id: String,
    pub country_codes: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription covers `country_code`.
    pub fn covers(&self, country_code: &str) -> bool {
        self.country_codes.contains(country_code)
    }
}

/// Trims and upper-cases codes, dropping blanks and duplicates.
pub fn normalize_country_codes<I, S>(codes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|c| c.as_ref().trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}
