use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A public holiday as reported by the holiday source.
///
/// `date` is a plain calendar date. No timezone is attached and none is applied when it is
/// compared against the look-ahead window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub country_code: String,
    pub date: NaiveDate,
    pub local_name: String,
    pub name: String,
    pub is_fixed: bool,
    pub is_global: bool,
    /// First classification tag reported by the provider (e.g. `Public`, `Bank`).
    #[serde(rename = "type", default)]
    pub holiday_type: Option<String>,
}
