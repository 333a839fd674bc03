use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::countries::country_name;
use super::holiday::Holiday;

/// Deduplication identity of a detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetectionKey {
    pub country_code: String,
    pub date: NaiveDate,
}

/// # Holiday Detected
///
/// Published on `holiday.detected` once per matching holiday per country in a poll cycle.
/// `detected_at_utc` is informational only; identity is `(country_code, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayDetected {
    pub country_code: String,
    pub country_name: String,
    pub date: NaiveDate,
    pub local_name: String,
    pub name: String,
    pub is_fixed: bool,
    pub is_global: bool,
    #[serde(rename = "type", default)]
    pub holiday_type: Option<String>,
    pub detected_at_utc: DateTime<Utc>,
}

impl HolidayDetected {
    /// Builds the event for `holiday`, stamped with `detected_at`.
    pub fn from_holiday(holiday: &Holiday, detected_at: DateTime<Utc>) -> Self {
        Self {
            country_code: holiday.country_code.clone(),
            country_name: country_name(&holiday.country_code),
            date: holiday.date,
            local_name: holiday.local_name.clone(),
            name: holiday.name.clone(),
            is_fixed: holiday.is_fixed,
            is_global: holiday.is_global,
            holiday_type: holiday.holiday_type.clone(),
            detected_at_utc: detected_at,
        }
    }

    pub fn identity(&self) -> DetectionKey {
        DetectionKey {
            country_code: self.country_code.clone(),
            date: self.date,
        }
    }
}

/// # Notify Command
///
/// Fan-out instruction published on `notify.users`. Carries the resolved recipients plus the
/// holiday fields of the originating detection, flattened into the same JSON object.
/// An empty `user_ids` list is a no-op for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyCommand {
    pub user_ids: Vec<String>,
    #[serde(flatten)]
    pub holiday: HolidayDetected,
}

impl NotifyCommand {
    pub fn new(user_ids: Vec<String>, holiday: HolidayDetected) -> Self {
        Self { user_ids, holiday }
    }

    /// The payload every recipient's connections receive.
    pub fn alert(&self) -> HolidayAlert {
        HolidayAlert::from_event(&self.holiday)
    }
}

/// Payload pushed to websocket clients.
///
/// The `type: "HolidayDetected"` discriminator is added by the realtime framing
/// (`realtime::ServerMessage`), not by this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayAlert {
    pub country_code: String,
    pub country_name: String,
    pub date: NaiveDate,
    pub local_name: String,
    pub name: String,
    pub detected_at_utc: DateTime<Utc>,
}

impl HolidayAlert {
    pub fn from_event(event: &HolidayDetected) -> Self {
        Self {
            country_code: event.country_code.clone(),
            country_name: event.country_name.clone(),
            date: event.date,
            local_name: event.local_name.clone(),
            name: event.name.clone(),
            detected_at_utc: event.detected_at_utc,
        }
    }
}
