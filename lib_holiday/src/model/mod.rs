//! # Domain Model
//!
//! Records that flow through the pipeline. All of them serialize as JSON with camelCase
//! field names, which is the wire format of both bus topics and the websocket payload.

mod countries;
mod events;
mod holiday;
mod subscription;

pub use countries::{country_name, DEFAULT_COUNTRIES};
pub use events::{DetectionKey, HolidayAlert, HolidayDetected, NotifyCommand};
pub use holiday::Holiday;
pub use subscription::{normalize_country_codes, Subscription};
