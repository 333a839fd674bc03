//! # Holiday Source
//!
//! The narrow interface the poller consumes. The production implementation is
//! `retrieve::nager_date::NagerDateClient`; tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::Holiday;

#[async_trait]
pub trait HolidaySource: Send + Sync {
    /// All public holidays of `country_code` in `year`.
    async fn fetch_holidays(&self, year: i32, country_code: &str) -> Result<Vec<Holiday>, SourceError>;

    /// ISO codes of every country the provider knows about.
    async fn fetch_countries(&self) -> Result<Vec<String>, SourceError>;
}
