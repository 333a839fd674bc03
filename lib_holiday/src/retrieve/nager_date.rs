//! # Nager.Date Client
//!
//! Production [`HolidaySource`] backed by the public Nager.Date v3 API:
//!
//! - `GET PublicHolidays/{year}/{countryCode}` returns the year's calendar. A JSON `null`
//!   body is treated as an empty calendar.
//! - `GET AvailableCountries` returns `[{ "countryCode": ..., "name": ... }]`.
//!
//! Any non-2xx status surfaces as `SourceError::Unavailable` after the retry middleware
//! gave up.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::ky_http::ApiClient;
use crate::error::SourceError;
use crate::model::Holiday;
use crate::source::HolidaySource;

/// Default API root.
pub const NAGER_DATE_BASE_URL: &str = "https://date.nager.at/api/v3/";

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = "HolidayMonitor-Scraper/1.0";

/// One entry of the provider's holiday list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NagerHoliday {
    date: NaiveDate,
    #[serde(default)]
    local_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    fixed: bool,
    #[serde(default)]
    global: bool,
    #[serde(default)]
    types: Option<Vec<String>>,
}

impl NagerHoliday {
    fn into_holiday(self, requested_code: &str) -> Holiday {
        Holiday {
            country_code: self
                .country_code
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| requested_code.to_string()),
            date: self.date,
            local_name: self.local_name.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            is_fixed: self.fixed,
            is_global: self.global,
            holiday_type: self.types.and_then(|t| t.into_iter().next()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountryEntry {
    #[serde(default)]
    country_code: Option<String>,
}

/// Client for the Nager.Date API.
pub struct NagerDateClient {
    api: ApiClient,
}

impl NagerDateClient {
    /// Creates a client against `base_url` retrying transient failures `max_retries` times.
    ///
    /// # Errors
    /// `SourceError::Transport` if the URL is invalid.
    pub fn new(base_url: &str, max_retries: u32) -> Result<Self, SourceError> {
        Ok(Self {
            api: ApiClient::new(base_url, USER_AGENT, max_retries)?,
        })
    }

    /// A client for the public endpoint.
    ///
    /// # Errors
    /// Only if the HTTP client cannot be constructed.
    pub fn public(max_retries: u32) -> Result<Self, SourceError> {
        Self::new(NAGER_DATE_BASE_URL, max_retries)
    }
}

#[async_trait]
impl HolidaySource for NagerDateClient {
    async fn fetch_holidays(&self, year: i32, country_code: &str) -> Result<Vec<Holiday>, SourceError> {
        let path = format!("PublicHolidays/{year}/{country_code}");
        let holidays = self
            .api
            .get::<Option<Vec<NagerHoliday>>>(&path)
            .await?
            .into_data()?
            .unwrap_or_default();

        debug!(country = country_code, year, count = holidays.len(), "Fetched holidays");
        Ok(holidays.into_iter().map(|h| h.into_holiday(country_code)).collect())
    }

    async fn fetch_countries(&self) -> Result<Vec<String>, SourceError> {
        let entries = self
            .api
            .get::<Option<Vec<CountryEntry>>>("AvailableCountries")
            .await?
            .into_data()?
            .unwrap_or_default();

        Ok(entries
            .into_iter()
            .filter_map(|e| e.country_code)
            .filter(|c| !c.is_empty())
            .collect())
    }
}
