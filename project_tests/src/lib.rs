//! Shared fixtures for the cross-crate tests.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::{Datelike, NaiveDate};
use lib_holiday::{Holiday, HolidaySource, SourceError};

/// Builds a global, fixed holiday.
pub fn holiday(country_code: &str, date: NaiveDate, name: &str) -> Holiday {
    Holiday {
        country_code: country_code.to_string(),
        date,
        local_name: name.to_string(),
        name: name.to_string(),
        is_fixed: true,
        is_global: true,
        holiday_type: Some("Public".to_string()),
    }
}

/// Calendar served from memory, keyed by `(year, country)`.
#[derive(Default)]
pub struct StaticHolidaySource {
    calendars: HashMap<(i32, String), Vec<Holiday>>,
}

impl StaticHolidaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, holiday: Holiday) -> Self {
        self.calendars
            .entry((holiday.date.year(), holiday.country_code.clone()))
            .or_default()
            .push(holiday);
        self
    }
}

#[async_trait]
impl HolidaySource for StaticHolidaySource {
    async fn fetch_holidays(&self, year: i32, country_code: &str) -> Result<Vec<Holiday>, SourceError> {
        Ok(self
            .calendars
            .get(&(year, country_code.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_countries(&self) -> Result<Vec<String>, SourceError> {
        let mut codes: Vec<String> = self.calendars.keys().map(|(_, c)| c.clone()).collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }
}

/// Serves `app` on an ephemeral localhost port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    addr
}

/// Awaits `fut` for at most `secs` seconds; `None` on timeout.
pub async fn within<T>(secs: u64, fut: impl Future<Output = T>) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(secs), fut).await.ok()
}
