//! # Holiday Poller
//!
//! A self-scheduling ingestor. Every cycle it fetches the holiday calendar of each monitored
//! country, matches it against the look-ahead window `[today, today + N]` and publishes one
//! `HolidayDetected` per matching holiday on `holiday.detected`.
//!
//! ## Failure scoping:
//! - **Per country**: a fetch error is logged and the country is skipped for this cycle.
//! - **Per cycle**: a publish error aborts the cycle; the next scheduled cycle starts over.
//!
//! ## Repeat handling:
//! Governed by [`RepeatPolicy`]. With `SuppressRepeats`, identities published in an earlier
//! cycle are skipped while they remain in the window. Identities are recorded only after
//! their publish succeeded. Several holidays sharing a date in one cycle are all published.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod ledger;

pub use ledger::{DetectionLedger, RepeatPolicy};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::{publish_message, EventBus, Topic};
use crate::error::{MonitorError, SourceError};
use crate::model::{DetectionKey, Holiday, HolidayDetected, DEFAULT_COUNTRIES};
use crate::source::HolidaySource;

/// The ordered dates `today ..= today + look_ahead_days`.
pub fn lookahead_window(today: NaiveDate, look_ahead_days: u32) -> Vec<NaiveDate> {
    (0..=u64::from(look_ahead_days))
        .map_while(|offset| today.checked_add_days(Days::new(offset)))
        .collect()
}

/// Whether the window reaches into next year, so next year's calendar must be fetched too.
pub fn crosses_year_boundary(today: NaiveDate, look_ahead_days: u32) -> bool {
    today.month() == 12 && i64::from(today.day()) > 31 - i64::from(look_ahead_days)
}

/// Relative label used in detection logs: `today`, `tomorrow` or `in N days`.
pub fn day_label(today: NaiveDate, date: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {n} days"),
    }
}

/// # Poller Configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Monitored ISO codes. Empty means "every country the source knows".
    pub countries: Vec<String>,
    /// Extra days after today to check.
    pub look_ahead_days: u32,
    /// Pause between cycles.
    pub interval: Duration,
    /// Cross-cycle repeat handling.
    pub repeat_policy: RepeatPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            look_ahead_days: 0,
            interval: Duration::from_secs(60 * 60),
            repeat_policy: RepeatPolicy::default(),
        }
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Countries whose calendars were fetched successfully.
    pub countries_checked: usize,
    /// Countries skipped because a fetch failed.
    pub countries_failed: Vec<String>,
    /// Events published on `holiday.detected`.
    pub published: usize,
    /// Matches skipped because an earlier cycle already announced them.
    pub suppressed: usize,
    /// The cycle stopped early on cancellation.
    pub cancelled: bool,
}

/// # Holiday Poller
pub struct HolidayPoller {
    source: Arc<dyn HolidaySource>,
    bus: Arc<dyn EventBus>,
    config: PollerConfig,
    ledger: Mutex<DetectionLedger>,
}

impl HolidayPoller {
    /// Creates a poller publishing detections from `source` onto `bus`.
    pub fn new(source: Arc<dyn HolidaySource>, bus: Arc<dyn EventBus>, config: PollerConfig) -> Self {
        Self {
            source,
            bus,
            config,
            ledger: Mutex::new(DetectionLedger::new()),
        }
    }

    /// # Main Execution Loop
    ///
    /// Runs a cycle immediately, then one per `interval`, until `shutdown` fires. The sleep
    /// between cycles is interrupted by cancellation; an in-flight fetch is allowed to finish.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            countries = ?self.config.countries,
            look_ahead_days = self.config.look_ahead_days,
            interval_secs = self.config.interval.as_secs(),
            policy = ?self.config.repeat_policy,
            "Holiday poller started"
        );

        while !shutdown.is_cancelled() {
            // --- Phase 1: Poll ---
            match self.poll_at(Utc::now(), &shutdown).await {
                Ok(report) => info!(
                    checked = report.countries_checked,
                    failed = report.countries_failed.len(),
                    published = report.published,
                    suppressed = report.suppressed,
                    "Poll cycle complete"
                ),
                Err(e) => error!(error = %e, "Poll cycle failed, retrying next cycle"),
            }

            // --- Phase 2: Self-Schedule ---
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("Holiday poller stopped");
    }

    /// # Execute Poll
    ///
    /// Runs one cycle as if the current instant were `now`.
    ///
    /// # Errors
    /// `MonitorError::Bus` when a publish fails, `MonitorError::Source` when the country
    /// list had to be discovered and the source refused. Per-country fetch failures are
    /// reported in the [`CycleReport`] instead.
    pub async fn poll_at(
        &self,
        now: DateTime<Utc>,
        shutdown: &CancellationToken,
    ) -> Result<CycleReport, MonitorError> {
        let today = now.date_naive();
        let window = lookahead_window(today, self.config.look_ahead_days);
        let suppress = self.config.repeat_policy == RepeatPolicy::SuppressRepeats;

        if suppress {
            let pruned = self.ledger.lock().prune_before(today);
            if pruned > 0 {
                debug!(pruned, "Pruned expired detections from ledger");
            }
        }

        let countries = self.monitored_countries().await?;
        let mut report = CycleReport::default();
        let mut published_now: HashSet<DetectionKey> = HashSet::new();

        for country in &countries {
            if shutdown.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let holidays = match self.fetch_candidates(today, country).await {
                Ok(holidays) => holidays,
                Err(e) => {
                    warn!(country = %country, error = %e, "Holiday fetch failed, skipping country");
                    report.countries_failed.push(country.clone());
                    continue;
                }
            };
            report.countries_checked += 1;

            for date in &window {
                for holiday in holidays.iter().filter(|h| h.date == *date) {
                    let event = HolidayDetected::from_holiday(holiday, now);
                    let key = event.identity();

                    if suppress && self.ledger.lock().contains(&key) {
                        report.suppressed += 1;
                        continue;
                    }

                    if let Err(e) = publish_message(self.bus.as_ref(), Topic::HolidayDetected, &event).await {
                        if suppress {
                            self.ledger.lock().extend(published_now);
                        }
                        return Err(e.into());
                    }

                    info!(
                        country = %event.country_code,
                        holiday = %event.name,
                        date = %event.date,
                        when = %day_label(today, event.date),
                        "Holiday detected"
                    );
                    report.published += 1;
                    published_now.insert(key);
                }
            }
        }

        if suppress {
            self.ledger.lock().extend(published_now);
        }

        Ok(report)
    }

    async fn monitored_countries(&self) -> Result<Vec<String>, SourceError> {
        if !self.config.countries.is_empty() {
            return Ok(self.config.countries.clone());
        }
        let countries = self.source.fetch_countries().await?;
        debug!(count = countries.len(), "Resolved monitored countries from source");
        Ok(countries)
    }

    /// Current year's calendar, plus next year's when the window crosses December 31st.
    async fn fetch_candidates(&self, today: NaiveDate, country: &str) -> Result<Vec<Holiday>, SourceError> {
        let mut holidays = self.source.fetch_holidays(today.year(), country).await?;
        if crosses_year_boundary(today, self.config.look_ahead_days) {
            let next = self.source.fetch_holidays(today.year() + 1, country).await?;
            holidays.extend(next);
        }
        Ok(holidays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::memory::InMemoryBus;
    use crate::bus::{BusSubscription, Delivery};
    use crate::error::BusError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at_noon(d: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&d.and_hms_opt(12, 0, 0).unwrap())
    }

    fn holiday(code: &str, d: NaiveDate, name: &str) -> Holiday {
        Holiday {
            country_code: code.into(),
            date: d,
            local_name: name.into(),
            name: name.into(),
            is_fixed: true,
            is_global: true,
            holiday_type: Some("Public".into()),
        }
    }

    /// Serves canned calendars keyed by `(year, country)` and records every call.
    #[derive(Default)]
    struct ScriptedSource {
        calendars: HashMap<(i32, String), Result<Vec<Holiday>, SourceError>>,
        countries: Option<Vec<String>>,
        calls: Mutex<Vec<(i32, String)>>,
    }

    impl ScriptedSource {
        fn with(mut self, year: i32, code: &str, result: Result<Vec<Holiday>, SourceError>) -> Self {
            self.calendars.insert((year, code.to_string()), result);
            self
        }
    }

    #[async_trait]
    impl HolidaySource for ScriptedSource {
        async fn fetch_holidays(&self, year: i32, country_code: &str) -> Result<Vec<Holiday>, SourceError> {
            self.calls.lock().push((year, country_code.to_string()));
            self.calendars
                .get(&(year, country_code.to_string()))
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn fetch_countries(&self) -> Result<Vec<String>, SourceError> {
            self.countries
                .clone()
                .ok_or_else(|| SourceError::Transport("no country list".into()))
        }
    }

    /// A bus whose publish always fails.
    struct BrokenBus;

    #[async_trait]
    impl EventBus for BrokenBus {
        async fn publish(&self, topic: Topic, _payload: serde_json::Value) -> Result<Uuid, BusError> {
            Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "broker down".into(),
            })
        }

        async fn subscribe(
            &self,
            _topic: Topic,
            _group: &str,
            _consumer: &str,
        ) -> Result<Box<dyn BusSubscription>, BusError> {
            Err(BusError::Closed)
        }
    }

    /// A bus that accepts its first publish and refuses the rest.
    #[derive(Default)]
    struct FlakyBus {
        accepted: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl EventBus for FlakyBus {
        async fn publish(&self, topic: Topic, _payload: serde_json::Value) -> Result<Uuid, BusError> {
            if self.accepted.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                return Ok(Uuid::new_v4());
            }
            Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "broker down".into(),
            })
        }

        async fn subscribe(
            &self,
            _topic: Topic,
            _group: &str,
            _consumer: &str,
        ) -> Result<Box<dyn BusSubscription>, BusError> {
            Err(BusError::Closed)
        }
    }

    fn config(countries: &[&str], look_ahead_days: u32, repeat_policy: RepeatPolicy) -> PollerConfig {
        PollerConfig {
            countries: countries.iter().map(|c| c.to_string()).collect(),
            look_ahead_days,
            interval: Duration::from_millis(10),
            repeat_policy,
        }
    }

    async fn drain(sub: &mut Box<dyn BusSubscription>) -> Vec<HolidayDetected> {
        let mut events = Vec::new();
        while let Ok(Ok(Delivery { envelope, .. })) =
            tokio::time::timeout(Duration::from_millis(50), sub.next()).await
        {
            events.push(serde_json::from_value(envelope.payload).unwrap());
        }
        events
    }

    #[test]
    fn window_is_today_through_look_ahead() {
        let today = date(2024, 7, 4);
        assert_eq!(lookahead_window(today, 0), vec![today]);
        assert_eq!(
            lookahead_window(today, 3),
            vec![today, date(2024, 7, 5), date(2024, 7, 6), date(2024, 7, 7)]
        );
    }

    #[test]
    fn year_boundary_rule() {
        assert!(!crosses_year_boundary(date(2024, 12, 31), 0));
        assert!(crosses_year_boundary(date(2024, 12, 31), 1));
        assert!(crosses_year_boundary(date(2024, 12, 29), 3));
        assert!(!crosses_year_boundary(date(2024, 12, 28), 3));
        assert!(!crosses_year_boundary(date(2024, 11, 30), 40));
    }

    #[test]
    fn day_labels() {
        let today = date(2024, 7, 4);
        assert_eq!(day_label(today, today), "today");
        assert_eq!(day_label(today, date(2024, 7, 5)), "tomorrow");
        assert_eq!(day_label(today, date(2024, 7, 7)), "in 3 days");
    }

    #[tokio::test]
    async fn holiday_today_is_published_once_and_others_are_ignored() {
        let today = date(2024, 7, 4);
        let source = ScriptedSource::default().with(
            2024,
            "US",
            Ok(vec![
                holiday("US", date(2024, 5, 27), "Memorial Day"),
                holiday("US", today, "Independence Day"),
                holiday("US", date(2024, 7, 5), "Not Today"),
            ]),
        );
        let bus = Arc::new(InMemoryBus::new());
        let mut sub = bus.subscribe(Topic::HolidayDetected, "test", "t").await.unwrap();
        let poller = HolidayPoller::new(Arc::new(source), bus.clone(), config(&["US"], 0, RepeatPolicy::Reaffirm));

        let report = poller.poll_at(at_noon(today), &CancellationToken::new()).await.unwrap();
        let events = drain(&mut sub).await;

        assert_eq!(report.published, 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Independence Day");
        assert_eq!(events[0].country_name, "United States");
        assert_eq!(events[0].detected_at_utc, at_noon(today));
    }

    #[tokio::test]
    async fn look_ahead_emits_in_window_order() {
        let today = date(2024, 12, 24);
        let source = ScriptedSource::default().with(
            2024,
            "GB",
            Ok(vec![
                holiday("GB", date(2024, 12, 26), "Boxing Day"),
                holiday("GB", date(2024, 12, 25), "Christmas Day"),
            ]),
        );
        let bus = Arc::new(InMemoryBus::new());
        let mut sub = bus.subscribe(Topic::HolidayDetected, "test", "t").await.unwrap();
        let poller = HolidayPoller::new(Arc::new(source), bus.clone(), config(&["GB"], 2, RepeatPolicy::Reaffirm));

        poller.poll_at(at_noon(today), &CancellationToken::new()).await.unwrap();
        let names: Vec<String> = drain(&mut sub).await.into_iter().map(|e| e.name).collect();

        assert_eq!(names, vec!["Christmas Day", "Boxing Day"]);
    }

    #[tokio::test]
    async fn year_boundary_fetches_next_year() {
        let today = date(2024, 12, 31);
        let source = Arc::new(
            ScriptedSource::default()
                .with(2024, "DE", Ok(vec![holiday("DE", date(2024, 12, 26), "Zweiter Weihnachtstag")]))
                .with(2025, "DE", Ok(vec![holiday("DE", date(2025, 1, 1), "Neujahr")])),
        );
        let bus = Arc::new(InMemoryBus::new());
        let mut sub = bus.subscribe(Topic::HolidayDetected, "test", "t").await.unwrap();
        let poller = HolidayPoller::new(source.clone(), bus.clone(), config(&["DE"], 1, RepeatPolicy::Reaffirm));

        poller.poll_at(at_noon(today), &CancellationToken::new()).await.unwrap();
        let events = drain(&mut sub).await;

        assert_eq!(*source.calls.lock(), vec![(2024, "DE".to_string()), (2025, "DE".to_string())]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, date(2025, 1, 1));
    }

    #[tokio::test]
    async fn fetch_failure_is_isolated_to_its_country() {
        let today = date(2024, 7, 14);
        let source = ScriptedSource::default()
            .with(2024, "US", Err(SourceError::Unavailable { status: 503, body: "down".into() }))
            .with(2024, "FR", Ok(vec![holiday("FR", today, "Fête nationale")]));
        let bus = Arc::new(InMemoryBus::new());
        let mut sub = bus.subscribe(Topic::HolidayDetected, "test", "t").await.unwrap();
        let poller = HolidayPoller::new(Arc::new(source), bus.clone(), config(&["US", "FR"], 0, RepeatPolicy::Reaffirm));

        let report = poller.poll_at(at_noon(today), &CancellationToken::new()).await.unwrap();
        let events = drain(&mut sub).await;

        assert_eq!(report.countries_failed, vec!["US"]);
        assert_eq!(report.countries_checked, 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].country_code, "FR");
    }

    #[tokio::test]
    async fn suppress_policy_announces_once_across_cycles() {
        let today = date(2024, 7, 4);
        let source = ScriptedSource::default().with(2024, "US", Ok(vec![holiday("US", today, "Independence Day")]));
        let bus = Arc::new(InMemoryBus::new());
        let mut sub = bus.subscribe(Topic::HolidayDetected, "test", "t").await.unwrap();
        let poller = HolidayPoller::new(Arc::new(source), bus.clone(), config(&["US"], 0, RepeatPolicy::SuppressRepeats));
        let token = CancellationToken::new();

        let first = poller.poll_at(at_noon(today), &token).await.unwrap();
        let second = poller.poll_at(at_noon(today) + chrono::Duration::hours(1), &token).await.unwrap();

        assert_eq!((first.published, first.suppressed), (1, 0));
        assert_eq!((second.published, second.suppressed), (0, 1));
        assert_eq!(drain(&mut sub).await.len(), 1);
    }

    #[tokio::test]
    async fn reaffirm_policy_announces_every_cycle() {
        let today = date(2024, 7, 4);
        let source = ScriptedSource::default().with(2024, "US", Ok(vec![holiday("US", today, "Independence Day")]));
        let bus = Arc::new(InMemoryBus::new());
        let mut sub = bus.subscribe(Topic::HolidayDetected, "test", "t").await.unwrap();
        let poller = HolidayPoller::new(Arc::new(source), bus.clone(), config(&["US"], 0, RepeatPolicy::Reaffirm));
        let token = CancellationToken::new();

        poller.poll_at(at_noon(today), &token).await.unwrap();
        poller.poll_at(at_noon(today), &token).await.unwrap();

        let events = drain(&mut sub).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].identity(), events[1].identity());
    }

    #[tokio::test]
    async fn suppressed_holiday_reappears_next_year() {
        let source = ScriptedSource::default()
            .with(2024, "US", Ok(vec![holiday("US", date(2024, 7, 4), "Independence Day")]))
            .with(2025, "US", Ok(vec![holiday("US", date(2025, 7, 4), "Independence Day")]));
        let bus = Arc::new(InMemoryBus::new());
        let poller = HolidayPoller::new(Arc::new(source), bus, config(&["US"], 0, RepeatPolicy::SuppressRepeats));
        let token = CancellationToken::new();

        poller.poll_at(at_noon(date(2024, 7, 4)), &token).await.unwrap();
        poller.poll_at(at_noon(date(2024, 7, 5)), &token).await.unwrap();
        assert!(poller.ledger.lock().is_empty());

        let report = poller.poll_at(at_noon(date(2025, 7, 4)), &token).await.unwrap();
        assert_eq!(report.published, 1);
    }

    #[tokio::test]
    async fn two_holidays_on_one_date_are_both_published() {
        let today = date(2024, 12, 25);
        let source = ScriptedSource::default().with(
            2024,
            "AU",
            Ok(vec![holiday("AU", today, "Christmas Day"), holiday("AU", today, "Regional Day")]),
        );
        let bus = Arc::new(InMemoryBus::new());
        let poller = HolidayPoller::new(Arc::new(source), bus, config(&["AU"], 0, RepeatPolicy::SuppressRepeats));

        let report = poller.poll_at(at_noon(today), &CancellationToken::new()).await.unwrap();
        assert_eq!(report.published, 2);
    }

    #[tokio::test]
    async fn publish_failure_fails_the_cycle_without_recording() {
        let today = date(2024, 7, 4);
        let source = ScriptedSource::default().with(2024, "US", Ok(vec![holiday("US", today, "Independence Day")]));
        let poller = HolidayPoller::new(Arc::new(source), Arc::new(BrokenBus), config(&["US"], 0, RepeatPolicy::SuppressRepeats));

        let result = poller.poll_at(at_noon(today), &CancellationToken::new()).await;

        assert!(matches!(result, Err(MonitorError::Bus(_))));
        assert!(poller.ledger.lock().is_empty());
    }

    #[tokio::test]
    async fn mid_cycle_publish_failure_keeps_what_was_already_published() {
        let today = date(2024, 12, 24);
        let tomorrow = date(2024, 12, 25);
        let source = ScriptedSource::default().with(
            2024,
            "GB",
            Ok(vec![holiday("GB", today, "Christmas Eve"), holiday("GB", tomorrow, "Christmas Day")]),
        );
        let poller = HolidayPoller::new(
            Arc::new(source),
            Arc::new(FlakyBus::default()),
            config(&["GB"], 1, RepeatPolicy::SuppressRepeats),
        );

        let result = poller.poll_at(at_noon(today), &CancellationToken::new()).await;
        assert!(matches!(result, Err(MonitorError::Bus(_))));

        let ledger = poller.ledger.lock();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(&DetectionKey {
            country_code: "GB".into(),
            date: today,
        }));
        assert!(!ledger.contains(&DetectionKey {
            country_code: "GB".into(),
            date: tomorrow,
        }));
    }

    #[tokio::test]
    async fn empty_country_list_is_discovered_from_source() {
        let today = date(2024, 7, 1);
        let source = ScriptedSource {
            countries: Some(vec!["CA".into()]),
            ..Default::default()
        }
        .with(2024, "CA", Ok(vec![holiday("CA", today, "Canada Day")]));
        let poller = HolidayPoller::new(Arc::new(source), Arc::new(InMemoryBus::new()), config(&[], 0, RepeatPolicy::Reaffirm));

        let report = poller.poll_at(at_noon(today), &CancellationToken::new()).await.unwrap();
        assert_eq!(report.countries_checked, 1);
        assert_eq!(report.published, 1);
    }

    #[tokio::test]
    async fn failed_country_discovery_skips_the_cycle() {
        let poller = HolidayPoller::new(
            Arc::new(ScriptedSource::default()),
            Arc::new(InMemoryBus::new()),
            config(&[], 0, RepeatPolicy::Reaffirm),
        );

        let result = poller.poll_at(Utc::now(), &CancellationToken::new()).await;
        assert!(matches!(result, Err(MonitorError::Source(_))));
    }

    #[tokio::test]
    async fn cancelled_cycle_starts_no_fetches() {
        let source = Arc::new(ScriptedSource::default());
        let poller = HolidayPoller::new(source.clone(), Arc::new(InMemoryBus::new()), config(&["US", "GB"], 0, RepeatPolicy::Reaffirm));
        let token = CancellationToken::new();
        token.cancel();

        let report = poller.poll_at(Utc::now(), &token).await.unwrap();
        assert!(report.cancelled);
        assert!(source.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn run_exits_promptly_on_cancellation() {
        let poller = Arc::new(HolidayPoller::new(
            Arc::new(ScriptedSource::default()),
            Arc::new(InMemoryBus::new()),
            PollerConfig {
                interval: Duration::from_secs(3600),
                ..config(&["US"], 0, RepeatPolicy::Reaffirm)
            },
        ));
        let token = CancellationToken::new();
        let handle = {
            let poller = Arc::clone(&poller);
            let token = token.clone();
            tokio::spawn(async move { poller.run(token).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
