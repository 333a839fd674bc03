//! # Settings
//!
//! Resolution order, later wins:
//! 1. **Defaults** ([`Settings::defaults`]).
//! 2. **JSON file** at `--config-path` / `HM_CONFIG_PATH`, default `holiday_monitor.json`.
//!    A missing file is skipped; an unreadable or malformed one is an error.
//! 3. **Environment and CLI**: every field has a `--flag` and an `HM_*` variable, both read
//!    by `clap`.
//!
//! The merged [`Settings`] is then resolved into a concrete [`MonitorSettings`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bus::consumer::ConsumerOptions;
use crate::model::{normalize_country_codes, DEFAULT_COUNTRIES};
use crate::poller::{PollerConfig, RepeatPolicy};

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "holiday_monitor.json";

/// Which pipeline stages a process runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Every stage in one process.
    #[default]
    All,
    /// Poller only.
    Scraper,
    /// Matcher plus the subscription HTTP API.
    UserPref,
    /// Dispatcher plus the websocket hub.
    Notifier,
}

impl Role {
    pub fn runs_poller(self) -> bool {
        matches!(self, Role::All | Role::Scraper)
    }

    pub fn runs_matcher(self) -> bool {
        matches!(self, Role::All | Role::UserPref)
    }

    pub fn runs_dispatcher(self) -> bool {
        matches!(self, Role::All | Role::Notifier)
    }

    /// Whether this role serves any HTTP routes.
    pub fn serves_http(self) -> bool {
        self != Role::Scraper
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::All => "all",
            Role::Scraper => "scraper",
            Role::UserPref => "user-pref",
            Role::Notifier => "notifier",
        })
    }
}

/// Raw, partially specified settings from one source.
#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Holiday detection and notification service", version)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[clap(long, env = "HM_ROLE", value_enum, help = "Pipeline stages to run in this process.")]
    pub role: Option<Role>,

    #[clap(long, env = "HM_PORT", help = "HTTP/websocket listen port.")]
    pub port: Option<u16>,

    #[clap(long, env = "HM_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "HM_LOG_DIR", help = "Directory for rolling log files. Empty disables file logging.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "HM_LOG_LEVEL", help = "Log filter used when RUST_LOG is unset.")]
    pub log_level: Option<String>,

    #[clap(long, env = "HM_POLLING_INTERVAL_HOURS", help = "Hours between poll cycles.")]
    pub polling_interval_hours: Option<u64>,

    #[clap(long, env = "HM_LOOK_AHEAD_DAYS", help = "Days after today included in each cycle.")]
    pub look_ahead_days: Option<u32>,

    #[clap(
        long,
        env = "HM_COUNTRIES",
        value_delimiter = ',',
        help = "Comma separated ISO country codes. Empty means every available country."
    )]
    pub countries: Option<Vec<String>>,

    #[clap(long, env = "HM_REPEAT_POLICY", value_enum, help = "Whether later cycles re-announce a holiday.")]
    pub repeat_policy: Option<RepeatPolicy>,

    #[clap(long, env = "HM_HOLIDAY_API_BASE_URL", help = "Root URL of the holiday API.")]
    pub holiday_api_base_url: Option<String>,

    #[clap(long, env = "HM_HTTP_MAX_RETRIES", help = "Retries for transient holiday API failures.")]
    pub http_max_retries: Option<u32>,

    #[clap(long, env = "HM_REDIS_URL", help = "Redis URL. Enables the Redis bus and store.")]
    pub redis_url: Option<String>,

    #[clap(long, env = "HM_STREAM_PREFIX", help = "Key prefix for Redis streams and records.")]
    pub stream_prefix: Option<String>,

    #[clap(long, env = "HM_BUS_MAX_ATTEMPTS", help = "Deliveries before a message is dead-lettered.")]
    pub bus_max_attempts: Option<u32>,

    #[clap(long, env = "HM_BUS_REDELIVERY_DELAY_MS", help = "Delay before a failed message is redelivered.")]
    pub bus_redelivery_delay_ms: Option<u64>,

    #[clap(long, env = "HM_CORS_ORIGINS", value_delimiter = ',', help = "Allowed CORS origins.")]
    pub cors_origins: Option<Vec<String>>,

    #[clap(long, env = "HM_INSTANCE", help = "Instance name; unique per notifier process.")]
    pub instance: Option<String>,
}

impl Settings {
    /// Built-in defaults.
    pub fn defaults() -> Self {
        Self {
            role: Some(Role::All),
            port: Some(5000),
            config_path: None,
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            polling_interval_hours: Some(1),
            look_ahead_days: Some(0),
            countries: Some(DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect()),
            repeat_policy: Some(RepeatPolicy::default()),
            holiday_api_base_url: Some("https://date.nager.at/api/v3/".to_string()),
            http_max_retries: Some(3),
            redis_url: None,
            stream_prefix: Some("holiday-monitor".to_string()),
            bus_max_attempts: Some(5),
            bus_redelivery_delay_ms: Some(2000),
            cors_origins: Some(vec!["http://localhost:5173".to_string(), "http://localhost:3000".to_string()]),
            instance: Some("notifier-1".to_string()),
        }
    }

    /// Overlays `other` on `self`; every `Some` in `other` wins.
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            role: other.role.or(self.role),
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            polling_interval_hours: other.polling_interval_hours.or(self.polling_interval_hours),
            look_ahead_days: other.look_ahead_days.or(self.look_ahead_days),
            countries: other.countries.or(self.countries),
            repeat_policy: other.repeat_policy.or(self.repeat_policy),
            holiday_api_base_url: other.holiday_api_base_url.or(self.holiday_api_base_url),
            http_max_retries: other.http_max_retries.or(self.http_max_retries),
            redis_url: other.redis_url.or(self.redis_url),
            stream_prefix: other.stream_prefix.or(self.stream_prefix),
            bus_max_attempts: other.bus_max_attempts.or(self.bus_max_attempts),
            bus_redelivery_delay_ms: other.bus_redelivery_delay_ms.or(self.bus_redelivery_delay_ms),
            cors_origins: other.cors_origins.or(self.cors_origins),
            instance: other.instance.or(self.instance),
        }
    }

    /// Reads a JSON settings file. `Ok(None)` when the file does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Settings>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
        let parsed = serde_json::from_str(&raw).with_context(|| format!("malformed settings in {}", path.display()))?;
        Ok(Some(parsed))
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub role: Role,
    pub port: u16,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub polling_interval: Duration,
    pub look_ahead_days: u32,
    /// Normalized codes; empty means discovery through the holiday API.
    pub countries: Vec<String>,
    pub repeat_policy: RepeatPolicy,
    pub holiday_api_base_url: String,
    pub http_max_retries: u32,
    pub redis_url: Option<String>,
    pub stream_prefix: String,
    pub bus_max_attempts: u32,
    pub bus_redelivery_delay: Duration,
    pub cors_origins: Vec<String>,
    pub instance: String,
}

impl MonitorSettings {
    /// Resolves merged settings, filling any gap from the defaults.
    ///
    /// # Errors
    /// Rejects a zero or overflowing polling interval, zero delivery attempts, and a blank
    /// instance name.
    pub fn resolve(settings: Settings) -> Result<Self> {
        let s = Settings::defaults().merge(settings);

        let hours = s.polling_interval_hours.unwrap_or(1);
        if hours == 0 {
            bail!("pollingIntervalHours must be at least 1");
        }
        let Some(interval_secs) = hours.checked_mul(3600) else {
            bail!("pollingIntervalHours {hours} is too large");
        };
        let max_attempts = s.bus_max_attempts.unwrap_or(5);
        if max_attempts == 0 {
            bail!("busMaxAttempts must be at least 1");
        }
        let instance = s.instance.unwrap_or_default().trim().to_string();
        if instance.is_empty() {
            bail!("instance name must not be blank");
        }

        Ok(Self {
            role: s.role.unwrap_or_default(),
            port: s.port.unwrap_or(5000),
            log_dir: s.log_dir.filter(|d| !d.as_os_str().is_empty()),
            log_level: s.log_level.unwrap_or_else(|| "info".to_string()),
            polling_interval: Duration::from_secs(interval_secs),
            look_ahead_days: s.look_ahead_days.unwrap_or(0),
            countries: normalize_country_codes(s.countries.unwrap_or_default()).into_iter().collect(),
            repeat_policy: s.repeat_policy.unwrap_or_default(),
            holiday_api_base_url: s.holiday_api_base_url.unwrap_or_default(),
            http_max_retries: s.http_max_retries.unwrap_or(3),
            redis_url: s.redis_url.filter(|u| !u.trim().is_empty()),
            stream_prefix: s.stream_prefix.unwrap_or_else(|| "holiday-monitor".to_string()),
            bus_max_attempts: max_attempts,
            bus_redelivery_delay: Duration::from_millis(s.bus_redelivery_delay_ms.unwrap_or(2000)),
            cors_origins: s
                .cors_origins
                .unwrap_or_default()
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            instance,
        })
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            countries: self.countries.clone(),
            look_ahead_days: self.look_ahead_days,
            interval: self.polling_interval,
            repeat_policy: self.repeat_policy,
        }
    }

    pub fn consumer_options(&self) -> ConsumerOptions {
        ConsumerOptions {
            max_attempts: self.bus_max_attempts,
            redelivery_delay: self.bus_redelivery_delay,
            ..ConsumerOptions::default()
        }
    }
}

/// Merges the file named by `cli` (or the default file) under `cli` and resolves.
pub fn resolve_with(cli: Settings) -> Result<MonitorSettings> {
    let path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let layered = match Settings::from_file(&path)? {
        Some(file) => {
            info!(path = %path.display(), "Settings file loaded");
            file.merge(cli)
        }
        None => cli,
    };
    MonitorSettings::resolve(layered)
}

/// Loads settings from the process command line and environment.
pub fn load_settings() -> Result<MonitorSettings> {
    resolve_with(Settings::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let s = MonitorSettings::resolve(Settings::default()).unwrap();

        assert_eq!(s.role, Role::All);
        assert_eq!(s.polling_interval, Duration::from_secs(3600));
        assert_eq!(s.look_ahead_days, 0);
        assert_eq!(s.countries, vec!["AU", "CA", "DE", "FR", "GB", "US"]);
        assert_eq!(s.repeat_policy, RepeatPolicy::SuppressRepeats);
        assert_eq!(s.cors_origins, vec!["http://localhost:5173", "http://localhost:3000"]);
        assert!(s.redis_url.is_none());
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let file = Settings {
            port: Some(7000),
            look_ahead_days: Some(3),
            ..Default::default()
        };
        let cli = Settings {
            port: Some(8000),
            ..Default::default()
        };

        let s = MonitorSettings::resolve(file.merge(cli)).unwrap();

        assert_eq!(s.port, 8000);
        assert_eq!(s.look_ahead_days, 3);
    }

    #[test]
    fn cli_flags_parse_lists_and_enums() {
        let cli = Settings::try_parse_from([
            "holiday_monitor",
            "--role",
            "user-pref",
            "--countries",
            "us, gb",
            "--repeat-policy",
            "reaffirm",
        ])
        .unwrap();

        let s = MonitorSettings::resolve(cli).unwrap();

        assert_eq!(s.role, Role::UserPref);
        assert_eq!(s.countries, vec!["GB", "US"]);
        assert_eq!(s.repeat_policy, RepeatPolicy::Reaffirm);
        assert!(s.role.runs_matcher() && !s.role.runs_poller());
    }

    #[test]
    fn empty_country_list_means_discovery() {
        let s = MonitorSettings::resolve(Settings {
            countries: Some(vec![]),
            ..Default::default()
        })
        .unwrap();
        assert!(s.countries.is_empty());
        assert!(s.poller_config().countries.is_empty());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = MonitorSettings::resolve(Settings {
            polling_interval_hours: Some(0),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn overflowing_interval_is_rejected() {
        let result = MonitorSettings::resolve(Settings {
            polling_interval_hours: Some(u64::MAX / 1000),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn file_layer_sits_between_defaults_and_cli() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hm.json");
        fs::write(&path, r#"{ "port": 7000, "lookAheadDays": 2, "role": "notifier" }"#).unwrap();

        let cli = Settings {
            config_path: Some(path),
            role: Some(Role::Scraper),
            ..Default::default()
        };
        let s = resolve_with(cli).unwrap();

        assert_eq!(s.port, 7000);
        assert_eq!(s.look_ahead_days, 2);
        assert_eq!(s.role, Role::Scraper);
    }

    #[test]
    fn malformed_file_is_an_error_and_missing_file_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ nope").unwrap();

        assert!(Settings::from_file(&bad).is_err());
        assert!(Settings::from_file(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn consumer_options_carry_bus_settings() {
        let s = MonitorSettings::resolve(Settings {
            bus_max_attempts: Some(2),
            bus_redelivery_delay_ms: Some(10),
            ..Default::default()
        })
        .unwrap();

        let options = s.consumer_options();
        assert_eq!(options.max_attempts, 2);
        assert_eq!(options.redelivery_delay, Duration::from_millis(10));
    }
}
