//! # Holiday Monitor Library
//!
//! Detection-to-notification pipeline for public holidays:
//!
//! `poller` -> bus `holiday.detected` -> `matcher` -> bus `notify.users` -> `realtime` -> clients
//!
//! The core components (model, bus, store, poller, matcher, registry, dispatcher) are always
//! compiled. Transports and process plumbing are feature gated by folder:
//!
//! - `retrieve`: HTTP holiday source client (`reqwest` + retry middleware).
//! - `realtime`: websocket hub and HTTP routes (`axum`).
//! - `connections`: Redis Streams bus and Redis subscription store.
//! - `loggers`: `tracing-subscriber` setup with rolling files.
//! - `configs`: layered settings (defaults, JSON file, env, CLI).

pub mod bus;
pub mod error;
pub mod matcher;
pub mod model;
pub mod pipeline;
pub mod poller;
pub mod realtime;
pub mod source;
pub mod store;

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "connections")]
pub mod connections;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;

pub use error::{BusError, HandlerError, MonitorError, RegistryError, SourceError, StoreError};
pub use model::{country_name, DetectionKey, Holiday, HolidayAlert, HolidayDetected, NotifyCommand, Subscription};
pub use source::HolidaySource;
