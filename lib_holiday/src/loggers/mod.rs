/// Tracing subscriber installation and log file housekeeping.
pub mod setup;

pub use setup::{prune_old_logs, setup_logging};
