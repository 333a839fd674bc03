/// Layered process settings: defaults, JSON file, environment and command line.
pub mod settings;

pub use settings::{load_settings, MonitorSettings, Role, Settings};
