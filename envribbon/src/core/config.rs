use std::path::PathBuf;
use std::time::Duration;

use super::Size;
use crate::preferences::default_preferences_path;

pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://api.ipify.org?format=json",
    "https://api64.ipify.org?format=json",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
    "https://checkip.amazonaws.com",
];

/// Daemon configuration. User settings (rules, default ribbon, positions)
/// live in `Preferences`, not here.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoints: Vec<String>,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// Delay between the network becoming reachable and the lookup.
    pub settle_delay: Duration,
    pub ribbon_size: Size,
    /// Distance of the default position from the top-right corner.
    pub ribbon_margin: f64,
    pub preferences_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(60),
            settle_delay: Duration::from_secs(1),
            ribbon_size: Size::new(200.0, 40.0),
            ribbon_margin: 20.0,
            preferences_path: default_preferences_path(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = path.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
