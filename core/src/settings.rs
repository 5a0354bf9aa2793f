use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://dummyjson.com/recipes/search";
pub const DEFAULT_QUERY_PARAM: &str = "q";
pub const DEFAULT_RESULTS_KEY: &str = "recipes";
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 300;
pub const DEFAULT_HIDE_GRACE_MS: u64 = 200;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Tunables of a search session. Every field has a default, so a partial
/// config file is fine.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub endpoint: String,
    pub query_param: String,
    pub results_key: String,
    pub quiet_period_ms: u64,
    pub hide_grace_ms: u64,
    pub request_timeout_secs: u64,
    /// When false, a query already in the cache is shown right away instead
    /// of after the quiet period.
    pub debounce_cache_hits: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            query_param: DEFAULT_QUERY_PARAM.to_string(),
            results_key: DEFAULT_RESULTS_KEY.to_string(),
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            hide_grace_ms: DEFAULT_HIDE_GRACE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            debounce_cache_hits: true,
        }
    }
}

impl Settings {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn hide_grace(&self) -> Duration {
        Duration::from_millis(self.hide_grace_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
