//! Engine configuration resolved from the environment.
//!
//! Values come from env vars (a `.env` file is honored via dotenvy) with
//! sensible defaults, so embedding applications configure nothing unless
//! they need to.

use std::time::Duration;

/// Tunables of the engine runtime.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Request timeout of the bundled HTTP integration client.
    pub http_timeout: Duration,
    /// Suggested interval between `Engine::fire_due_schedules` sweeps.
    pub schedule_poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            schedule_poll_interval: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Resolves the config from `FLOWLOOM_HTTP_TIMEOUT_MS` and
    /// `FLOWLOOM_SCHEDULE_POLL_MS`, falling back to defaults for unset or
    /// unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            http_timeout: env_millis("FLOWLOOM_HTTP_TIMEOUT_MS").unwrap_or(defaults.http_timeout),
            schedule_poll_interval: env_millis("FLOWLOOM_SCHEDULE_POLL_MS")
                .unwrap_or(defaults.schedule_poll_interval),
        }
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable duration env var");
            None
        }
    }
}
