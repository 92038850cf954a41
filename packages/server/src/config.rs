use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Process configuration loaded from the environment. `from_env` normalizes
/// `max_threads=0` to `1` and `max_tries=0` to `u32::MAX` immediately (per the
/// §8 boundary behaviors), so every consumer of `Config` — `InFlightSet`,
/// `Lifecycle`, `EngineConfig` — observes the same already-normalized values.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_threads: u32,
    pub max_tries: u32,
    pub poll_interval_secs: u64,
    pub shutdown_deadline_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            max_threads: env::var("MAX_THREADS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .context("MAX_THREADS must be a valid number")?,
            max_tries: env::var("MAX_TRIES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("MAX_TRIES must be a valid number")?,
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("POLL_INTERVAL_SECS must be a valid number")?,
            shutdown_deadline_secs: env::var("SHUTDOWN_DEADLINE_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("SHUTDOWN_DEADLINE_SECS must be a valid number")?,
        }
        .normalize())
    }

    /// `max_threads=0` normalizes to `1`; `max_tries=0` normalizes to
    /// `u32::MAX` ("unbounded"), per spec §8. Applied once here so every
    /// downstream consumer — `InFlightSet::new`, `Lifecycle::new`,
    /// `EngineConfig` — sees consistent values instead of each normalizing
    /// (or failing to normalize) independently.
    fn normalize(mut self) -> Self {
        if self.max_threads == 0 {
            self.max_threads = 1;
        }
        if self.max_tries == 0 {
            self.max_tries = u32::MAX;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_maps_zero_threads_to_one() {
        let config = Config {
            database_url: String::new(),
            port: 8080,
            max_threads: 0,
            max_tries: 10,
            poll_interval_secs: 1,
            shutdown_deadline_secs: 30,
        }
        .normalize();
        assert_eq!(config.max_threads, 1);
    }

    #[test]
    fn normalize_maps_zero_tries_to_unbounded() {
        let config = Config {
            database_url: String::new(),
            port: 8080,
            max_threads: 4,
            max_tries: 0,
            poll_interval_secs: 1,
            shutdown_deadline_secs: 30,
        }
        .normalize();
        assert_eq!(config.max_tries, u32::MAX);
    }

    #[test]
    fn normalize_leaves_nonzero_values_untouched() {
        let config = Config {
            database_url: String::new(),
            port: 8080,
            max_threads: 4,
            max_tries: 10,
            poll_interval_secs: 1,
            shutdown_deadline_secs: 30,
        }
        .normalize();
        assert_eq!(config.max_threads, 4);
        assert_eq!(config.max_tries, 10);
    }
}
