//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. The duplicate-prevention policy constants (lock timeout,
//! sweep cadence, content-match window, allocation retry bound) are
//! deployment tunables here rather than literals buried in the code.

use std::env;

/// POS server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Age in seconds past which a request lock no longer blocks
    pub lock_timeout_secs: u64,

    /// Cadence of the periodic lock sweep
    pub lock_sweep_interval_secs: u64,

    /// Hard cap on concurrently tracked request locks
    pub max_request_locks: usize,

    /// Trailing window for content-based duplicate detection
    pub content_match_window_secs: u64,

    /// Attempts to find a free bill number before giving up
    pub bill_allocation_retries: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "restaurant_pos.db".to_string()),

            lock_timeout_secs: env::var("LOCK_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LOCK_TIMEOUT_SECS".to_string()))?,

            lock_sweep_interval_secs: env::var("LOCK_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LOCK_SWEEP_INTERVAL_SECS".to_string()))?,

            max_request_locks: env::var("MAX_REQUEST_LOCKS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MAX_REQUEST_LOCKS".to_string()))?,

            content_match_window_secs: env::var("CONTENT_MATCH_WINDOW_SECS")
                .unwrap_or_else(|_| "300".to_string()) // 5 minutes
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("CONTENT_MATCH_WINDOW_SECS".to_string())
                })?,

            bill_allocation_retries: env::var("BILL_ALLOCATION_RETRIES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BILL_ALLOCATION_RETRIES".to_string()))?,
        };

        if config.lock_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("LOCK_TIMEOUT_SECS".to_string()));
        }
        if config.bill_allocation_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "BILL_ALLOCATION_RETRIES".to_string(),
            ));
        }

        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 3001,
            database_path: "restaurant_pos.db".to_string(),
            lock_timeout_secs: 30,
            lock_sweep_interval_secs: 5,
            max_request_locks: 1000,
            content_match_window_secs: 300,
            bill_allocation_retries: 5,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy_constants() {
        let config = ServerConfig::default();
        assert_eq!(config.lock_timeout_secs, 30);
        assert_eq!(config.lock_sweep_interval_secs, 5);
        assert_eq!(config.max_request_locks, 1000);
        assert_eq!(config.content_match_window_secs, 300);
        assert_eq!(config.bill_allocation_retries, 5);
    }
}
