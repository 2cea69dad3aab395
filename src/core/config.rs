//! Session configuration.
//!
//! The shell settings shared by every variant live in `SessionConfig`.
//! Variant rules carry their own settings struct (see
//! `games::borscht::BorschtSettings`). Both deserialize from the room's
//! `game_settings` JSON with a default for every missing field, and both
//! offer `with_*` builders for code and tests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// Shell configuration for one session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a player has to answer a request before the fallback applies.
    pub request_timeout_secs: u64,

    /// Number of broadcast messages kept for reconnect replay.
    pub event_log_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            event_log_limit: 256,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the shell settings out of a room's settings object.
    ///
    /// Unknown keys are ignored so variant settings may share the object.
    pub fn from_settings(settings: &serde_json::Value) -> Result<Self, SessionError> {
        if settings.is_null() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_value(settings.clone())
            .map_err(|e| SessionError::config(format!("invalid session settings: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    #[must_use]
    pub fn with_event_log_limit(mut self, limit: usize) -> Self {
        self.event_log_limit = limit;
        self
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.request_timeout_secs == 0 {
            return Err(SessionError::config("request timeout must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.event_log_limit, 256);
    }

    #[test]
    fn test_from_settings_fills_missing_fields() {
        let config = SessionConfig::from_settings(&json!({
            "request_timeout_secs": 5,
            "market_capacity": 6
        }))
        .unwrap();

        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.event_log_limit, 256);

        assert_eq!(
            SessionConfig::from_settings(&serde_json::Value::Null).unwrap(),
            SessionConfig::default()
        );
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = SessionConfig::from_settings(&json!({ "request_timeout_secs": 0 }));
        assert!(matches!(err, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::new()
            .with_request_timeout(Duration::from_secs(3))
            .with_event_log_limit(8);
        assert_eq!(config.request_timeout_secs, 3);
        assert_eq!(config.event_log_limit, 8);
    }
}
