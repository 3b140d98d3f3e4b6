//! Health probe body.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Body of the health probe endpoint: `{status: "ok", timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Always "ok" while the server answers.
    pub status: String,
    /// Unix milliseconds at the time of the probe.
    pub timestamp: u64,
}

impl Health {
    /// Builds an "ok" probe stamped with the current time.
    pub fn ok() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            status: "ok".into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_is_ok_and_stamped() {
        let health = Health::ok();
        assert_eq!(health.status, "ok");
        assert!(health.timestamp > 0);
    }

    #[test]
    fn probe_serializes_expected_fields() {
        let value = serde_json::to_value(Health::ok()).unwrap();
        assert_eq!(value["status"], "ok");
        assert!(value["timestamp"].is_u64());
    }
}
