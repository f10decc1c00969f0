//! Server settings.

use serde::Deserialize;

/// Settings for a [`DuelServer`](crate::DuelServer).
///
/// Every field has a default, so a partial config deserializes fine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// A connection that sends nothing for this long is closed and
    /// treated as disconnected.
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            idle_timeout_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3001");
        assert_eq!(config.idle_timeout_secs, 300);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "idle_timeout_secs": 5 }"#).unwrap();
        assert_eq!(config.idle_timeout_secs, 5);
        assert_eq!(config.bind_addr, "127.0.0.1:3001");
    }
}
