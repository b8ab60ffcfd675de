use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, Map};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSocketConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Capacity of each session's outbound queue. A session whose queue is
    /// full when a broadcast arrives is evicted.
    pub outbound_buffer: usize,
    pub command_buffer: usize,
    pub max_message_size: usize,
    pub close_timeout_secs: u64,
}

impl WebSocketConfig {
    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub denylist_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub websocket: WebSocketConfig,
    pub chat: ChatConfig,
    pub cors: CorsConfig,
    pub log: LogConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::defaults("development")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_WEBSOCKET__PORT=9001` would set `Settings.websocket.port`
            .add_source(Self::environment())
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Builds settings from defaults overlaid with an explicit set of
    /// `APP_*` variables instead of the process environment.
    pub fn from_env_map(vars: Map<String, String>) -> Result<Self, ConfigError> {
        let settings: Settings = Self::defaults("test")?
            .add_source(Self::environment().source(Some(vars)))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    #[cfg(test)]
    pub fn new_for_test() -> Result<Self, ConfigError> {
        Self::from_env_map(Map::new())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // room for the greeting and the join notice
        if self.websocket.outbound_buffer < 2 {
            return Err(ConfigError::Message(
                "websocket.outbound_buffer must be at least 2".into(),
            ));
        }
        if self.websocket.command_buffer == 0 {
            return Err(ConfigError::Message(
                "websocket.command_buffer must be at least 1".into(),
            ));
        }
        if !self.websocket.path.starts_with('/') {
            return Err(ConfigError::Message(format!(
                "websocket.path must start with '/', got {:?}",
                self.websocket.path
            )));
        }
        Ok(())
    }

    fn defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("websocket.host", "127.0.0.1")?
            .set_default("websocket.port", 8081)?
            .set_default("websocket.path", "/ws")?
            .set_default("websocket.outbound_buffer", 256)?
            .set_default("websocket.command_buffer", 1024)?
            .set_default("websocket.max_message_size", 64 * 1024)?
            .set_default("websocket.close_timeout_secs", 5)?
            .set_default("chat.denylist_path", "swear_word.txt")?
            .set_default("cors.enabled", true)?
            .set_default("cors.allow_any_origin", true)?
            .set_default("cors.max_age", 3600)?
            .set_default("log.level", "info")
    }

    fn environment() -> Environment {
        Environment::with_prefix("app")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::new_for_test().expect("Failed to load settings");
        assert_eq!(settings.environment, "test");
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.workers as usize, num_cpus::get());
        assert_eq!(settings.websocket.port, 8081);
        assert_eq!(settings.websocket.path, "/ws");
        assert_eq!(settings.websocket.outbound_buffer, 256);
        assert_eq!(settings.websocket.close_timeout(), Duration::from_secs(5));
        assert_eq!(settings.chat.denylist_path, "swear_word.txt");
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    fn test_environment_override() {
        let settings = Settings::from_env_map(vars(&[
            ("APP_SERVER__PORT", "9000"),
            ("APP_WEBSOCKET__PORT", "9001"),
            ("APP_WEBSOCKET__OUTBOUND_BUFFER", "8"),
            ("APP_CHAT__DENYLIST_PATH", "/etc/chat/words.txt"),
            ("APP_CORS__ALLOW_ANY_ORIGIN", "false"),
        ]))
        .expect("Failed to deserialize settings");

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.websocket.port, 9001);
        assert_eq!(settings.websocket.outbound_buffer, 8);
        assert_eq!(settings.chat.denylist_path, "/etc/chat/words.txt");
        assert!(!settings.cors.allow_any_origin);
        // untouched keys keep their defaults
        assert_eq!(settings.websocket.path, "/ws");
    }

    #[test]
    fn test_invalid_port() {
        let result = Settings::from_env_map(vars(&[("APP_SERVER__PORT", "invalid")]));

        assert!(result.is_err(), "Expected error for invalid port");

        if let Err(e) = result {
            let error_message = e.to_string();
            assert!(
                error_message.contains("invalid digit found in string") ||
                error_message.contains("invalid value") ||
                error_message.contains("invalid type"),
                "Unexpected error: {}",
                error_message
            );
        }
    }

    #[test]
    fn test_zero_outbound_buffer_rejected() {
        let result = Settings::from_env_map(vars(&[("APP_WEBSOCKET__OUTBOUND_BUFFER", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_single_slot_outbound_buffer_rejected() {
        let result = Settings::from_env_map(vars(&[("APP_WEBSOCKET__OUTBOUND_BUFFER", "1")]));
        let message = result.expect_err("one slot cannot hold greeting and join").to_string();
        assert!(message.contains("at least 2"), "Unexpected error: {}", message);

        let settings = Settings::from_env_map(vars(&[("APP_WEBSOCKET__OUTBOUND_BUFFER", "2")]));
        assert_eq!(settings.unwrap().websocket.outbound_buffer, 2);
    }

    #[test]
    fn test_relative_websocket_path_rejected() {
        let result = Settings::from_env_map(vars(&[("APP_WEBSOCKET__PATH", "ws")]));
        let message = result.expect_err("path without leading slash").to_string();
        assert!(message.contains("websocket.path"), "Unexpected error: {}", message);
    }
}
