//! Engine configuration, loadable from TOML

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::error::TalkError;

/// Fixed texts the engine speaks on its own
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Printed before the Description line
    pub description_prefix: String,
    pub cannot_help: String,
    pub farewell: String,
    /// Reply when the player gives the Avatar's name
    pub name_acknowledged: String,
    /// Reply when the player gives any other name
    pub name_doubted: String,
    pub no_room: String,
    pub joined: String,
    /// `{}` is replaced by the missing line index
    pub missing_line: String,
}

impl Default for Messages {
    fn default() -> Self {
        Messages {
            description_prefix: "You see ".to_string(),
            cannot_help: "I cannot help thee with that.".to_string(),
            farewell: "Farewell.".to_string(),
            name_acknowledged: "A pleasure.".to_string(),
            name_doubted: "If you say so...".to_string(),
            no_room: "Thou hast no room for me in thy party! Seek me again if one of thy members doth leave thee.".to_string(),
            joined: "I am honoured to join thee!".to_string(),
            missing_line: "[missing script line {}]".to_string(),
        }
    }
}

impl Messages {
    pub fn missing_line(&self, index: usize) -> String {
        self.missing_line.replace("{}", &index.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of the Pause opcode
    pub pause_ms: u64,
    /// How often input waits, pauses and `stop()` check for cancellation
    pub poll_interval_ms: u64,
    pub messages: Messages,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pause_ms: 400,
            poll_interval_ms: 5,
            messages: Messages::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<EngineConfig, TalkError> {
        let config: EngineConfig = toml::from_str(text)?;
        if config.poll_interval_ms == 0 {
            return Err(TalkError::ConfigError(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<EngineConfig, TalkError> {
        let path = path.as_ref();
        debug!("Loading engine configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        EngineConfig::from_toml_str(&text)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.pause(), Duration::from_millis(400));
        assert_eq!(config.messages.description_prefix, "You see ");
        assert_eq!(config.messages.missing_line(12), "[missing script line 12]");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            pause_ms = 0

            [messages]
            farewell = "Begone!"
            "#,
        )
        .unwrap();
        assert_eq!(config.pause_ms, 0);
        assert_eq!(config.poll_interval_ms, 5);
        assert_eq!(config.messages.farewell, "Begone!");
        assert_eq!(config.messages.cannot_help, "I cannot help thee with that.");
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("poll_interval_ms = 0"),
            Err(TalkError::ConfigError(_))
        ));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            EngineConfig::from_toml_str("pause_ms = \"soon\""),
            Err(TalkError::ConfigError(_))
        ));
    }
}
