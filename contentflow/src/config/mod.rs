//! Settings for the capabilities, the pipeline graph and logging.
//!
//! Settings are plain values built by the caller (from the environment or a
//! JSON file) and passed to whatever needs them; nothing in the crate reads
//! them from global state.

use crate::errors::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Default bound on the moderation → copy retry edge.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// OpenAI configuration.
    #[serde(default)]
    pub openai: OpenAiSettings,
    /// Telegram credentials.
    #[serde(default)]
    pub telegram: TelegramSettings,
    /// VK credentials.
    #[serde(default)]
    pub vk: VkSettings,
    /// Graph and retry settings.
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Logging settings.
    #[serde(default)]
    pub log: LogSettings,
}

/// OpenAI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiSettings {
    /// API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Chat model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

/// Telegram Bot API credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramSettings {
    /// Bot token.
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Target chat or channel id.
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// VK API credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VkSettings {
    /// Community access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Community (group) id, without the leading minus.
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Graph and retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSettings {
    /// Maximum number of times rejected content is sent back for rewriting.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Treat unreachable steps as a configuration error.
    #[serde(default)]
    pub strict: bool,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            strict: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSettings {
    /// Filter directive, e.g. "info" or "contentflow=debug".
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| SettingsError::invalid(key, e.to_string()))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, SettingsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SettingsError::invalid(key, format!("expected a boolean, got '{other}'"))),
    }
}

impl Settings {
    /// Loads settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unparsable value.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through a variable lookup function.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(v) = lookup("OPENAI_API_KEY") {
            settings.openai.api_key = Some(v);
        }
        if let Some(v) = lookup("OPENAI_MODEL") {
            settings.openai.model = v;
        }
        if let Some(v) = lookup("OPENAI_TEMPERATURE") {
            settings.openai.temperature = parse_value("OPENAI_TEMPERATURE", &v)?;
        }
        settings.telegram.bot_token = lookup("TELEGRAM_BOT_TOKEN");
        settings.telegram.chat_id = lookup("TELEGRAM_CHAT_ID");
        settings.vk.access_token = lookup("VK_ACCESS_TOKEN");
        settings.vk.group_id = lookup("VK_GROUP_ID");
        if let Some(v) = lookup("PIPELINE_MAX_RETRIES") {
            settings.pipeline.max_retries = parse_value("PIPELINE_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("PIPELINE_STRICT") {
            settings.pipeline.strict = parse_flag("PIPELINE_STRICT", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            settings.log.level = v;
        }
        if let Some(v) = lookup("LOG_JSON") {
            settings.log.json = parse_flag("LOG_JSON", &v)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            return Err(SettingsError::invalid(
                "openai.temperature",
                "must be between 0.0 and 2.0",
            ));
        }
        if self.openai.model.trim().is_empty() {
            return Err(SettingsError::invalid("openai.model", "must not be empty"));
        }
        if self.log.level.trim().is_empty() {
            return Err(SettingsError::invalid("log.level", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.openai.model, "gpt-4");
        assert!((settings.openai.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(settings.pipeline.max_retries, DEFAULT_MAX_RETRIES);
        assert!(!settings.pipeline.strict);
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    fn test_from_lookup() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_TEMPERATURE", "0.2"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "@acme"),
            ("PIPELINE_MAX_RETRIES", "5"),
            ("PIPELINE_STRICT", "yes"),
            ("LOG_JSON", "1"),
        ]))
        .unwrap();

        assert_eq!(settings.openai.api_key.as_deref(), Some("sk-test"));
        assert!((settings.openai.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(settings.telegram.chat_id.as_deref(), Some("@acme"));
        assert!(settings.vk.access_token.is_none());
        assert_eq!(settings.pipeline.max_retries, 5);
        assert!(settings.pipeline.strict);
        assert!(settings.log.json);
    }

    #[test]
    fn test_from_lookup_invalid_number() {
        let err = Settings::from_lookup(lookup(&[("PIPELINE_MAX_RETRIES", "many")])).unwrap_err();
        assert!(err.to_string().contains("PIPELINE_MAX_RETRIES"));
    }

    #[test]
    fn test_from_lookup_invalid_flag() {
        assert!(Settings::from_lookup(lookup(&[("PIPELINE_STRICT", "maybe")])).is_err());
    }

    #[test]
    fn test_validate_temperature_range() {
        let mut settings = Settings::default();
        settings.openai.temperature = 3.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"openai": {{"api_key": "sk-file"}}, "pipeline": {{"max_retries": 1}}}}"#
        )
        .unwrap();

        let settings = Settings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.openai.api_key.as_deref(), Some("sk-file"));
        assert_eq!(settings.openai.model, "gpt-4");
        assert_eq!(settings.pipeline.max_retries, 1);
    }

    #[test]
    fn test_from_json_file_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pipeline": {{"max_retry": 1}}}}"#).unwrap();
        assert!(matches!(
            Settings::from_json_file(file.path()),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_from_json_file_missing() {
        assert!(matches!(
            Settings::from_json_file("/nonexistent/contentflow.json"),
            Err(SettingsError::Io(_))
        ));
    }
}
