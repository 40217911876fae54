use std::path::{Path, PathBuf};

use compact_str::CompactString;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::{
    id::ChatId,
    logging::DEFAULT_MAX_LOG_FILES,
    result::{BotError, Result},
};

/// Settings as stored in the TOML config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub api_url: CompactString,
    pub api_token: CompactString,
    pub telegram_url: CompactString,
    pub telegram_token: CompactString,
    pub chat_id: Option<ChatId>,
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub request_timeout_secs: u64,
    pub log_level: Option<CompactString>,
    pub log_dir: Option<PathBuf>,
    /// Rolled log files kept in `log_dir`
    pub log_max_files: usize,
    /// Post every error record to the chat as well
    pub forward_errors: bool,
    /// Dump raw review API responses under `log_dir`
    pub log_responses: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            api_url: "https://praktikum.yandex.ru/api/user_api/".into(),
            api_token: CompactString::default(),
            telegram_url: "https://api.telegram.org".into(),
            telegram_token: CompactString::default(),
            chat_id: None,
            poll_interval_secs: 5 * 60,
            error_backoff_secs: 30,
            request_timeout_secs: 30,
            log_level: None,
            log_dir: default_log_dir(),
            log_max_files: DEFAULT_MAX_LOG_FILES,
            forward_errors: true,
            log_responses: false,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.config_dir().join("homework-notifier.toml")
    } else {
        PathBuf::from("homework-notifier.toml")
    }
}

fn default_log_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.data_local_dir().join("homework-notifier").join("logs"))
}

/// Load the config file, writing defaults to `config_file` when it does not
/// exist yet
pub fn load_config(config_file: &Path) -> Result<BotConfig> {
    confy::load_path(config_file).map_err(|e| BotError::config_load_error(config_file.into(), e))
}

impl BotConfig {
    /// Apply environment overrides on top of the file values.
    ///
    /// `lookup` resolves a variable name, normally `std::env::var(..).ok()`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = var("PRAKTIKUM_API_URL") {
            self.api_url = url.into();
        }
        if let Some(token) = var("PRAKTIKUM_TOKEN") {
            self.api_token = token.into();
        }
        if let Some(token) = var("TELEGRAM_TOKEN") {
            self.telegram_token = token.into();
        }
        if let Some(chat_id) = var("TELEGRAM_CHAT_ID") {
            self.chat_id = Some(ChatId::new(chat_id.trim()));
        }
        if let Some(secs) = var("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_secs("POLL_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = var("ERROR_BACKOFF_SECS") {
            self.error_backoff_secs = parse_secs("ERROR_BACKOFF_SECS", &secs)?;
        }

        Ok(self)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        BotError::config_validation_error(key, format!("expected whole seconds, got \"{value}\""))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn environment_overrides_file_values() {
        let config = BotConfig::default()
            .with_env_overrides(env(&[
                ("PRAKTIKUM_TOKEN", "y0_token"),
                ("TELEGRAM_TOKEN", "123:abc"),
                ("TELEGRAM_CHAT_ID", " 42 "),
                ("POLL_INTERVAL_SECS", "60"),
                ("ERROR_BACKOFF_SECS", ""),
            ]))
            .unwrap();

        assert_eq!(config.api_token, "y0_token");
        assert_eq!(config.telegram_token, "123:abc");
        assert_eq!(config.chat_id, Some(ChatId::new("42")));
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.error_backoff_secs, 30);
    }

    #[test]
    fn rejects_non_numeric_interval() {
        let result = BotConfig::default().with_env_overrides(env(&[("POLL_INTERVAL_SECS", "5m")]));

        assert!(matches!(
            result,
            Err(BotError::ConfigValidationError { ref field, .. }) if field == "POLL_INTERVAL_SECS"
        ));
    }

    #[test]
    fn loads_partial_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.toml");
        std::fs::write(
            &path,
            "api_token = \"y0_token\"\nchat_id = -100500\npoll_interval_secs = 120\nlog_max_files = 14\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.api_token, "y0_token");
        assert_eq!(config.chat_id, Some(ChatId::new("-100500")));
        assert_eq!(config.poll_interval_secs, 120);
        assert_eq!(config.log_max_files, 14);
        assert_eq!(config.error_backoff_secs, 30);
        assert!(config.forward_errors);
    }

    #[test]
    fn creates_missing_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.toml");

        let config = load_config(&path).unwrap();

        assert_eq!(config, BotConfig::default());
        assert!(path.exists());
    }
}
