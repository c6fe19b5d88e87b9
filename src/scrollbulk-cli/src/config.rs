use scrollbulk_core::ClientConfig;
use serde::{Deserialize, Serialize};

pub const USERNAME_ENV: &str = "SCROLLBULK_USERNAME";
pub const PASSWORD_ENV: &str = "SCROLLBULK_PASSWORD";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub elastic: ClientConfig,

    /// Directory for JSON log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl CliConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: CliConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Credentials from the environment win over the file.
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(
            std::env::var(USERNAME_ENV).ok(),
            std::env::var(PASSWORD_ENV).ok(),
        );
        self
    }

    fn apply_overrides(&mut self, username: Option<String>, password: Option<String>) {
        if let Some(username) = username {
            self.elastic.username = username;
        }
        if let Some(password) = password {
            self.elastic.password = password;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_client_config() {
        let config: CliConfig = serde_json::from_str(
            r#"{
                "elastic": { "url": "https://es.internal:9200", "username": "exporter", "max_retries": 3 },
                "log_dir": "./logs"
            }"#,
        )
        .unwrap();

        assert_eq!(config.elastic.url, "https://es.internal:9200");
        assert_eq!(config.elastic.max_retries, 3);
        assert_eq!(config.elastic.retry_on_status, vec![429, 502, 503, 504]);
        assert_eq!(config.log_dir.as_deref(), Some("./logs"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: CliConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.elastic.url, "http://localhost:9200");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides_replace_credentials() {
        let mut config = CliConfig::default();
        config.elastic.username = "file-user".to_string();
        config.apply_overrides(None, Some("secret".to_string()));

        assert_eq!(config.elastic.username, "file-user");
        assert_eq!(config.elastic.password, "secret");
    }
}
