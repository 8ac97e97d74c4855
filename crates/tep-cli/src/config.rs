use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tep_core::reconciler::{Settings, DEFAULT_BOT_USER, DEFAULT_TRACKING_LABEL};
use tep_github::{ClientConfig, DEFAULT_API_BASE_URL};

/// Bot settings read from `--config` / `TEPBOT_CONFIG`. Every field is
/// optional; a missing file section falls back to the public GitHub defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub api_base_url: String,
    pub bot_user: String,
    pub tracking_label: String,
    pub per_page: u32,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            bot_user: DEFAULT_BOT_USER.to_string(),
            tracking_label: DEFAULT_TRACKING_LABEL.to_string(),
            per_page: 20,
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl BotConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn client_config(&self, token: Option<String>) -> ClientConfig {
        let mut config = ClientConfig {
            api_base_url: self.api_base_url.clone(),
            token,
            per_page: self.per_page,
            timeout: Duration::from_secs(self.timeout_secs),
            ..ClientConfig::default()
        };
        if let Some(agent) = &self.user_agent {
            config.user_agent = agent.clone();
        }
        config
    }

    pub fn settings(&self) -> Settings {
        Settings {
            bot_user: self.bot_user.clone(),
            tracking_label: self.tracking_label.clone(),
        }
    }
}
