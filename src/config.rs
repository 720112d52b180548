use crate::error::Result;
use crate::switch::SwitchConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Load environment variables from a .env file.
/// Variables already present in the environment win.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in parse_dotenv(&content) {
        if std::env::var(&key).is_err() {
            // SAFETY: called at startup before any other thread exists
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

fn default_tick_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub switches: Vec<SwitchDefinition>,
    /// Interval at which engine timers are polled
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchDefinition {
    pub id: String,
    #[serde(flatten)]
    pub config: SwitchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            switches: vec![
                SwitchDefinition {
                    id: "relay-1".to_string(),
                    config: SwitchConfig {
                        group_id: Some(1),
                        ..Default::default()
                    },
                },
                SwitchDefinition {
                    id: "relay-2".to_string(),
                    config: SwitchConfig {
                        group_id: Some(1),
                        ..Default::default()
                    },
                },
                SwitchDefinition {
                    id: "doorbell".to_string(),
                    config: SwitchConfig {
                        inching_timeout: Some(1500),
                        inching_lock: Some(true),
                        ..Default::default()
                    },
                },
            ],
            tick_ms: default_tick_ms(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load from `path` when given, defaults otherwise, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(tick) = lookup("ZSWITCH_TICK_MS")
            && let Ok(t) = tick.parse()
        {
            self.tick_ms = t;
        }
    }
}
