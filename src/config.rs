use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_reply_delay_ms() -> u64 {
    400
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub window: WindowConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                reply_delay_ms: default_reply_delay_ms(),
            },
            window: WindowConfig {
                width: 1100,
                height: 720,
                min_width: 720,
                min_height: 480,
            },
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        let mut config = if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                    eprintln!("Error parsing config.toml: {}. Using defaults.", e);
                    Config::default()
                }),
                Err(e) => {
                    eprintln!("Error reading config.toml: {}. Using defaults.", e);
                    Config::default()
                }
            }
        } else {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            Config::default()
        };

        if let Ok(url) = std::env::var("CHARTBOT_BACKEND") {
            if !url.trim().is_empty() {
                config.backend.base_url = url.trim().to_string();
            }
        }

        config
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/chartbot")
        } else {
            PathBuf::from(".")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.reply_delay_ms, 400);
    }

    #[test]
    fn test_parse_fills_reply_delay() {
        let config = Config::parse(
            r#"
[backend]
base_url = "http://analysis.local:9000"

[window]
width = 800
height = 600
min_width = 400
min_height = 300
"#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "http://analysis.local:9000");
        assert_eq!(config.backend.reply_delay_ms, 400);
        assert_eq!(config.window.width, 800);
    }

    #[test]
    fn test_parse_rejects_missing_sections() {
        assert!(Config::parse("[backend]\nbase_url = \"x\"\n").is_err());
    }
}
