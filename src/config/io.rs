//! Config I/O operations: load and save.

use std::path::{Path, PathBuf};

use super::config_struct::Config;

/// Environment variables checked for an API key, in priority order
const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Get the config file path
pub fn get_config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_default()
        .join("live-vision-chat");
    let _ = std::fs::create_dir_all(&config_dir);
    config_dir.join("config.json")
}

/// Load config from disk, falling back to defaults. Never fails.
pub fn load_config() -> Config {
    let mut config = read_config(&get_config_path());
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

fn read_config(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }

    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&data) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Ignoring corrupt config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let key = API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty());
    if let Some(key) = key {
        config.gemini_api_key = key.trim().to_string();
    }
}

/// Save config to disk
pub fn save_config(config: &Config) {
    let path = get_config_path();
    match serde_json::to_string_pretty(config) {
        Ok(data) => {
            if let Err(e) = std::fs::write(&path, data) {
                log::warn!("Failed to save config to {}: {}", path.display(), e);
            }
        }
        Err(e) => log::warn!("Failed to serialize config: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"gemini_api_key":"abc"}"#).unwrap();
        assert_eq!(config.api_key(), Some("abc"));
        assert_eq!(config.voice_name, "Orus");
        assert_eq!(config.frame_rate, 1.0);
        assert_eq!(config.jpeg_quality, 60);
        assert!(config.camera_snapshot_path.is_none());
    }

    #[test]
    fn test_missing_or_corrupt_file_gives_defaults() {
        let dir = std::env::temp_dir().join("live-vision-chat-config-test");
        let _ = std::fs::create_dir_all(&dir);
        assert_eq!(read_config(&dir.join("absent.json")), Config::default());

        let corrupt = dir.join("corrupt.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        assert_eq!(read_config(&corrupt), Config::default());
    }

    #[test]
    fn test_env_key_priority() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| match name {
            "GEMINI_API_KEY" => Some("  ".into()),
            "API_KEY" => Some("fallback".into()),
            _ => None,
        });
        assert_eq!(config.api_key(), Some("fallback"));

        apply_env_overrides(&mut config, |name| {
            (name == "GEMINI_API_KEY").then(|| "primary".to_string())
        });
        assert_eq!(config.gemini_api_key, "primary");
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = Config {
            gemini_api_key: " \t".into(),
            ..Config::default()
        };
        assert_eq!(config.api_key(), None);
    }
}
