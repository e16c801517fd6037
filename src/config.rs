use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Mirror text logs to stdout (ignored for JSON output)
    #[serde(default = "default_log_stdout")]
    pub log_stdout: bool,
    #[serde(default)]
    pub replay: ReplayConfig,
}

fn default_log_stdout() -> bool {
    true
}

/// Replay binary inputs and outputs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReplayConfig {
    pub input_dir: String,
    pub output_dir: String,
    /// Required human-readable prefix of every address in fixtures
    pub address_prefix: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            input_dir: "fixtures".to_string(),
            output_dir: "output".to_string(),
            address_prefix: "loan".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> Result<Self> {
        Self::load_from(format!("config/{}.yaml", env))
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_default_replay() {
        let yaml = r#"
log_level: info
log_dir: ./logs
log_file: loan.log
use_json: false
rotation: daily
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rotation, "daily");
        assert!(config.log_stdout);
        assert_eq!(config.replay.address_prefix, "loan");
        assert_eq!(config.replay.input_dir, "fixtures");
    }

    #[test]
    fn test_parse_replay_section() {
        let yaml = r#"
log_level: debug
log_dir: ./logs
log_file: loan.log
use_json: true
rotation: never
replay:
  input_dir: data/in
  output_dir: data/out
  address_prefix: cosmos
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert!(config.use_json);
        assert_eq!(config.replay.output_dir, "data/out");
        assert_eq!(config.replay.address_prefix, "cosmos");
    }

    #[test]
    fn test_missing_file() {
        assert!(AppConfig::load_from("does/not/exist.yaml").is_err());
    }
}
