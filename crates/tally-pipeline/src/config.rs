//! Configuration for the pipeline orchestrator

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the pipeline orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the input documents
    pub input_dir: PathBuf,

    /// File extensions accepted as input (case-insensitive, no dot)
    pub extensions: Vec<String>,

    /// Checkpoint file location
    pub checkpoint_path: PathBuf,

    /// Items processed at the same time (1 = strictly sequential)
    pub concurrency: usize,

    /// Stop dispatching new items on Ctrl+C
    pub stop_on_interrupt: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/raw"),
            extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            checkpoint_path: PathBuf::from("data/checkpoint.json"),
            concurrency: 1,
            stop_on_interrupt: true,
        }
    }
}

impl PipelineConfig {
    /// Parallel preset: four items in flight
    pub fn parallel() -> Self {
        Self {
            concurrency: 4,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.extensions.is_empty() {
            return Err("extensions must not be empty".to_string());
        }
        if self.extensions.iter().any(|e| e.trim().is_empty() || e.starts_with('.')) {
            return Err("extensions must be non-empty and written without a leading dot".to_string());
        }
        if self.checkpoint_path.as_os_str().is_empty() {
            return Err("checkpoint_path must not be empty".to_string());
        }
        Ok(())
    }

    /// Whether `extension` is an accepted input extension
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_parallel_config_is_valid() {
        assert!(PipelineConfig::parallel().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = PipelineConfig::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dotted_extension_rejected() {
        let mut config = PipelineConfig::default();
        config.extensions = vec![".jpg".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let config = PipelineConfig::default();
        assert!(config.accepts_extension("JPG"));
        assert!(config.accepts_extension("png"));
        assert!(!config.accepts_extension("pdf"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PipelineConfig::parallel();
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
