/// Declarative generator configuration, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::filters::FilterConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Settings applied by `GeneratorBuilder::config`. Omitted fields take
/// the builder defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub filters: Vec<FilterConfig>,
    pub reincorporate: bool,
    pub persistence: bool,
    pub audit: bool,
    pub seed: Option<u64>,
    /// Groups within this distance of the best score stay eligible.
    pub salience_margin: Option<f64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            reincorporate: false,
            persistence: true,
            audit: false,
            seed: None,
            salience_margin: None,
        }
    }
}

impl GeneratorConfig {
    pub fn load_from_ron(path: &Path) -> Result<GeneratorConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<GeneratorConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }
}
