//! Engine configuration
//!
//! Defaults, then an optional file, then `LAZYSCOPE__*` environment overrides.

use std::path::Path;

use ::config::{Config, Environment, File};
use image_perceiver::AnalysisConfig;
use lcp_tracker::LcpConfig;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

const ENV_PREFIX: &str = "LAZYSCOPE";
const ENV_SEPARATOR: &str = "__";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lcp: LcpConfig,
    pub analysis: AnalysisConfig,
}

impl EngineConfig {
    /// Load configuration from multiple sources.
    ///
    /// The file format is picked from its extension (toml, json, yaml).
    pub fn load(config_file: Option<&Path>) -> Result<Self, EngineError> {
        let mut builder = Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );
        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }
}
