//! Configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use wifitracker_core::pipeline::DEFAULT_QUEUE_CAPACITY;
use wifitracker_core::PipelineConfig;
use wifitracker_sniffer::{LinkType, SnifferConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub analyze: AnalyzeSection,
    #[serde(default)]
    pub sniff: SniffSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Parser workers, 0 for one per CPU
    #[serde(default)]
    pub workers: usize,
    /// Capacity of each queue between pipeline stages
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeSection {
    /// Request log to analyze when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SniffSection {
    /// Monitor-mode interface to capture on
    #[serde(default = "default_interface")]
    pub interface: String,
    #[serde(default)]
    pub link_type: LinkType,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SniffSection {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            link_type: LinkType::default(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_interface() -> String {
    "wlan1".to_string()
}

impl Config {
    /// Convert to PipelineConfig
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.pipeline.workers,
            queue_capacity: self.pipeline.queue_capacity,
        }
    }

    /// Convert to SnifferConfig
    pub fn to_sniffer_config(&self) -> SnifferConfig {
        SnifferConfig {
            interface: self.sniff.interface.clone(),
            link_type: self.sniff.link_type,
            queue_capacity: self.sniff.queue_capacity,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
