use crate::RenderOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// How forest aggregation treats rows whose group value is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum MissingGroups {
    /// Drop rows with a missing group value
    #[serde(rename = "exclude")]
    #[default]
    Exclude,
    /// Collect them into their own "(missing)" partition
    #[serde(rename = "partition")]
    Partition,
}

/// Dashboard configuration, normally read from a JSON file
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub render: RenderOptions,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub forest_plot: bool,
    #[serde(default = "default_bins")]
    pub histogram_bins: usize,
    #[serde(default)]
    pub missing_groups: MissingGroups,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(default = "default_seed")]
    pub sample_seed: u64,
}

fn default_fetch_timeout() -> u64 { 30 }
fn default_true() -> bool { true }
fn default_bins() -> usize { 30 }
fn default_preview_rows() -> usize { 10 }
fn default_seed() -> u64 { 42 }

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            fetch_timeout_secs: default_fetch_timeout(),
            forest_plot: true,
            histogram_bins: default_bins(),
            missing_groups: MissingGroups::Exclude,
            preview_rows: default_preview_rows(),
            sample_seed: default_seed(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: DashboardConfig =
            serde_json::from_str(text).context("Invalid dashboard configuration")?;
        if config.histogram_bins == 0 {
            anyhow::bail!("histogram_bins must be at least 1");
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities { forest_plot: self.forest_plot }
    }
}

/// Rendering capabilities, resolved once at startup and fixed afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub forest_plot: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self { forest_plot: true }
    }
}
