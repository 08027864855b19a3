//! TOML configuration.
//!
//! Every section has defaults matching the layout of the MMCoQA release
//! (`./data/MMCoQA_dev.txt` plus the MMQA evidence corpora), so a missing
//! config file falls back to [`Config::minimal`].

use anyhow::{Context, Result};
use mmcoqa_core::lookup::{DuplicatePolicy, IndexOptions};
use mmcoqa_core::table::RaggedRows;
use mmcoqa_core::Strictness;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub loading: LoadingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Input corpora and the image directory.
#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_questions")]
    pub questions: PathBuf,
    #[serde(default = "default_images")]
    pub images: PathBuf,
    #[serde(default = "default_tables")]
    pub tables: PathBuf,
    #[serde(default = "default_texts")]
    pub texts: PathBuf,
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            images: default_images(),
            tables: default_tables(),
            texts: default_texts(),
            image_dir: default_image_dir(),
        }
    }
}

const MMQA_PREFIX: &str = "./data/multimodalqa_final_dataset_pipeline_camera_ready_MMQA";

fn default_questions() -> PathBuf {
    PathBuf::from("./data/MMCoQA_dev.txt")
}
fn default_images() -> PathBuf {
    PathBuf::from(format!("{}_images.jsonl", MMQA_PREFIX))
}
fn default_tables() -> PathBuf {
    PathBuf::from(format!("{}_tables.jsonl", MMQA_PREFIX))
}
fn default_texts() -> PathBuf {
    PathBuf::from(format!("{}_texts.jsonl", MMQA_PREFIX))
}
fn default_image_dir() -> PathBuf {
    PathBuf::from("./data/final_dataset_images")
}

/// Policies for defects found while loading.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct LoadingConfig {
    /// Malformed lines, evidence records without ids, and unusable qids.
    #[serde(default)]
    pub mode: Strictness,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    #[serde(default)]
    pub ragged_tables: RaggedRows,
}

impl LoadingConfig {
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            missing_id: self.mode,
            duplicates: self.duplicates,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    "clip-vit-b-32".to_string()
}

/// CLIP model names accepted by `scoring.model`.
pub const KNOWN_MODELS: &[&str] = &["clip-vit-b-32"];

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if !KNOWN_MODELS.contains(&config.scoring.model.as_str()) {
        anyhow::bail!(
            "Unknown scoring model: '{}'. Must be one of: {}",
            config.scoring.model,
            KNOWN_MODELS.join(", ")
        );
    }

    Ok(())
}
