use crate::filter::{DEFAULT_SKIP_THRESHOLD_SECONDS, SkipThreshold};
use crate::loader::DEFAULT_FILE_PREFIX;
use crate::stats::{self, DEFAULT_BUCKET_DAYS, DEFAULT_TOP_N};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tune-history";
const SETTINGS_FILE: &str = "config.json";
const CONFIG_DIR_ENV: &str = "TUNE_HISTORY_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_skip_threshold_seconds")]
    pub skip_threshold_seconds: u64,
    #[serde(default = "default_bucket_days")]
    pub bucket_days: i64,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    String::from(DEFAULT_FILE_PREFIX)
}

fn default_skip_threshold_seconds() -> u64 {
    DEFAULT_SKIP_THRESHOLD_SECONDS
}

fn default_bucket_days() -> i64 {
    DEFAULT_BUCKET_DAYS
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_prefix: default_file_prefix(),
            skip_threshold_seconds: default_skip_threshold_seconds(),
            bucket_days: default_bucket_days(),
            top_n: default_top_n(),
        }
    }
}

impl AnalysisSettings {
    pub fn skip_threshold(&self) -> SkipThreshold {
        SkipThreshold::from_seconds(self.skip_threshold_seconds)
    }

    pub fn bucket_interval(&self) -> crate::Result<time::Duration> {
        stats::interval_from_days(self.bucket_days)
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn load_settings() -> Result<AnalysisSettings> {
    let path = settings_path()?;
    load_settings_from_path(&path)
}

fn load_settings_from_path(path: &Path) -> Result<AnalysisSettings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(AnalysisSettings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: AnalysisSettings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}
