// src/config.rs

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Env var naming an optional YAML config file.
pub const CONFIG_ENV: &str = "EVPIPELINE_CONFIG";
pub const RAW_DIR_ENV: &str = "EVPIPELINE_RAW_DIR";
pub const OUT_DIR_ENV: &str = "EVPIPELINE_OUT_DIR";
pub const CURRENT_YEAR_ENV: &str = "EVPIPELINE_CURRENT_YEAR";

/// Names of the four output tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub vehicles: String,
    pub approvals: String,
    pub validation_results: String,
    pub validated: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            vehicles: "TRANSFORMED_EV_DATA".into(),
            approvals: "TRANSFORMED_APPROVALS_DATA".into(),
            validation_results: "VALIDATION_RESULTS".into(),
            validated: "VALIDATED_EV_DATA".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory of raw `*.json` documents.
    pub raw_dir: PathBuf,
    /// Directory the output tables are committed to.
    pub output_dir: PathBuf,
    /// Upper bound for model_year checks; this UTC year when unset.
    pub current_year: Option<i32>,
    pub tables: TableNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("raw"),
            output_dir: PathBuf::from("tables"),
            current_year: None,
            tables: TableNames::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).context("parsing pipeline config")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Defaults, then the YAML file named by `EVPIPELINE_CONFIG`, then the
    /// individual env overrides.
    pub fn load() -> Result<Self> {
        let base = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup(RAW_DIR_ENV) {
            self.raw_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(OUT_DIR_ENV) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(year) = lookup(CURRENT_YEAR_ENV) {
            let year = year
                .trim()
                .parse::<i32>()
                .with_context(|| format!("{} must be a year, got {:?}", CURRENT_YEAR_ENV, year))?;
            self.current_year = Some(year);
        }
        Ok(self)
    }

    pub fn current_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| Utc::now().year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn yaml_fills_missing_fields_with_defaults() -> Result<()> {
        let cfg = PipelineConfig::from_yaml_str(
            "raw_dir: /data/raw\ntables:\n  validated: GOOD_EVS\n",
        )?;
        assert_eq!(cfg.raw_dir, PathBuf::from("/data/raw"));
        assert_eq!(cfg.output_dir, PathBuf::from("tables"));
        assert_eq!(cfg.tables.validated, "GOOD_EVS");
        assert_eq!(cfg.tables.vehicles, "TRANSFORMED_EV_DATA");
        Ok(())
    }

    #[test]
    fn env_overrides_win() -> Result<()> {
        let vars: HashMap<&str, &str> =
            [(OUT_DIR_ENV, "/tmp/out"), (CURRENT_YEAR_ENV, "2024")].into();
        let cfg = PipelineConfig::default().with_overrides(|k| vars.get(k).map(|v| v.to_string()))?;
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.current_year(), 2024);
        Ok(())
    }

    #[test]
    fn bad_year_is_rejected() {
        let res = PipelineConfig::default().with_overrides(|k| {
            (k == CURRENT_YEAR_ENV).then(|| "next year".to_string())
        });
        assert!(res.is_err());
    }
}
