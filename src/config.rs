//! Configuration for a pipeline run.

use crate::error::ComputeError;
use crate::types::{Gender, Metric, SheetKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Highest gzip compression level
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Workbook sheet names for each of the four sheets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub male_activity: String,
    pub female_activity: String,
    pub male_temp: String,
    pub female_temp: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            male_activity: "Male Act".to_string(),
            female_activity: "Fem Act".to_string(),
            male_temp: "Male Temp".to_string(),
            female_temp: "Fem Temp".to_string(),
        }
    }
}

impl SheetNames {
    /// Sheet name for a sheet kind
    pub fn name_for(&self, kind: SheetKind) -> &str {
        match (kind.gender, kind.metric) {
            (Gender::Male, Metric::Activity) => &self.male_activity,
            (Gender::Female, Metric::Activity) => &self.female_activity,
            (Gender::Male, Metric::Temp) => &self.male_temp,
            (Gender::Female, Metric::Temp) => &self.female_temp,
        }
    }
}

/// Main configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Workbook to read
    pub input: PathBuf,

    /// Gzip-compressed JSON file to write
    pub output: PathBuf,

    pub sheets: SheetNames,

    /// Gzip level, 0 (none) to 9 (best)
    pub compression_level: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("Mouse_Data_Student_Copy.xlsx"),
            output: PathBuf::from("processed_data.json.gz"),
            sheets: SheetNames::default(),
            compression_level: 6,
        }
    }
}

impl PipelineConfig {
    /// Load configuration overrides from a JSON file.
    ///
    /// Fields missing from the file keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ComputeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|e| ComputeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a run
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(ComputeError::Config(format!(
                "compression level {} is above {MAX_COMPRESSION_LEVEL}",
                self.compression_level
            )));
        }

        for kind in SheetKind::ALL {
            if self.sheets.name_for(kind).trim().is_empty() {
                return Err(ComputeError::Config(format!("empty sheet name for {kind}")));
            }
        }

        Ok(())
    }
}
