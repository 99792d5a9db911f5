use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportJobError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Job has no entries")]
    NoEntries,
    #[error("Duplicate entry name '{0}'")]
    DuplicateName(String),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One image to import: a source file and the plane selection
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct JobEntry {
    /// Output stem, written as `<output_dir>/<name>.tif`
    pub name: String,
    pub description: Option<String>,
    pub path: PathBuf,
    #[serde(default)]
    pub channel: u32,
    #[serde(default)]
    pub series: u32,
    #[serde(default)]
    pub time: u32,
}

/// Batch import configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ImportJob {
    pub output_dir: PathBuf,
    /// Overrides the configured image type for every entry
    pub image_type: Option<String>,
    pub entries: Vec<JobEntry>,
}

impl ImportJob {
    /// Load ImportJob configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ImportJobError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load ImportJob configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ImportJobError> {
        let job: ImportJob = toml::from_str(content)?;
        job.validate()?;
        Ok(job)
    }

    /// Load ImportJob configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ImportJobError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load ImportJob configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, ImportJobError> {
        let job: ImportJob = serde_json::from_str(content)?;
        job.validate()?;
        Ok(job)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ImportJobError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ImportJobError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, ImportJobError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json(&self) -> Result<String, ImportJobError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Entries must exist and have distinct names, since names become file names
    pub fn validate(&self) -> Result<(), ImportJobError> {
        if self.entries.is_empty() {
            return Err(ImportJobError::NoEntries);
        }
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(ImportJobError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(())
    }

    pub fn output_path(&self, entry: &JobEntry) -> PathBuf {
        self.output_dir.join(format!("{}.tif", entry.name))
    }

    /// JSON schema of the job file
    pub fn json_schema() -> Result<String, ImportJobError> {
        let schema = schemars::schema_for!(ImportJob);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}
