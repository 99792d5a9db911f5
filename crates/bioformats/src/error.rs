use thiserror::Error;

use crate::driver::DriverError;
use crate::pipeline::PipelineError;
use crate::protocol::ParseError;

#[derive(Error, Debug)]
pub enum BioformatsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] DriverError),

    #[error("Unexpected converter output: {0}")]
    Parse(#[from] ParseError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl From<bioformats_common::CommonError> for BioformatsError {
    fn from(err: bioformats_common::CommonError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BioformatsError>;
