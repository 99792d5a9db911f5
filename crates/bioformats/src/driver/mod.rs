pub mod java;

use std::path::Path;

use crate::protocol::ProtocolVersion;
use crate::request::ConversionRequest;

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("Failed to initialize driver: {0}")]
    Initialization(String),
    #[error("No input file specified")]
    MissingInput,
    #[error("Failed to start converter: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("converter exited with {}: {output}", describe_status(.status))]
    ToolFailed {
        /// Exit code, `None` when the process was killed by a signal
        status: Option<i32>,
        /// Captured stdout followed by stderr
        output: String,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status".to_string(),
    }
}

/// A backend that turns a source file into a TIFF container and reports
/// the image metadata on stdout.
///
/// The adapter only talks to the converter through this trait, so tests can
/// script it without spawning processes.
pub trait Converter {
    /// Output protocol this converter speaks
    fn protocol(&self) -> ProtocolVersion;

    /// Convert `request` into `output`, returning the captured stdout on success
    fn convert(&self, request: &ConversionRequest, output: &Path) -> Result<String, DriverError>;

    /// Get a human-readable description of this converter
    fn description(&self) -> String;
}
