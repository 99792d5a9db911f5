use std::path::{Path, PathBuf};

use bioformats_common::Spacing;
use serde::{Deserialize, Serialize};

/// Parameters of one conversion run.
///
/// `file_name` is `None` until a source is set; conversions are skipped
/// while it is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub file_name: Option<PathBuf>,
    pub channel: u32,
    pub series: u32,
    pub time: u32,
}

impl ConversionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_name(mut self, file_name: impl Into<PathBuf>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_series(mut self, series: u32) -> Self {
        self.series = series;
        self
    }

    pub fn with_time(mut self, time: u32) -> Self {
        self.time = time;
        self
    }

    /// Source path, if one has been set
    pub fn source(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }
}

/// Metadata reported by the converter for one request.
///
/// Counts are `None` when the converter speaks the basic protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub spacing: Spacing,
    pub channels: Option<u32>,
    pub times: Option<u32>,
    pub series: Option<u32>,
}

impl ConversionResult {
    pub fn spacing_only(spacing: Spacing) -> Self {
        Self {
            spacing,
            channels: None,
            times: None,
            series: None,
        }
    }
}
