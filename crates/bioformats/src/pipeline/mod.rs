pub mod change_information;
pub mod reader;
pub mod volume;

pub use change_information::ChangeInformation;
pub use reader::ImageFileReader;
pub use volume::{PixelBuffer, Volume};

use bioformats_common::{ImageType, PixelKind};
use thiserror::Error;

use crate::request::ConversionResult;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No conversion has completed yet")]
    NotReady,

    #[error("Last conversion failed; no volume matches the current request")]
    Stale,

    #[error("Pipeline has no stages")]
    EmptyPipeline,

    #[error("Stage '{0}' needs an input image")]
    MissingInput(&'static str),

    #[error("Unsupported color type {0}: only grayscale images can be read")]
    UnsupportedColorType(String),

    #[error("Unsupported sample format")]
    UnsupportedSampleFormat,

    #[error("Page {page} is {found:?}, expected {expected:?}")]
    InconsistentPages {
        page: u32,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("{found} pixels cannot back a {image_type} volume (expected {expected})")]
    PixelKindMismatch {
        image_type: ImageType,
        expected: PixelKind,
        found: PixelKind,
    },

    #[error("Volume has no slice {z} (depth {depth})")]
    SliceOutOfRange { z: u32, depth: u32 },

    #[error("Buffer of {len} pixels does not fit a {width}x{height}x{depth} volume")]
    BufferMismatch {
        len: usize,
        width: u32,
        height: u32,
        depth: u32,
    },
}

/// One step of an image pipeline
pub trait ImageStage {
    fn name(&self) -> &'static str;

    /// Receive the metadata of a fresh conversion
    fn apply(&mut self, _result: &ConversionResult) {}

    /// Produce this stage's output from the previous stage's output.
    /// Source stages receive `None`.
    fn process(&mut self, input: Option<Volume>) -> Result<Volume, PipelineError>;
}

/// Ordered chain of stages, each feeding the next
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn ImageStage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage at the end of the pipeline
    pub fn connect<S>(&mut self, stage: S) -> &mut Self
    where
        S: ImageStage + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn with_stage<S>(mut self, stage: S) -> Self
    where
        S: ImageStage + 'static,
    {
        self.connect(stage);
        self
    }

    /// Forward a conversion result to every stage, in order
    pub fn apply(&mut self, result: &ConversionResult) {
        for stage in &mut self.stages {
            stage.apply(result);
        }
    }

    /// Run the whole pipeline; the first stage is the source
    pub fn update(&mut self) -> Result<Volume, PipelineError> {
        let (first, rest) = self
            .stages
            .split_first_mut()
            .ok_or(PipelineError::EmptyPipeline)?;

        let mut volume = first.process(None)?;
        for stage in rest {
            volume = stage.process(Some(volume))?;
        }
        Ok(volume)
    }

    /// Feed `input` through every stage; an empty pipeline returns it unchanged
    pub fn run(&mut self, input: Volume) -> Result<Volume, PipelineError> {
        let mut volume = input;
        for stage in &mut self.stages {
            volume = stage.process(Some(volume))?;
        }
        Ok(volume)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        if self.stages.is_empty() {
            return "Pipeline: no stages".to_string();
        }
        format!("Pipeline: {}", self.stage_names().join(" -> "))
    }
}
