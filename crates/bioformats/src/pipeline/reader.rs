use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use bioformats_common::{ImageType, Spacing};
use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use super::{ImageStage, PipelineError, PixelBuffer, Volume};
use crate::request::ConversionResult;

/// Reads a grayscale TIFF into a [`Volume`] of the configured image type.
///
/// Each page becomes one z slice; 2-D image types only read the first page.
/// The decoded volume is cached until the stage is marked stale.
#[derive(Debug)]
pub struct ImageFileReader {
    path: PathBuf,
    image_type: ImageType,
    cached: Option<Volume>,
}

impl ImageFileReader {
    pub fn new(path: impl Into<PathBuf>, image_type: ImageType) -> Self {
        Self {
            path: path.into(),
            image_type,
            cached: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
        self.invalidate();
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    /// Drop the cached volume so the next update re-reads the file
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn is_stale(&self) -> bool {
        self.cached.is_none()
    }

    /// Decode the file, bypassing the cache
    pub fn read(&self) -> Result<Volume, PipelineError> {
        let file = File::open(&self.path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;

        let (width, height) = decoder.dimensions()?;
        let max_pages = if self.image_type.dimension() == 2 { 1 } else { u32::MAX };

        let mut pixels = PixelBuffer::empty(self.image_type.pixel_kind());
        let mut depth = 0u32;

        loop {
            let color_type = decoder.colortype()?;
            if !matches!(color_type, tiff::ColorType::Gray(_)) {
                return Err(PipelineError::UnsupportedColorType(format!("{:?}", color_type)));
            }

            let page_dimensions = decoder.dimensions()?;
            if page_dimensions != (width, height) {
                return Err(PipelineError::InconsistentPages {
                    page: depth,
                    expected: (width, height),
                    found: page_dimensions,
                });
            }

            append_page(&mut pixels, decoder.read_image()?)?;
            depth += 1;

            if depth >= max_pages || !decoder.more_images() {
                break;
            }
            decoder.next_image()?;
        }

        debug!(path = %self.path.display(), width, height, depth, "Read image");

        let spacing = Spacing::uniform(self.image_type.dimension(), 1.0);
        Volume::new(width, height, depth, self.image_type, spacing, pixels)
    }
}

fn append_page(pixels: &mut PixelBuffer, page: DecodingResult) -> Result<(), PipelineError> {
    match page {
        DecodingResult::U8(data) => pixels.extend_cast(data.into_iter().map(f64::from)),
        DecodingResult::U16(data) => pixels.extend_cast(data.into_iter().map(f64::from)),
        DecodingResult::U32(data) => pixels.extend_cast(data.into_iter().map(f64::from)),
        DecodingResult::I8(data) => pixels.extend_cast(data.into_iter().map(f64::from)),
        DecodingResult::I16(data) => pixels.extend_cast(data.into_iter().map(f64::from)),
        DecodingResult::I32(data) => pixels.extend_cast(data.into_iter().map(f64::from)),
        DecodingResult::F32(data) => pixels.extend_cast(data.into_iter().map(f64::from)),
        DecodingResult::F64(data) => pixels.extend_cast(data),
        _ => return Err(PipelineError::UnsupportedSampleFormat),
    }
    Ok(())
}

impl ImageStage for ImageFileReader {
    fn name(&self) -> &'static str {
        "ImageFileReader"
    }

    fn apply(&mut self, _result: &ConversionResult) {
        // The converter rewrote the file in place
        self.invalidate();
    }

    fn process(&mut self, _input: Option<Volume>) -> Result<Volume, PipelineError> {
        if let Some(volume) = &self.cached {
            return Ok(volume.clone());
        }
        let volume = self.read()?;
        self.cached = Some(volume.clone());
        Ok(volume)
    }
}
