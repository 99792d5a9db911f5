use std::fs::File;
use std::path::Path;

use bioformats_common::{ImageType, PixelKind, Spacing};
use image::{GrayImage, Luma};
use tiff::encoder::{colortype, TiffEncoder};

use super::PipelineError;

/// Typed voxel storage, x fastest, then y, then z
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl PixelBuffer {
    pub fn empty(kind: PixelKind) -> Self {
        match kind {
            PixelKind::U8 => Self::U8(Vec::new()),
            PixelKind::U16 => Self::U16(Vec::new()),
            PixelKind::F32 => Self::F32(Vec::new()),
        }
    }

    pub fn kind(&self) -> PixelKind {
        match self {
            Self::U8(_) => PixelKind::U8,
            Self::U16(_) => PixelKind::U16,
            Self::F32(_) => PixelKind::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(data) => data.len(),
            Self::U16(data) => data.len(),
            Self::F32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            Self::U8(data) => data.get(index).map(|&v| f64::from(v)),
            Self::U16(data) => data.get(index).map(|&v| f64::from(v)),
            Self::F32(data) => data.get(index).map(|&v| f64::from(v)),
        }
    }

    /// Append samples, casting to this buffer's pixel kind.
    /// Integer casts saturate, NaN becomes 0.
    pub fn extend_cast<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = f64>,
    {
        let samples = samples.into_iter();
        match self {
            Self::U8(data) => data.extend(samples.map(|s| s as u8)),
            Self::U16(data) => data.extend(samples.map(|s| s as u16)),
            Self::F32(data) => data.extend(samples.map(|s| s as f32)),
        }
    }

    fn min_max(&self) -> Option<(f64, f64)> {
        (0..self.len())
            .filter_map(|i| self.get(i))
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Image volume flowing through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    width: u32,
    height: u32,
    depth: u32,
    image_type: ImageType,
    spacing: Spacing,
    pixels: PixelBuffer,
}

impl Volume {
    pub fn new(
        width: u32,
        height: u32,
        depth: u32,
        image_type: ImageType,
        spacing: Spacing,
        pixels: PixelBuffer,
    ) -> Result<Self, PipelineError> {
        if pixels.kind() != image_type.pixel_kind() {
            return Err(PipelineError::PixelKindMismatch {
                image_type,
                expected: image_type.pixel_kind(),
                found: pixels.kind(),
            });
        }

        let expected = width as usize * height as usize * depth as usize;
        if pixels.len() != expected {
            return Err(PipelineError::BufferMismatch {
                len: pixels.len(),
                width,
                height,
                depth,
            });
        }

        // Spacing always carries exactly one value per image axis
        let spacing = spacing.overlay(&Spacing::uniform(image_type.dimension(), 1.0));

        Ok(Self {
            width,
            height,
            depth,
            image_type,
            spacing,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of z slices, 1 for 2-D image types
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn spacing(&self) -> &Spacing {
        &self.spacing
    }

    /// Replace spacing axis by axis; axes `spacing` doesn't cover are kept
    pub fn set_spacing(&mut self, spacing: &Spacing) {
        self.spacing = spacing.overlay(&self.spacing);
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn voxel(&self, x: u32, y: u32, z: u32) -> Option<f64> {
        if x >= self.width || y >= self.height || z >= self.depth {
            return None;
        }
        self.pixels.get(self.index(x, y, z))
    }

    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let plane = self.width as usize * self.height as usize;
        z as usize * plane + y as usize * self.width as usize + x as usize
    }

    /// One z slice as an 8-bit image, stretched between the volume's
    /// minimum and maximum values.
    pub fn slice_as_gray_image(&self, z: u32) -> Option<GrayImage> {
        if z >= self.depth {
            return None;
        }

        let (lo, hi) = self.pixels.min_max().unwrap_or((0.0, 0.0));
        let range = if hi > lo { hi - lo } else { 1.0 };

        let image = GrayImage::from_fn(self.width, self.height, |x, y| {
            let value = self.voxel(x, y, z).unwrap_or(lo);
            Luma([(((value - lo) / range) * 255.0).round() as u8])
        });
        Some(image)
    }

    /// Write the middle slice as a preview image (format from the extension)
    pub fn save_preview(&self, path: &Path) -> Result<(), PipelineError> {
        let z = self.depth / 2;
        let image = self
            .slice_as_gray_image(z)
            .ok_or(PipelineError::SliceOutOfRange { z, depth: self.depth })?;
        image.save(path)?;
        Ok(())
    }

    /// Write every z slice as one page of a grayscale TIFF
    pub fn save_tiff(&self, path: &Path) -> Result<(), PipelineError> {
        let file = File::create(path)?;
        let mut encoder = TiffEncoder::new(file)?;

        let plane = self.width as usize * self.height as usize;
        for z in 0..self.depth as usize {
            let range = z * plane..(z + 1) * plane;
            match &self.pixels {
                PixelBuffer::U8(data) => {
                    encoder.write_image::<colortype::Gray8>(self.width, self.height, &data[range])?
                }
                PixelBuffer::U16(data) => {
                    encoder.write_image::<colortype::Gray16>(self.width, self.height, &data[range])?
                }
                PixelBuffer::F32(data) => {
                    encoder.write_image::<colortype::Gray32Float>(self.width, self.height, &data[range])?
                }
            }
        }

        Ok(())
    }
}
