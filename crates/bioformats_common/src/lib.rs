//! # Bio-Formats Common - Shared Types and Utilities
//!
//! Value types shared by the Bio-Formats import adapter and its command line
//! front end: the target image type, its pixel representation, and physical
//! voxel spacing.
//!
//! ## Example
//!
//! ```rust
//! use bioformats_common::{ImageType, PixelKind, Spacing};
//!
//! let image_type: ImageType = "us3".parse().unwrap();
//! assert_eq!(image_type.pixel_kind(), PixelKind::U16);
//! assert_eq!(image_type.dimension(), 3);
//!
//! let spacing = Spacing::new(vec![0.5, 0.5, 2.0]).unwrap();
//! println!("Spacing: {}", spacing);
//! ```

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use thiserror::Error;

/// Result type for shared value operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while validating shared value types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommonError {
    #[error("Unknown image type '{name}' (expected one of: {})", ImageType::VARIANTS.join(", "))]
    UnknownImageType { name: String },

    #[error("Spacing must have at least one axis")]
    EmptySpacing,

    #[error("Invalid spacing value {value} on axis {axis}: must be finite and positive")]
    InvalidSpacing { axis: usize, value: f64 },
}

/// Pixel representation of an image buffer
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PixelKind {
    U8,
    U16,
    F32,
}

impl PixelKind {
    /// Bits per sample
    pub fn bits(&self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::F32 => 32,
        }
    }
}

/// Target image type, named after ITK's short wrapping names
/// (pixel type abbreviation followed by the dimension).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ImageType {
    /// 8-bit unsigned, 2-D
    Uc2,
    /// 8-bit unsigned, 3-D
    #[default]
    Uc3,
    /// 16-bit unsigned, 2-D
    Us2,
    /// 16-bit unsigned, 3-D
    Us3,
    /// 32-bit float, 2-D
    F2,
    /// 32-bit float, 3-D
    F3,
}

impl ImageType {
    /// Parse an image type name, mapping failures to [`CommonError::UnknownImageType`]
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name.trim()).map_err(|_| CommonError::UnknownImageType {
            name: name.to_string(),
        })
    }

    pub fn pixel_kind(&self) -> PixelKind {
        match self {
            Self::Uc2 | Self::Uc3 => PixelKind::U8,
            Self::Us2 | Self::Us3 => PixelKind::U16,
            Self::F2 | Self::F3 => PixelKind::F32,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Self::Uc2 | Self::Us2 | Self::F2 => 2,
            Self::Uc3 | Self::Us3 | Self::F3 => 3,
        }
    }

    /// All valid image type names
    pub fn names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }
}

/// Physical distance between adjacent voxels, one value per axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Spacing(Vec<f64>);

impl Spacing {
    /// Create a validated spacing
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(CommonError::EmptySpacing);
        }
        for (axis, &value) in values.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(CommonError::InvalidSpacing { axis, value });
            }
        }
        Ok(Self(values))
    }

    /// Same spacing on every axis
    pub fn uniform(dimension: usize, value: f64) -> Self {
        Self(vec![value; dimension.max(1)])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn axis(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    /// Overlay `self` onto `base`: the first `base.len()` values of `self`
    /// replace those of `base`, axes `self` doesn't cover keep their value.
    pub fn overlay(&self, base: &Spacing) -> Spacing {
        let values = base
            .0
            .iter()
            .enumerate()
            .map(|(i, &b)| self.axis(i).unwrap_or(b))
            .collect();
        Spacing(values)
    }
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str("]")
    }
}

/// Small file helpers shared by the library and the CLI
pub mod utils {
    use std::path::Path;

    /// Format file size in human-readable format
    pub fn format_file_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

        if bytes == 0 {
            return "0 B".to_string();
        }

        let base = 1024_f64;
        let exp = (bytes as f64).log(base).floor() as usize;
        let exp = exp.min(UNITS.len() - 1);

        let size = bytes as f64 / base.powi(exp as i32);
        format!("{:.1} {}", size, UNITS[exp])
    }

    /// Get the lowercased file extension
    pub fn get_file_extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a path names a TIFF container
    pub fn is_tiff_file(path: &Path) -> bool {
        matches!(get_file_extension(path).as_deref(), Some("tif" | "tiff"))
    }

    /// Ensure output directory exists
    pub fn ensure_output_dir(path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }
}
