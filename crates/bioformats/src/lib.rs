//! # Bio-Formats import adapter
//!
//! Reads microscopy formats (LSM, LIF, CZI, ND2, ...) by running the
//! Bio-Formats `SimpleImageConverter` as an external Java process. The
//! converter writes the selected channel, series and time point to a scratch
//! TIFF and reports voxel spacing (and, with the extended protocol, the
//! channel, time and series counts) on stdout.
//!
//! [`FormatAdapter`] owns the scratch file and re-runs the converter each
//! time a parameter changes; the reported metadata is pushed into the
//! reader and change-information stages, and [`FormatAdapter::update`]
//! yields the spatially-calibrated [`Volume`].
//!
//! ```rust,no_run
//! use bioformats::{AdapterBuilder, AdapterConfig};
//!
//! let config = AdapterConfig::default();
//! let mut adapter = AdapterBuilder::new()
//!     .file_name("embryo.lsm")
//!     .channel(1)
//!     .image_type(config.resolve_image_type()?)
//!     .build(config.converter()?)?;
//!
//! println!("{}", adapter.summary());
//! let volume = adapter.update()?;
//! volume.save_tiff("embryo_c1.tif".as_ref())?;
//! # Ok::<(), bioformats::BioformatsError>(())
//! ```

pub mod adapter;
pub mod config;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod request;
pub mod scratch;

pub use adapter::{AdapterBuilder, FormatAdapter};
pub use config::AdapterConfig;
pub use driver::java::JavaConverter;
pub use driver::{Converter, DriverError};
pub use error::{BioformatsError, Result};
pub use pipeline::{ChangeInformation, ImageFileReader, ImageStage, Pipeline, PipelineError, Volume};
pub use protocol::{parse_report, ParseError, ProtocolVersion};
pub use request::{ConversionRequest, ConversionResult};
pub use scratch::ScratchFile;

pub use bioformats_common::{ImageType, PixelKind, Spacing};
