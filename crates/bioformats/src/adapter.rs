use std::fmt;
use std::path::{Path, PathBuf};

use bioformats_common::{ImageType, Spacing};
use tracing::{debug, info, warn};

use crate::driver::Converter;
use crate::error::Result;
use crate::pipeline::{ChangeInformation, ImageFileReader, ImageStage, Pipeline, PipelineError, Volume};
use crate::protocol;
use crate::request::{ConversionRequest, ConversionResult};
use crate::scratch::ScratchFile;

/// Builder for [`FormatAdapter`]
#[derive(Debug, Clone, Default)]
pub struct AdapterBuilder {
    file_name: Option<PathBuf>,
    channel: u32,
    series: u32,
    time: u32,
    image_type: Option<ImageType>,
    image_type_name: Option<String>,
}

impl AdapterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_name(mut self, file_name: impl Into<PathBuf>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn channel(mut self, channel: u32) -> Self {
        self.channel = channel;
        self
    }

    pub fn series(mut self, series: u32) -> Self {
        self.series = series;
        self
    }

    pub fn time(mut self, time: u32) -> Self {
        self.time = time;
        self
    }

    pub fn image_type(mut self, image_type: ImageType) -> Self {
        self.image_type = Some(image_type);
        self.image_type_name = None;
        self
    }

    /// Image type by name (`"UC3"`, `"US2"`, ...), resolved at build time
    pub fn image_type_name(mut self, name: impl Into<String>) -> Self {
        self.image_type_name = Some(name.into());
        self.image_type = None;
        self
    }

    fn resolve_image_type(&self) -> Result<ImageType> {
        match &self.image_type_name {
            Some(name) => Ok(ImageType::parse(name)?),
            None => Ok(self.image_type.unwrap_or_default()),
        }
    }

    /// Allocate the scratch file, wire the stages and run the first
    /// conversion if a file name was given.
    pub fn build<C: Converter>(self, converter: C) -> Result<FormatAdapter<C>> {
        let image_type = self.resolve_image_type()?;
        let scratch = ScratchFile::new()?;
        let reader = ImageFileReader::new(scratch.path(), image_type);

        let mut adapter = FormatAdapter {
            converter,
            reader,
            change_information: ChangeInformation::new().with_change_spacing(true),
            downstream: Pipeline::new(),
            request: ConversionRequest::new(),
            image_type,
            result: None,
            stale: false,
            scratch,
        };

        // The file name goes last: earlier setters must not convert with a
        // half-configured request.
        adapter.set_channel(self.channel)?;
        adapter.set_series(self.series)?;
        adapter.set_time(self.time)?;
        if let Some(file_name) = self.file_name {
            adapter.set_file_name(file_name)?;
        }

        Ok(adapter)
    }
}

/// Imports a microscopy file through an external converter.
///
/// Every setter re-runs the converter against a private scratch TIFF and
/// applies the reported metadata to the reader and change-information
/// stages. While no file name is set, conversions are skipped.
pub struct FormatAdapter<C: Converter> {
    converter: C,
    reader: ImageFileReader,
    change_information: ChangeInformation,
    downstream: Pipeline,
    request: ConversionRequest,
    image_type: ImageType,
    result: Option<ConversionResult>,
    /// Set when the latest recompute failed; cleared by the next success
    stale: bool,
    scratch: ScratchFile,
}

impl<C: Converter> FormatAdapter<C> {
    /// Adapter with default parameters and no file name
    pub fn new(converter: C) -> Result<Self> {
        AdapterBuilder::new().build(converter)
    }

    pub fn set_file_name(&mut self, file_name: impl Into<PathBuf>) -> Result<()> {
        self.request.file_name = Some(file_name.into());
        self.recompute()
    }

    /// Unset the file name; later setters no longer convert
    pub fn clear_file_name(&mut self) -> Result<()> {
        self.request.file_name = None;
        self.recompute()
    }

    pub fn set_channel(&mut self, channel: u32) -> Result<()> {
        self.request.channel = channel;
        self.recompute()
    }

    pub fn set_series(&mut self, series: u32) -> Result<()> {
        self.request.series = series;
        self.recompute()
    }

    pub fn set_time(&mut self, time: u32) -> Result<()> {
        self.request.time = time;
        self.recompute()
    }

    /// Run the converter for the current request and apply its report.
    ///
    /// Derived state only changes when both the conversion and the parse
    /// succeed. After a failure, `update` refuses to run until a later
    /// recompute succeeds.
    pub fn recompute(&mut self) -> Result<()> {
        if self.request.file_name.is_none() {
            debug!("No file name set, skipping conversion");
            return Ok(());
        }

        match self.convert() {
            Ok(result) => {
                self.apply(result);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Conversion failed, marking pipeline stale");
                // The scratch file may hold a partial write from the failed run
                self.reader.invalidate();
                self.stale = true;
                Err(err)
            }
        }
    }

    fn convert(&self) -> Result<ConversionResult> {
        let stdout = self.converter.convert(&self.request, self.scratch.path())?;
        Ok(protocol::parse_report(self.converter.protocol(), &stdout)?)
    }

    fn apply(&mut self, result: ConversionResult) {
        self.reader.apply(&result);
        self.change_information.apply(&result);
        self.downstream.apply(&result);

        info!(
            spacing = %result.spacing,
            channels = ?result.channels,
            times = ?result.times,
            series = ?result.series,
            "Conversion applied"
        );
        self.result = Some(result);
        self.stale = false;
    }

    pub fn file_name(&self) -> Option<&Path> {
        self.request.source()
    }

    pub fn channel(&self) -> u32 {
        self.request.channel
    }

    pub fn series(&self) -> u32 {
        self.request.series
    }

    pub fn time(&self) -> u32 {
        self.request.time
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn request(&self) -> &ConversionRequest {
        &self.request
    }

    /// Whether a file name is set and setters convert
    pub fn is_configured(&self) -> bool {
        self.request.file_name.is_some()
    }

    /// Whether the latest recompute failed, leaving derived state behind the request
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Report of the last successful conversion
    pub fn last_result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }

    pub fn spacing(&self) -> Option<&Spacing> {
        self.result.as_ref().map(|result| &result.spacing)
    }

    pub fn number_of_channels(&self) -> u32 {
        self.result.as_ref().and_then(|r| r.channels).unwrap_or(0)
    }

    pub fn number_of_series(&self) -> u32 {
        self.result.as_ref().and_then(|r| r.series).unwrap_or(0)
    }

    pub fn number_of_times(&self) -> u32 {
        self.result.as_ref().and_then(|r| r.times).unwrap_or(0)
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn reader(&self) -> &ImageFileReader {
        &self.reader
    }

    pub fn change_information(&self) -> &ChangeInformation {
        &self.change_information
    }

    /// Append a stage after the change-information stage
    pub fn connect<S>(&mut self, stage: S) -> &mut Self
    where
        S: ImageStage + 'static,
    {
        self.downstream.connect(stage);
        self
    }

    /// Names of all stages, reader first
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut names = vec![self.reader.name(), self.change_information.name()];
        names.extend(self.downstream.stage_names());
        names
    }

    /// Read the scratch file and run it through every stage
    pub fn update(&mut self) -> Result<Volume> {
        Ok(self.run_stages()?)
    }

    fn run_stages(&mut self) -> std::result::Result<Volume, PipelineError> {
        if self.result.is_none() {
            return Err(PipelineError::NotReady);
        }
        if self.stale {
            return Err(PipelineError::Stale);
        }
        let volume = self.reader.process(None)?;
        let volume = self.change_information.process(Some(volume))?;
        self.downstream.run(volume)
    }

    /// Multi-line listing of every stored and derived field
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl<C: Converter> fmt::Display for FormatAdapter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file_name() {
            Some(path) => writeln!(f, "FileName: {}", path.display())?,
            None => writeln!(f, "FileName: <unset>")?,
        }
        writeln!(f, "Channel: {}", self.channel())?;
        writeln!(f, "Series: {}", self.series())?;
        writeln!(f, "Time: {}", self.time())?;
        writeln!(f, "ImageType: {}", self.image_type)?;
        match self.spacing() {
            Some(spacing) => writeln!(f, "Spacing: {}", spacing)?,
            None => writeln!(f, "Spacing: []")?,
        }
        writeln!(f, "NumberOfChannels: {}", self.number_of_channels())?;
        writeln!(f, "NumberOfSeries: {}", self.number_of_series())?;
        writeln!(f, "NumberOfTimes: {}", self.number_of_times())?;
        write!(f, "ScratchFile: {}", self.scratch_path().display())
    }
}

impl<C: Converter> fmt::Debug for FormatAdapter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatAdapter")
            .field("converter", &self.converter.description())
            .field("request", &self.request)
            .field("image_type", &self.image_type)
            .field("result", &self.result)
            .field("stale", &self.stale)
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl<C: Converter> ImageStage for FormatAdapter<C> {
    fn name(&self) -> &'static str {
        "FormatAdapter"
    }

    fn process(&mut self, _input: Option<Volume>) -> std::result::Result<Volume, PipelineError> {
        self.run_stages()
    }
}
