use bioformats_common::Spacing;

use super::{ImageStage, PipelineError, Volume};
use crate::request::ConversionResult;

/// Overrides metadata of the volume passing through it
#[derive(Debug, Clone, Default)]
pub struct ChangeInformation {
    change_spacing: bool,
    output_spacing: Option<Spacing>,
}

impl ChangeInformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_change_spacing(mut self, change_spacing: bool) -> Self {
        self.change_spacing = change_spacing;
        self
    }

    pub fn change_spacing(&self) -> bool {
        self.change_spacing
    }

    pub fn set_change_spacing(&mut self, change_spacing: bool) {
        self.change_spacing = change_spacing;
    }

    pub fn output_spacing(&self) -> Option<&Spacing> {
        self.output_spacing.as_ref()
    }

    pub fn set_output_spacing(&mut self, spacing: Spacing) {
        self.output_spacing = Some(spacing);
    }
}

impl ImageStage for ChangeInformation {
    fn name(&self) -> &'static str {
        "ChangeInformation"
    }

    fn apply(&mut self, result: &ConversionResult) {
        self.set_output_spacing(result.spacing.clone());
    }

    fn process(&mut self, input: Option<Volume>) -> Result<Volume, PipelineError> {
        let mut volume = input.ok_or(PipelineError::MissingInput(self.name()))?;
        if self.change_spacing {
            if let Some(spacing) = &self.output_spacing {
                volume.set_spacing(spacing);
            }
        }
        Ok(volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PixelBuffer;
    use bioformats_common::ImageType;

    fn volume() -> Volume {
        Volume::new(
            2,
            2,
            1,
            ImageType::Uc3,
            Spacing::uniform(3, 1.0),
            PixelBuffer::U8(vec![1, 2, 3, 4]),
        )
        .unwrap()
    }

    #[test]
    fn test_spacing_override() {
        let mut stage = ChangeInformation::new().with_change_spacing(true);
        stage.apply(&ConversionResult::spacing_only(
            Spacing::new(vec![0.5, 0.5, 2.0]).unwrap(),
        ));
        assert_eq!(stage.output_spacing().unwrap().as_slice(), &[0.5, 0.5, 2.0]);

        let output = stage.process(Some(volume())).unwrap();
        assert_eq!(output.spacing().as_slice(), &[0.5, 0.5, 2.0]);
        assert_eq!(output.voxel(1, 1, 0), Some(4.0));
    }

    #[test]
    fn test_short_spacing_keeps_remaining_axes() {
        let mut stage = ChangeInformation::new().with_change_spacing(true);
        stage.set_output_spacing(Spacing::new(vec![0.2, 0.3]).unwrap());
        let output = stage.process(Some(volume())).unwrap();
        assert_eq!(output.spacing().as_slice(), &[0.2, 0.3, 1.0]);
    }

    #[test]
    fn test_disabled_stage_passes_through() {
        let mut stage = ChangeInformation::new();
        stage.set_output_spacing(Spacing::uniform(3, 9.0));
        let output = stage.process(Some(volume())).unwrap();
        assert_eq!(output.spacing().as_slice(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_requires_input() {
        let mut stage = ChangeInformation::new();
        assert!(matches!(
            stage.process(None),
            Err(PipelineError::MissingInput("ChangeInformation"))
        ));
    }
}
