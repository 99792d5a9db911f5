//! Text protocol spoken by the converter on stdout.
//!
//! Basic: one line of tab-separated spacing values.
//! Extended: spacing line, then channel count, time count and series count,
//! one per line.

use bioformats_common::{CommonError, Spacing};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use thiserror::Error;
use tracing::{debug, warn};

use crate::request::ConversionResult;

/// Most axes a spacing line may carry (x, y, z, t)
pub const MAX_SPACING_AXES: usize = 4;

/// Placeholder the converter prints when a physical size is missing
const MISSING_VALUE: &str = "null";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("missing {field} line")]
    MissingLine { field: &'static str },

    #[error("invalid {field} value '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("spacing line has {count} values, at most {} are supported", MAX_SPACING_AXES)]
    TooManyAxes { count: usize },

    #[error("invalid spacing: {0}")]
    Spacing(#[from] CommonError),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProtocolVersion {
    /// Spacing only; the converter takes no `-time` flag
    Basic,
    /// Spacing plus channel, time and series counts.
    ///
    /// Passes `-time` to the converter, so it needs a `SimpleImageConverter`
    /// build that accepts that flag. Older builds print "Ignoring unknown
    /// command flag" and then read the time value as the input path; use
    /// [`ProtocolVersion::Basic`] with those.
    #[default]
    Extended,
}

impl ProtocolVersion {
    /// Whether the converter accepts a `-time` argument
    pub fn supports_time(&self) -> bool {
        matches!(self, Self::Extended)
    }
}

/// Parse converter stdout into a [`ConversionResult`].
///
/// Blank lines and surrounding whitespace are ignored.
pub fn parse_report(version: ProtocolVersion, stdout: &str) -> Result<ConversionResult, ParseError> {
    let mut lines = stdout.lines().map(str::trim).filter(|line| !line.is_empty());

    let spacing_line = lines
        .next()
        .ok_or(ParseError::MissingLine { field: "spacing" })?;
    let spacing = parse_spacing(spacing_line)?;

    let result = match version {
        ProtocolVersion::Basic => ConversionResult::spacing_only(spacing),
        ProtocolVersion::Extended => {
            let channels = parse_count(lines.next(), "channel count")?;
            let times = parse_count(lines.next(), "time count")?;
            let series = parse_count(lines.next(), "series count")?;
            ConversionResult {
                spacing,
                channels: Some(channels),
                times: Some(times),
                series: Some(series),
            }
        }
    };

    let trailing = lines.count();
    if trailing > 0 {
        debug!(trailing, "Ignoring extra converter output lines");
    }

    Ok(result)
}

fn parse_spacing(line: &str) -> Result<Spacing, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() > MAX_SPACING_AXES {
        return Err(ParseError::TooManyAxes { count: fields.len() });
    }

    let mut values = Vec::with_capacity(fields.len());
    for (axis, field) in fields.into_iter().enumerate() {
        if field.eq_ignore_ascii_case(MISSING_VALUE) {
            warn!(axis, "Converter reported no physical size, using 1.0");
            values.push(1.0);
            continue;
        }
        let value: f64 = field.parse().map_err(|_| ParseError::InvalidNumber {
            field: "spacing",
            value: field.to_string(),
        })?;
        values.push(value);
    }

    Ok(Spacing::new(values)?)
}

fn parse_count(line: Option<&str>, field: &'static str) -> Result<u32, ParseError> {
    let line = line.ok_or(ParseError::MissingLine { field })?;
    line.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_report() {
        let result = parse_report(ProtocolVersion::Extended, "1.0\t1.0\t2.0\n3\n5\n2\n").unwrap();
        assert_eq!(result.spacing.as_slice(), &[1.0, 1.0, 2.0]);
        assert_eq!(result.channels, Some(3));
        assert_eq!(result.times, Some(5));
        assert_eq!(result.series, Some(2));
    }

    #[test]
    fn test_basic_report() {
        let result = parse_report(ProtocolVersion::Basic, "0.5\t0.5\t0.5").unwrap();
        assert_eq!(result.spacing.as_slice(), &[0.5, 0.5, 0.5]);
        assert_eq!(result.channels, None);
        assert_eq!(result.times, None);
        assert_eq!(result.series, None);
    }

    #[test]
    fn test_windows_line_endings_and_blank_lines() {
        let result =
            parse_report(ProtocolVersion::Extended, "\r\n0.2\t0.2\t1\r\n\r\n1\r\n1\r\n4\r\n").unwrap();
        assert_eq!(result.spacing.as_slice(), &[0.2, 0.2, 1.0]);
        assert_eq!(result.series, Some(4));
    }

    #[test]
    fn test_null_spacing_defaults_to_one() {
        let result = parse_report(ProtocolVersion::Basic, "0.3\t0.3\tnull\n").unwrap();
        assert_eq!(result.spacing.as_slice(), &[0.3, 0.3, 1.0]);
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(
            parse_report(ProtocolVersion::Basic, "  \n"),
            Err(ParseError::MissingLine { field: "spacing" })
        );
    }

    #[test]
    fn test_missing_count_line() {
        assert_eq!(
            parse_report(ProtocolVersion::Extended, "1\t1\t1\n3\n5\n"),
            Err(ParseError::MissingLine { field: "series count" })
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse_report(ProtocolVersion::Basic, "1.0\tabc\t1.0"),
            Err(ParseError::InvalidNumber { field: "spacing", .. })
        ));
        assert!(matches!(
            parse_report(ProtocolVersion::Extended, "1\t1\t1\n-3\n1\n1"),
            Err(ParseError::InvalidNumber { field: "channel count", .. })
        ));
        assert!(matches!(
            parse_report(ProtocolVersion::Basic, "1.0\t0.0"),
            Err(ParseError::Spacing(_))
        ));
        assert_eq!(
            parse_report(ProtocolVersion::Basic, "1 1 1 1 1"),
            Err(ParseError::TooManyAxes { count: 5 })
        );
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!(ProtocolVersion::default(), ProtocolVersion::Extended);
        assert_eq!(ProtocolVersion::Basic.to_string(), "basic");
        assert_eq!("extended".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Extended);
        assert!(ProtocolVersion::Extended.supports_time());
        assert!(!ProtocolVersion::Basic.supports_time());
    }
}
