use std::fs;
use std::path::{Path, PathBuf};

use bioformats_common::ImageType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::driver::java::{JavaConverter, DEFAULT_MAIN_CLASS};
use crate::error::{BioformatsError, Result};
use crate::protocol::ProtocolVersion;

/// Converter and adapter settings, loaded from TOML or JSON
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AdapterConfig {
    /// Java executable; `JAVA_HOME` or `java` on the PATH when unset
    pub java: Option<PathBuf>,
    /// Directory holding the Bio-Formats jars and the converter class
    pub tool_dir: Option<PathBuf>,
    pub main_class: String,
    /// `extended` needs a converter that accepts `-time`
    pub protocol: ProtocolVersion,
    /// Target image type name, e.g. `UC3`
    pub image_type: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            java: None,
            tool_dir: None,
            main_class: DEFAULT_MAIN_CLASS.to_string(),
            protocol: ProtocolVersion::default(),
            image_type: ImageType::default().to_string(),
        }
    }
}

impl AdapterConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format from the extension and load
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(BioformatsError::Configuration(format!(
                "Unsupported config format for {}. Please use .toml or .json files",
                path.display()
            ))),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resolve_image_type(&self) -> Result<ImageType> {
        Ok(ImageType::parse(&self.image_type)?)
    }

    /// Build the converter, filling unset paths from the environment
    pub fn converter(&self) -> Result<JavaConverter> {
        let java = self
            .java
            .clone()
            .unwrap_or_else(JavaConverter::find_java_executable);
        let tool_dir = match &self.tool_dir {
            Some(dir) => dir.clone(),
            None => JavaConverter::default_tool_dir()?,
        };

        Ok(JavaConverter::with_paths(java, tool_dir)?
            .with_main_class(self.main_class.clone())
            .with_protocol(self.protocol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Converter;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.main_class, "SimpleImageConverter");
        assert_eq!(config.protocol, ProtocolVersion::Extended);
        assert_eq!(config.resolve_image_type().unwrap(), ImageType::Uc3);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AdapterConfig::from_toml(
            r#"
            protocol = "basic"
            image_type = "f3"
            "#,
        )
        .unwrap();
        assert_eq!(config.protocol, ProtocolVersion::Basic);
        assert_eq!(config.resolve_image_type().unwrap(), ImageType::F3);
        assert_eq!(config.main_class, DEFAULT_MAIN_CLASS);
        assert!(config.java.is_none());
    }

    #[test]
    fn test_json_and_toml_agree() {
        let config = AdapterConfig {
            java: Some(PathBuf::from("/opt/jdk/bin/java")),
            tool_dir: Some(PathBuf::from("/opt/bioformats")),
            main_class: "CustomConverter".to_string(),
            protocol: ProtocolVersion::Basic,
            image_type: "US2".to_string(),
        };

        let from_toml = AdapterConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        let from_json = AdapterConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(from_toml, config);
        assert_eq!(from_json, config);
    }

    #[test]
    fn test_unknown_image_type() {
        let config = AdapterConfig {
            image_type: "RGB24".to_string(),
            ..Default::default()
        };
        let err = config.resolve_image_type().unwrap_err();
        assert!(matches!(err, BioformatsError::Configuration(_)));
        assert!(err.to_string().contains("RGB24"));
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("adapter.toml");
        fs::write(&toml_path, "main_class = \"A\"\n").unwrap();
        assert_eq!(AdapterConfig::from_file(&toml_path).unwrap().main_class, "A");

        let json_path = dir.path().join("adapter.json");
        fs::write(&json_path, r#"{"main_class": "B"}"#).unwrap();
        assert_eq!(AdapterConfig::from_file(&json_path).unwrap().main_class, "B");

        let yaml_path = dir.path().join("adapter.yaml");
        fs::write(&yaml_path, "main_class: C\n").unwrap();
        assert!(matches!(
            AdapterConfig::from_file(&yaml_path),
            Err(BioformatsError::Configuration(_))
        ));
    }

    #[test]
    fn test_converter_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = AdapterConfig {
            java: Some(PathBuf::from("/usr/bin/java")),
            tool_dir: Some(dir.path().to_path_buf()),
            protocol: ProtocolVersion::Basic,
            ..Default::default()
        };

        let converter = config.converter().unwrap();
        assert_eq!(converter.java_path(), Path::new("/usr/bin/java"));
        assert_eq!(converter.tool_dir(), dir.path());
        assert_eq!(converter.protocol(), ProtocolVersion::Basic);
    }

    #[test]
    fn test_converter_with_missing_tool_dir() {
        let config = AdapterConfig {
            tool_dir: Some(PathBuf::from("/nonexistent/bioformats")),
            ..Default::default()
        };
        assert!(matches!(
            config.converter(),
            Err(BioformatsError::Conversion(_))
        ));
    }
}
