use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::driver::{Converter, DriverError};
use crate::protocol::ProtocolVersion;
use crate::request::ConversionRequest;

pub const DEFAULT_MAIN_CLASS: &str = "SimpleImageConverter";

/// Environment variable overriding the converter installation directory
pub const TOOL_DIR_ENV: &str = "BIOFORMATS_TOOL_DIR";

/// Name of the installation directory looked up next to the executable
pub const TOOL_DIR_NAME: &str = "bioformats";

const CLASSPATH_JARS: [&str; 2] = ["bio-formats.jar", "loci_tools.jar"];

/// Runs the Bio-Formats `SimpleImageConverter` through a Java VM
#[derive(Debug, Clone)]
pub struct JavaConverter {
    java_path: PathBuf,
    tool_dir: PathBuf,
    main_class: String,
    protocol: ProtocolVersion,
}

impl JavaConverter {
    /// Locate java and the converter installation from the environment
    pub fn new() -> Result<Self, DriverError> {
        let java_path = Self::find_java_executable();
        let tool_dir = Self::default_tool_dir()?;
        Self::with_paths(java_path, tool_dir)
    }

    pub fn with_paths(
        java_path: impl Into<PathBuf>,
        tool_dir: impl Into<PathBuf>,
    ) -> Result<Self, DriverError> {
        let tool_dir = tool_dir.into();

        if !tool_dir.is_dir() {
            return Err(DriverError::Initialization(format!(
                "Converter directory not found at: {}",
                tool_dir.display()
            )));
        }

        Ok(Self {
            java_path: java_path.into(),
            tool_dir,
            main_class: DEFAULT_MAIN_CLASS.to_string(),
            protocol: ProtocolVersion::default(),
        })
    }

    pub fn with_main_class(mut self, main_class: impl Into<String>) -> Self {
        self.main_class = main_class.into();
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn java_path(&self) -> &Path {
        &self.java_path
    }

    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    pub fn main_class(&self) -> &str {
        &self.main_class
    }

    /// `$JAVA_HOME/bin/java` when it exists, otherwise `java` from PATH
    pub fn find_java_executable() -> PathBuf {
        let binary = format!("java{}", std::env::consts::EXE_SUFFIX);

        if let Some(home) = std::env::var_os("JAVA_HOME") {
            let candidate = PathBuf::from(home).join("bin").join(&binary);
            if candidate.exists() {
                return candidate;
            }
        }

        PathBuf::from(binary)
    }

    /// `$BIOFORMATS_TOOL_DIR`, or the `bioformats` directory next to the
    /// running executable.
    pub fn default_tool_dir() -> Result<PathBuf, DriverError> {
        if let Some(dir) = std::env::var_os(TOOL_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let exe = std::env::current_exe().map_err(|e| {
            DriverError::Initialization(format!("Cannot locate running executable: {}", e))
        })?;
        let install_dir = exe.parent().ok_or_else(|| {
            DriverError::Initialization(format!("Executable has no parent directory: {}", exe.display()))
        })?;

        Ok(install_dir.join(TOOL_DIR_NAME))
    }

    /// The converter jars followed by the tool directory itself, joined with
    /// the platform path separator.
    pub fn classpath(&self) -> Result<OsString, DriverError> {
        let entries = CLASSPATH_JARS
            .iter()
            .map(|jar| self.tool_dir.join(jar))
            .chain(std::iter::once(self.tool_dir.clone()));

        std::env::join_paths(entries)
            .map_err(|e| DriverError::Initialization(format!("Invalid classpath entry: {}", e)))
    }

    pub fn build_command(&self, request: &ConversionRequest, output: &Path) -> Result<Command, DriverError> {
        let input = request.source().ok_or(DriverError::MissingInput)?;

        let mut cmd = Command::new(&self.java_path);
        cmd.arg("-cp")
            .arg(self.classpath()?)
            .arg(&self.main_class)
            .arg("-channel")
            .arg(request.channel.to_string())
            .arg("-series")
            .arg(request.series.to_string());

        if self.protocol.supports_time() {
            cmd.arg("-time").arg(request.time.to_string());
        }

        cmd.arg(input).arg(output);
        Ok(cmd)
    }

    fn execute_command(&self, mut cmd: Command) -> Result<String, DriverError> {
        debug!(command = ?cmd, "Executing converter");

        let output = cmd.output().map_err(DriverError::Spawn)?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = join_output(&stdout, &stderr);
            warn!(status = ?output.status.code(), "Converter failed");
            return Err(DriverError::ToolFailed {
                status: output.status.code(),
                output: combined,
            });
        }

        Ok(stdout.into_owned())
    }
}

/// Captured stdout then stderr, one stream per line block
fn join_output(stdout: &str, stderr: &str) -> String {
    let stdout = stdout.trim();
    let stderr = stderr.trim();
    match (stdout.is_empty(), stderr.is_empty()) {
        (true, _) => stderr.to_string(),
        (_, true) => stdout.to_string(),
        _ => format!("{}\n{}", stdout, stderr),
    }
}

impl Converter for JavaConverter {
    fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    fn convert(&self, request: &ConversionRequest, output: &Path) -> Result<String, DriverError> {
        let cmd = self.build_command(request, output)?;
        let stdout = self.execute_command(cmd)?;
        info!(
            source = ?request.file_name,
            channel = request.channel,
            series = request.series,
            "Converter finished"
        );
        Ok(stdout)
    }

    fn description(&self) -> String {
        format!(
            "Java converter: {} {} ({} protocol, tools in {})",
            self.java_path.display(),
            self.main_class,
            self.protocol,
            self.tool_dir.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn request() -> ConversionRequest {
        ConversionRequest::new()
            .with_file_name("/data/cells.lif")
            .with_channel(2)
            .with_series(1)
            .with_time(4)
    }

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_missing_tool_dir() {
        let result = JavaConverter::with_paths("java", "/definitely/not/here/bioformats");
        assert!(matches!(result, Err(DriverError::Initialization(_))));
    }

    #[test]
    fn test_classpath_layout() {
        let dir = tempfile::tempdir().unwrap();
        let converter = JavaConverter::with_paths("java", dir.path()).unwrap();

        let classpath = converter.classpath().unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(&classpath).collect();
        assert_eq!(
            entries,
            vec![
                dir.path().join("bio-formats.jar"),
                dir.path().join("loci_tools.jar"),
                dir.path().to_path_buf(),
            ]
        );
    }

    #[test]
    fn test_extended_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let converter = JavaConverter::with_paths("java", dir.path()).unwrap();

        let cmd = converter
            .build_command(&request(), Path::new("/tmp/scratch.tif"))
            .unwrap();
        assert_eq!(cmd.get_program(), OsStr::new("java"));

        let args = args_of(&cmd);
        assert_eq!(args[0], "-cp");
        assert_eq!(
            &args[2..],
            &[
                "SimpleImageConverter",
                "-channel", "2",
                "-series", "1",
                "-time", "4",
                "/data/cells.lif",
                "/tmp/scratch.tif",
            ]
        );
    }

    #[test]
    fn test_basic_command_line_has_no_time() {
        let dir = tempfile::tempdir().unwrap();
        let converter = JavaConverter::with_paths("java", dir.path())
            .unwrap()
            .with_protocol(ProtocolVersion::Basic)
            .with_main_class("loci.formats.tools.SimpleImageConverter");

        let cmd = converter
            .build_command(&request(), Path::new("/tmp/scratch.tif"))
            .unwrap();
        let args = args_of(&cmd);
        assert!(!args.iter().any(|arg| arg == "-time"));
        assert_eq!(args[2], "loci.formats.tools.SimpleImageConverter");
        assert_eq!(args.len(), 9);
    }

    #[test]
    fn test_command_requires_input() {
        let dir = tempfile::tempdir().unwrap();
        let converter = JavaConverter::with_paths("java", dir.path()).unwrap();
        let result = converter.build_command(&ConversionRequest::new(), Path::new("out.tif"));
        assert!(matches!(result, Err(DriverError::MissingInput)));
    }

    #[test]
    fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let converter = JavaConverter::with_paths("/definitely/not/a/java", dir.path()).unwrap();
        let result = converter.convert(&request(), Path::new("out.tif"));
        assert!(matches!(result, Err(DriverError::Spawn(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let converter = JavaConverter::with_paths("false", dir.path()).unwrap();
        match converter.convert(&request(), Path::new("out.tif")) {
            Err(DriverError::ToolFailed { status, .. }) => assert_eq!(status, Some(1)),
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_returns_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let converter = JavaConverter::with_paths("true", dir.path()).unwrap();
        let stdout = converter.convert(&request(), Path::new("out.tif")).unwrap();
        assert!(stdout.is_empty());
    }

    #[test]
    fn test_join_output_separates_streams() {
        assert_eq!(
            join_output("0.5\t0.5", "Exception in thread \"main\"\n"),
            "0.5\t0.5\nException in thread \"main\""
        );
        assert_eq!(join_output("", "  boom\n"), "boom");
        assert_eq!(join_output("partial\n", ""), "partial");
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_failure_keeps_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let converter = JavaConverter::with_paths("sh", dir.path()).unwrap();
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("printf 'spacing'; printf 'FormatException' >&2; exit 2");
        match converter.execute_command(cmd) {
            Err(DriverError::ToolFailed { status, output }) => {
                assert_eq!(status, Some(2));
                assert_eq!(output, "spacing\nFormatException");
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_failure_message() {
        let err = DriverError::ToolFailed {
            status: Some(3),
            output: "Exception in thread main".to_string(),
        };
        assert_eq!(err.to_string(), "converter exited with status 3: Exception in thread main");
    }
}
