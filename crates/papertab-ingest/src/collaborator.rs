//! Contracts for the external normalize and parse steps
//!
//! Both steps are owned by other tools (encoding normalization, the LaTeX
//! toolchain). The pipeline only needs them behind two traits; the
//! `Command*` adapters run them as child processes.
//!
//! Both steps must tolerate being rerun on the same input/output pair: a
//! unit interrupted before its checkpoint is processed again in full.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Description of a normalized source tree, produced by the normalizer and
/// passed untouched to the parser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFileInfo(pub serde_json::Value);

/// Which parser variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    FullText,
    MetadataOnly,
}

impl std::fmt::Display for ParseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FullText => "full-text",
            Self::MetadataOnly => "metadata-only",
        })
    }
}

/// Rewrites a flattened source tree into `output`.
pub trait Normalizer {
    fn normalize(
        &self,
        input: &Path,
        output: &Path,
        write_logs: bool,
    ) -> Result<SourceFileInfo, IngestError>;
}

/// Everything the parser gets for one unit.
#[derive(Debug, Clone, Copy)]
pub struct ParseRequest<'a> {
    pub normalized_tree: &'a Path,
    pub output_dir: &'a Path,
    /// Output artifacts are named after this
    pub unit_name: &'a str,
    pub source_file_info: &'a SourceFileInfo,
    pub metadata_db: &'a Path,
    pub mode: ParseMode,
    pub incremental: bool,
    pub write_logs: bool,
    pub toolchain_dir: Option<&'a Path>,
}

/// Parses a normalized tree and writes its own output into `output_dir`.
pub trait SourceParser {
    fn parse(&self, request: &ParseRequest<'_>) -> Result<(), IngestError>;
}

/// Program plus leading arguments, e.g. `["python3", "normalize.py"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    /// `None` for an empty argv.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl std::fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Lines of stderr kept in a collaborator error message.
const STDERR_TAIL_LINES: usize = 5;

fn run_checked(stage: &'static str, cmd: &mut Command) -> Result<Output, IngestError> {
    log::debug!("{stage}: {cmd:?}");
    let output = cmd
        .output()
        .map_err(|e| IngestError::collaborator(stage, format!("failed to launch: {e}")))?;
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
    Err(IngestError::collaborator(
        stage,
        format!("{}: {}", output.status, tail.trim()),
    ))
}

/// Runs `<cmd> <input> <output> [--write-logs]`; stdout is the source file info as JSON.
#[derive(Debug, Clone)]
pub struct CommandNormalizer {
    command: ExternalCommand,
}

impl CommandNormalizer {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

impl Normalizer for CommandNormalizer {
    fn normalize(
        &self,
        input: &Path,
        output: &Path,
        write_logs: bool,
    ) -> Result<SourceFileInfo, IngestError> {
        let mut cmd = self.command.command();
        cmd.arg(input).arg(output);
        if write_logs {
            cmd.arg("--write-logs");
        }
        let out = run_checked("normalize", &mut cmd)?;

        let stdout = String::from_utf8_lossy(&out.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(SourceFileInfo::default());
        }
        serde_json::from_str(stdout).map_err(|e| {
            IngestError::collaborator("normalize", format!("invalid source file info: {e}"))
        })
    }
}

/// Runs the metadata-only or full-text parser program as
/// `<cmd> <normalized> <output_dir> <unit_name> <info.json> <metadata_db>`
/// followed by `--incremental`, `--write-logs` and `--toolchain-dir <dir>` when set.
#[derive(Debug, Clone)]
pub struct CommandParser {
    metadata_only: ExternalCommand,
    full_text: ExternalCommand,
}

impl CommandParser {
    pub fn new(metadata_only: ExternalCommand, full_text: ExternalCommand) -> Self {
        Self {
            metadata_only,
            full_text,
        }
    }

    /// The source file info is handed over as a JSON file next to the normalized tree.
    fn write_info(request: &ParseRequest<'_>) -> Result<PathBuf, IngestError> {
        let path = request
            .normalized_tree
            .with_file_name("source_file_info.json");
        let json = serde_json::to_vec(request.source_file_info).map_err(|e| {
            IngestError::collaborator("parse", format!("cannot encode source file info: {e}"))
        })?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

impl SourceParser for CommandParser {
    fn parse(&self, request: &ParseRequest<'_>) -> Result<(), IngestError> {
        let info_path = Self::write_info(request)?;
        let program = match request.mode {
            ParseMode::FullText => &self.full_text,
            ParseMode::MetadataOnly => &self.metadata_only,
        };

        let mut cmd = program.command();
        cmd.arg(request.normalized_tree)
            .arg(request.output_dir)
            .arg(request.unit_name)
            .arg(&info_path)
            .arg(request.metadata_db);
        if request.incremental {
            cmd.arg("--incremental");
        }
        if request.write_logs {
            cmd.arg("--write-logs");
        }
        if let (ParseMode::FullText, Some(dir)) = (request.mode, request.toolchain_dir) {
            cmd.arg("--toolchain-dir").arg(dir);
        }
        run_checked("parse", &mut cmd)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn external_command_from_argv() {
        assert!(ExternalCommand::from_argv(&[]).is_none());
        let cmd = ExternalCommand::from_argv(&argv(&["python3", "normalize.py"])).unwrap();
        assert_eq!(cmd.to_string(), "python3 normalize.py");
    }

    #[cfg(unix)]
    #[test]
    fn normalizer_reads_info_from_stdout() {
        let dir = TempDir::new().unwrap();
        let cmd = ExternalCommand::from_argv(&argv(&[
            "sh",
            "-c",
            r#"echo '{"files": 3}'"#,
            "normalize",
        ]))
        .unwrap();
        let info = CommandNormalizer::new(cmd)
            .normalize(dir.path(), dir.path(), false)
            .unwrap();
        assert_eq!(info.0["files"], 3);
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_collaborator_error() {
        let dir = TempDir::new().unwrap();
        let cmd = ExternalCommand::from_argv(&argv(&[
            "sh",
            "-c",
            "echo broken >&2; exit 3",
            "normalize",
        ]))
        .unwrap();
        let err = CommandNormalizer::new(cmd)
            .normalize(dir.path(), dir.path(), false)
            .unwrap_err();
        match err {
            IngestError::Collaborator { stage, message } => {
                assert_eq!(stage, "normalize");
                assert!(message.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_program_is_collaborator_error() {
        let dir = TempDir::new().unwrap();
        let cmd =
            ExternalCommand::from_argv(&argv(&["/nonexistent/papertab-normalizer"])).unwrap();
        let err = CommandNormalizer::new(cmd)
            .normalize(dir.path(), dir.path(), false)
            .unwrap_err();
        assert!(matches!(err, IngestError::Collaborator { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn parser_passes_unit_name_and_info_file() {
        let dir = TempDir::new().unwrap();
        let normalized = dir.path().join("normalized");
        fs::create_dir(&normalized).unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        // $3 = unit name, $4 = info file
        let script = r#"cp "$4" "$2/$3.info.json""#;
        let cmd = ExternalCommand::from_argv(&argv(&["sh", "-c", script, "parse"])).unwrap();
        let parser = CommandParser::new(cmd.clone(), cmd);
        let info = SourceFileInfo(serde_json::json!({"k": "v"}));
        parser
            .parse(&ParseRequest {
                normalized_tree: &normalized,
                output_dir: &out,
                unit_name: "a.tar",
                source_file_info: &info,
                metadata_db: Path::new("meta.db"),
                mode: ParseMode::MetadataOnly,
                incremental: false,
                write_logs: false,
                toolchain_dir: None,
            })
            .unwrap();

        let written = fs::read_to_string(out.join("a.tar.info.json")).unwrap();
        assert_eq!(written, r#"{"k":"v"}"#);
    }
}
