use std::path::PathBuf;

use thiserror::Error;

use crate::report::report_model::ErrorDetail;

/// Failures reported by a browser backend (transport, protocol, or process).
#[derive(Debug, Error)]
pub enum DriverError {
    /// Helper process could not be started
    #[error("failed to spawn {program} (is it installed?): {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// Reading from or writing to the helper process failed
    #[error("session I/O error: {0}")]
    SessionIo(String),

    /// The browser answered, but reported an error for the command
    #[error("{command} failed: {message}")]
    Protocol { command: String, message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    #[error("invalid screenshot payload: {0}")]
    Screenshot(#[from] base64::DecodeError),
}

/// Everything that can go wrong while executing one case.
///
/// These never escape a case: the engine turns each one into a FAILED step
/// carrying an error-detail attachment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaseError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Navigation(String),

    #[error("element {locator} not present after {timeout_ms} ms{}", last_error_suffix(.last_error))]
    LocateTimeout {
        locator: String,
        timeout_ms: u64,
        last_error: Option<String>,
    },

    #[error("{0}")]
    ActionExecution(String),

    #[error("{assertion} mismatch: expected {expected:?}, actual {actual:?}")]
    AssertionFailure {
        assertion: String,
        expected: String,
        actual: String,
    },
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

impl CaseError {
    /// Stable kind name written into error-detail blocks and matched by
    /// the classification rules in `categories.json`.
    pub fn kind(&self) -> &'static str {
        match self {
            CaseError::Configuration(_) => "ConfigurationError",
            CaseError::Navigation(_) => "NavigationError",
            CaseError::LocateTimeout { .. } => "LocateTimeoutError",
            CaseError::ActionExecution(_) => "ActionExecutionError",
            CaseError::AssertionFailure { .. } => "AssertionFailure",
        }
    }

    pub fn detail(&self, phase: &str) -> ErrorDetail {
        let mut trace = format!("phase: {}", phase);
        if let CaseError::AssertionFailure {
            expected, actual, ..
        } = self
        {
            trace.push_str(&format!("\nexpected: {}\nactual: {}", expected, actual));
        }
        ErrorDetail {
            kind: self.kind().to_string(),
            message: self.to_string(),
            trace: Some(trace),
        }
    }
}

/// Storage failures of the report builder. These are fatal for the run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create report directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        source: serde_json::Error,
    },

    #[error("unknown case handle #{0}")]
    UnknownCase(usize),
}

/// An attachment could not be stored. Never fatal to the owning case.
#[derive(Debug, Error)]
pub enum AttachmentWriteError {
    #[error("attachment '{name}' declared as {mime} cannot hold {content} content")]
    Unsupported {
        name: String,
        mime: &'static str,
        content: &'static str,
    },

    #[error("unknown step handle (case #{case}, step #{step})")]
    UnknownStep { case: usize, step: usize },

    #[error("failed to write attachment {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The external renderer failed. Raw results stay on disk untouched.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch renderer {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("renderer produced no entry file at {0}")]
    MissingEntry(PathBuf),

    #[error("rendering disabled")]
    Disabled,
}

/// The report directory could not be packed into a zip archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write archive {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk report directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Run-level failures returned by the suite orchestrator.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to acquire browser session: {0}")]
    Session(#[source] DriverError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
