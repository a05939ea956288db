//! Error types for the backup run.

use std::path::PathBuf;

/// Backup errors. Every variant is fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Missing or malformed input.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The local snapshot directory could not be created.
    #[error("failed to prepare snapshot directory {}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external tool could not be started at all.
    #[error("{step}: failed to spawn {program}")]
    Spawn {
        step: &'static str,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran and exited unsuccessfully.
    #[error("{step}: {program} exited with {}", describe_code(.code))]
    Process {
        step: &'static str,
        program: String,
        code: Option<i32>,
    },

    /// Fetching the upload helper failed.
    #[error("failed to download {url}: {message}")]
    Download { url: String, message: String },

    /// Local I/O outside of directory preparation.
    #[error("i/o error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl BackupError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    ///
    /// A failing external tool propagates its own status so supervisors see
    /// the same code they would get from running the tool by hand.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Path { .. } | Self::Io { .. } => 3,
            Self::Download { .. } => 4,
            Self::Spawn { .. } => 1,
            Self::Process { code, .. } => match code {
                Some(c) if *c != 0 => *c,
                _ => 1,
            },
        }
    }

    /// Name of the run step that failed, if the error came from one.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            Self::Spawn { step, .. } | Self::Process { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Result type for backup operations.
pub type BackupResult<T> = Result<T, BackupError>;
