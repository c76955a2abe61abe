//! Error types for the firmware build pipeline.

use std::path::{Path, PathBuf};

use crate::runner::Stage;

/// Everything that can abort a pipeline run.
///
/// None of these are retried: a broken source file or a disconnected device
/// needs a human before the next attempt.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A static path, flag or setting is missing or invalid.
    #[error("configuration error: {detail}")]
    Configuration {
        /// Description of the problem.
        detail: String,
    },

    /// A required file of the platform install is absent.
    #[error("configuration error: {what} not found at {}", path.display())]
    MissingPath {
        /// Role of the file ("linker script", "factory firmware", ...).
        what: &'static str,
        /// Where it was expected.
        path: PathBuf,
    },

    /// The settings file could not be parsed.
    #[error("settings file {}: {source}", path.display())]
    ConfigFile {
        /// The settings file.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: toml::de::Error,
    },

    /// Reading the settings file or creating a build directory failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Source directory walk failed.
    #[error("source discovery failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// An external tool could not be started at all.
    #[error("{stage}: failed to run `{program}`: {source}")]
    Spawn {
        /// Pipeline stage that tried to run the tool.
        stage: Stage,
        /// Program name as given to the OS.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A compiler, linker, converter or the size tool exited unsuccessfully.
    #[error("{stage} failed with {}", describe_code(.code))]
    Stage {
        /// Failing stage.
        stage: Stage,
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
    },

    /// The SysEx transmission tool exited unsuccessfully.
    #[error("delivery to port \"{port}\" failed with {}", describe_code(.code))]
    Delivery {
        /// MIDI port the firmware was sent to.
        port: String,
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
    },

    /// The requested target name is not registered.
    #[error("unknown target `{name}` (available: {available})")]
    UnknownTarget {
        /// The name as typed.
        name: String,
        /// Comma-separated list of registered names.
        available: String,
    },

    /// The linked program does not fit the configured memory limit.
    #[error("{region} usage {used} bytes exceeds the limit of {limit} bytes")]
    SizeLimit {
        /// "flash" or "RAM".
        region: &'static str,
        /// Bytes used.
        used: u64,
        /// Configured maximum.
        limit: u64,
    },
}

impl BuildError {
    /// Shorthand for [`BuildError::Configuration`].
    pub fn config(detail: impl Into<String>) -> Self {
        BuildError::Configuration {
            detail: detail.into(),
        }
    }

    /// Adapter for `map_err` that attaches the path an I/O call was made on.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "termination by signal".to_string(),
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, BuildError>;
