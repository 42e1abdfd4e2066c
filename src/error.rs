// src/error.rs

//! Error types for mkvfx
//!
//! Every fatal condition of a bake is one of these variants. Nothing is
//! recovered locally; errors propagate to `main` and abort the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading recipes or baking packages
#[derive(Error, Debug)]
pub enum Error {
    /// A recipe is missing a field required for the requested operation
    #[error("No {field} specified for \"{package}\" in recipe")]
    MissingField { package: String, field: &'static str },

    /// Neither a platform-specific nor a generic command list exists
    #[error("No {phase} recipe exists for {package} on {platform}")]
    NoCommands {
        package: String,
        phase: &'static str,
        platform: String,
    },

    /// Requested package is not in the catalog
    #[error("Recipe for {0} not found")]
    RecipeNotFound(String),

    /// A package depends on itself, directly or transitively
    #[error("Dependency cycle detected: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    /// Catalog or manifest could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A required external tool is not installed
    #[error("Required tool not found: {0}")]
    ToolNotFound(String),

    /// The host environment is not set up for building
    #[error("Environment error: {0}")]
    EnvironmentError(String),

    /// This platform has no recipes
    #[error("Platform {0} not supported")]
    UnsupportedPlatform(String),

    /// A directory could not be created or is not a directory
    #[error("Could not create directory {}: {reason}", .path.display())]
    DirectoryError { path: PathBuf, reason: String },

    /// A command exited unsuccessfully
    #[error("Command failed with exit code {code:?}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A command could not be launched at all
    #[error("Could not execute {command}: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Source download failed
    #[error("Download failed: {0}")]
    DownloadError(String),

    /// Downloaded archive could not be extracted
    #[error("Failed to extract archive {}: {reason}", .path.display())]
    ExtractError { path: PathBuf, reason: String },

    /// Command line token that is neither a flag nor a known package
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}
