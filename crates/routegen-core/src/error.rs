//! Error handling for the routegen code generation library.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. It uses `thiserror` for easy
//! error handling and implements conversions from common error types.
//!
//! Every variant is fatal to a generation run: the pipeline performs no
//! retries and has no partial-success mode.
//!
//! # Examples
//!
//! ```
//! use routegen_core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     // Operations that might fail...
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Result type for routegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for routegen operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// OpenAPI error
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// Template error
    #[error("Template error: {0}")]
    Template(String),

    /// Template engine error
    #[error("Template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A security requirement resolved to a chain that is not made of
    /// qualifier/symbol pairs.
    #[error(
        "malformed security for '{path}': scheme '{scheme}' yields {len} chain entries, \
         expected qualifier/symbol pairs"
    )]
    Security {
        path: String,
        scheme: String,
        len: usize,
    },

    /// The package resolver could not produce an import path for a directory.
    #[error(
        "failed to resolve import path for {}: {reason}, stdout: {stdout}, stderr: {stderr}",
        dir.display()
    )]
    PackageResolution {
        dir: PathBuf,
        reason: String,
        stdout: String,
        stderr: String,
    },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template(msg.into())
    }

    /// Create a resolution error that carries no captured process output
    pub fn resolution<S: Into<String>>(dir: impl Into<PathBuf>, reason: S) -> Self {
        Self::PackageResolution {
            dir: dir.into(),
            reason: reason.into(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}
