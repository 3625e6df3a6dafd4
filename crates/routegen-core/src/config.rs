//! Configuration for route generation.
//!
//! The configuration can be created programmatically or loaded from a YAML,
//! TOML or JSON file; the format follows the file extension. Every field
//! except `output_dir` has a default.
//!
//! # Examples
//!
//! ```no_run
//! use routegen_core::config::GenConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> routegen_core::Result<()> {
//! // Create a new config programmatically
//! let mut config = GenConfig::new("docs");
//! config.auto_overwrite = true;
//!
//! // Or load from a config file
//! let config = GenConfig::from_file("routegen.yaml").await?;
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::path::{Path, PathBuf};

use crate::aggregate::GroupingKey;
use crate::resolver::default_gopath;
use crate::security::SecurityPolicy;
use crate::utils::{go_ident, last_segment};
use crate::Error;

// External imports (alphabetized)
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Configuration of one generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenConfig {
    /// Rewrite generated files that already exist
    #[serde(default)]
    pub auto_overwrite: bool,

    /// Directory of the documentation manifest (`resource.go`)
    pub output_dir: String,

    /// Package name of the manifest, defaults to the last segment of `output_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_pkg: Option<String>,

    /// Aggregation key for registration files
    #[serde(default)]
    pub group_by: GroupingKey,

    /// Prefix applied to every route path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Take the prefix from the document's `basePath` when `base_path` is unset
    #[serde(default)]
    pub use_spec_base_path: bool,

    /// Directory of the route table (`IntRouterPaths.go`); disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_table_dir: Option<String>,

    /// Optional directory of templates overriding the built-ins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<String>,

    /// GOPATH whose `src/` prefix is stripped from `go list` output
    #[serde(default = "default_gopath", skip_serializing_if = "Option::is_none")]
    pub gopath: Option<PathBuf>,

    /// Middleware presets keyed by security scheme name
    #[serde(default)]
    pub security: SecurityPolicy,
}

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> crate::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            other => Err(Error::config(format!(
                "Unsupported config file extension {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }
}

impl GenConfig {
    /// Create a new GenConfig with default values
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self {
            auto_overwrite: false,
            output_dir: output_dir.into(),
            output_pkg: None,
            group_by: GroupingKey::default(),
            base_path: None,
            use_spec_base_path: false,
            route_table_dir: None,
            template_dir: None,
            gopath: default_gopath(),
            security: SecurityPolicy::default(),
        }
    }

    /// Package name of the documentation manifest
    pub fn manifest_package(&self) -> String {
        match self.output_pkg.as_deref() {
            Some(pkg) if !pkg.is_empty() => pkg.to_string(),
            _ => go_ident(last_segment(&self.output_dir)),
        }
    }

    /// Path of the documentation manifest
    pub fn manifest_path(&self) -> PathBuf {
        Path::new(&self.output_dir).join("resource.go")
    }

    /// Path of the route table, when enabled
    pub fn route_table_path(&self) -> Option<PathBuf> {
        self.route_table_dir
            .as_deref()
            .map(|dir| Path::new(dir).join("IntRouterPaths.go"))
    }

    /// Load configuration from a file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).await?;
        let config = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
            ConfigFormat::Json => serde_json::from_str(&content)?,
        };
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        Ok(())
    }
}

impl Default for GenConfig {
    fn default() -> Self {
        Self::new("docs")
    }
}
