//! OpenAPI specification loading and path item access.
//!
//! This module loads an already-valid OpenAPI 3 or Swagger 2 document and
//! exposes the pieces route generation needs: the ordered path items with
//! their operations, the document-level default security and the base path.
//! It does not validate the document.
//!
//! # Examples
//!
//! ```no_run
//! use routegen_core::openapi::OpenApiContext;
//! use routegen_core::error::Result;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! // Load an OpenAPI spec from a file
//! let spec = OpenApiContext::from_file("swagger.yaml").await?;
//!
//! for (path, item) in spec.path_items()? {
//!     println!("{path}: {:?}", item.get.is_some());
//! }
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::collections::BTreeMap;
use std::path::Path;

use crate::Error;

// External imports (alphabetized)
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::fs;
use url::Url;

/// One security requirement: scheme name to scopes or parameters.
///
/// A `BTreeMap` keeps scheme iteration in ascending name order.
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// Represents an OpenAPI specification
#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct OpenApiContext {
    /// The raw JSON value of the OpenAPI spec
    pub json: JsonValue,
}

impl OpenApiContext {
    /// Wrap an already parsed document
    pub fn new(json: JsonValue) -> Self {
        Self { json }
    }

    /// Create a new OpenApiContext from a file or URL (supports both YAML and JSON)
    pub async fn from_file_or_url<P: AsRef<str>>(location: P) -> crate::Result<Self> {
        let location = location.as_ref();

        if is_remote(location) {
            return Self::from_url(location).await;
        }

        Self::from_file(location).await
    }

    /// Create a new OpenApiContext from a file (supports both YAML and JSON)
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        Self::parse_content(&content).map_err(|e| {
            crate::Error::openapi(format!(
                "Failed to parse OpenAPI spec at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Create a new OpenApiContext from a URL (supports both YAML and JSON)
    pub async fn from_url(url: &str) -> crate::Result<Self> {
        let response = reqwest::get(url).await.map_err(|e| {
            crate::Error::openapi(format!("Failed to fetch OpenAPI spec from {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(crate::Error::openapi(format!(
                "Failed to fetch OpenAPI spec from {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let content = response.text().await.map_err(|e| {
            crate::Error::openapi(format!("Failed to read response from {}: {}", url, e))
        })?;

        Self::parse_content(&content).map_err(|e| {
            crate::Error::openapi(format!("Failed to parse OpenAPI spec from {}: {}", url, e))
        })
    }

    /// Parse content as either JSON or YAML
    pub fn parse_content(content: &str) -> Result<Self, String> {
        if let Ok(json) = serde_json::from_str(content) {
            return Ok(Self { json });
        }

        if let Ok(json) = serde_yaml::from_str(content) {
            return Ok(Self { json });
        }

        Err("content is neither valid JSON nor YAML".to_string())
    }

    /// Get the title of the API
    pub fn title(&self) -> Option<&str> {
        self.json.get("info")?.get("title")?.as_str()
    }

    /// Get the version of the API
    pub fn version(&self) -> Option<&str> {
        self.json.get("info")?.get("version")?.as_str()
    }

    /// Path prefix routes are served under.
    ///
    /// Swagger 2.0 `basePath` wins; otherwise the path component of the first
    /// OpenAPI 3 server URL. A bare `/` counts as no prefix.
    pub fn base_path(&self) -> Option<String> {
        let raw = if let Some(bp) = self.json.get("basePath").and_then(JsonValue::as_str) {
            bp.to_string()
        } else {
            let server = self
                .json
                .get("servers")
                .and_then(JsonValue::as_array)
                .and_then(|s| s.first())
                .and_then(|s| s.get("url"))
                .and_then(JsonValue::as_str)?;
            match Url::parse(server) {
                Ok(url) => url.path().to_string(),
                // Relative server URLs such as "/v1"
                Err(_) => server.to_string(),
            }
        };

        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Document-level security, applied to operations that declare none
    pub fn default_security(&self) -> crate::Result<Option<Vec<SecurityRequirement>>> {
        match self.json.get("security") {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| Error::openapi(format!("Invalid top-level security: {}", e))),
        }
    }

    /// All path items, in ascending path order
    pub fn path_items(&self) -> crate::Result<Vec<(String, PathItem)>> {
        let paths = self
            .json
            .get("paths")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| Error::openapi("Missing 'paths' object"))?;

        let mut items = Vec::with_capacity(paths.len());
        for (path, item) in paths {
            let parsed: PathItem = serde_json::from_value(item.clone()).map_err(|e| {
                Error::openapi(format!("Invalid path item '{}': {}", path, e))
            })?;
            items.push((path.clone(), parsed));
        }
        items.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(items)
    }
}

/// Whether a spec location should be fetched over HTTP
pub fn is_remote(location: &str) -> bool {
    Url::parse(location)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// The operation slots of one path
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub post: Option<Operation>,
    pub put: Option<Operation>,
    pub delete: Option<Operation>,
    pub head: Option<Operation>,
    pub options: Option<Operation>,
    pub patch: Option<Operation>,
}

/// The operation fields route generation reads
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Operation {
    /// Unique string used to identify the operation.
    #[serde(rename = "operationId")]
    pub id: Option<String>,
    /// A short summary of what the operation does.
    pub summary: Option<String>,
    /// A list of tags for API documentation control.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Security requirements. `None` when the operation omits the field,
    /// `Some(vec![])` when it explicitly opts out.
    pub security: Option<Vec<SecurityRequirement>>,
    /// Remaining fields, including specification extensions (`x-`).
    #[serde(flatten)]
    pub vendor_extensions: BTreeMap<String, JsonValue>,
}

impl Operation {
    /// Look up a string-valued vendor extension
    pub fn extension_str(&self, name: &str) -> Option<&str> {
        debug_assert!(name.starts_with("x-"));
        self.vendor_extensions.get(name).and_then(JsonValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_from_file_yaml() -> crate::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("swagger.yaml");
        let yaml_content = r#"
swagger: "2.0"
info:
  title: Test API
  version: 1.0.0
basePath: /api/v1
paths:
  /users:
    get:
      summary: List users
      tags: [user]
"#;
        tokio::fs::write(&file_path, yaml_content).await?;

        let spec = OpenApiContext::from_file(&file_path).await?;
        assert_eq!(spec.title(), Some("Test API"));
        assert_eq!(spec.version(), Some("1.0.0"));
        assert_eq!(spec.base_path(), Some("/api/v1".to_string()));

        let items = spec.path_items()?;
        assert_eq!(items.len(), 1);
        let op = items[0].1.get.as_ref().unwrap();
        assert_eq!(op.summary.as_deref(), Some("List users"));
        assert_eq!(op.tags, vec!["user".to_string()]);
        Ok(())
    }

    #[test]
    fn test_base_path_from_servers() {
        let spec = OpenApiContext::new(json!({
            "servers": [{"url": "https://api.example.com/v2/"}],
            "paths": {}
        }));
        assert_eq!(spec.base_path(), Some("/v2".to_string()));

        let relative = OpenApiContext::new(json!({"servers": [{"url": "/v3"}]}));
        assert_eq!(relative.base_path(), Some("/v3".to_string()));

        let root = OpenApiContext::new(json!({"servers": [{"url": "https://api.example.com"}]}));
        assert_eq!(root.base_path(), None);
    }

    #[test]
    fn test_path_items_sorted_and_parsed() -> crate::Result<()> {
        let spec = OpenApiContext::new(json!({
            "paths": {
                "/b": {"post": {"security": [{"auth": []}], "x-handler": "CreateB"}},
                "/a": {"get": {"summary": "A", "responses": {}}}
            }
        }));
        let items = spec.path_items()?;
        let paths: Vec<_> = items.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);

        let post = items[1].1.post.as_ref().unwrap();
        let security = post.security.as_ref().unwrap();
        assert_eq!(security.len(), 1);
        assert!(security[0].contains_key("auth"));
        assert_eq!(post.extension_str("x-handler"), Some("CreateB"));
        Ok(())
    }

    #[test]
    fn test_missing_paths_is_error() {
        let spec = OpenApiContext::new(json!({"info": {}}));
        assert!(spec.path_items().is_err());
    }

    #[test]
    fn test_explicit_empty_security_is_kept() -> crate::Result<()> {
        let spec = OpenApiContext::new(json!({
            "security": [{"auth": []}],
            "paths": {"/open": {"get": {"security": []}}, "/closed": {"get": {}}}
        }));
        let items = spec.path_items()?;
        let closed = items[0].1.get.as_ref().unwrap();
        let open = items[1].1.get.as_ref().unwrap();
        assert!(closed.security.is_none());
        assert_eq!(open.security.as_ref().map(Vec::len), Some(0));
        assert_eq!(spec.default_security()?.map(|s| s.len()), Some(1));
        Ok(())
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/swagger.json"));
        assert!(is_remote("http://localhost:8080/openapi.yaml"));
        assert!(!is_remote("docs/swagger.yaml"));
        assert!(!is_remote("/abs/swagger.yaml"));
    }

    #[test]
    fn test_parse_content_rejects_garbage() {
        assert!(OpenApiContext::parse_content("{ not: [valid").is_err());
    }
}
