//! Path to handler location lookup.
//!
//! Handler discovery happens outside this crate. Its result reaches the
//! generator either as an index file:
//!
//! ```yaml
//! /users/{id}:
//!   handler: sub.GetUser
//!   dir: internal/user
//!   package: user
//!   module: profile
//! ```
//!
//! or as `x-handler`, `x-handler-dir`, `x-handler-package` and
//! `x-handler-module` extensions on each operation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::openapi::{OpenApiContext, Operation};
use crate::routes::select_operation;

/// Where the handler of one path lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerLocation {
    /// `pkg.Func` or bare `Func`
    pub handler: String,
    /// Directory of the destination package
    pub dir: String,
    /// Go package name declared in `dir`
    pub package: String,
    /// Logical module label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// Handler locations keyed by spec path (before any base path is applied)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerIndex {
    entries: BTreeMap<String, HandlerLocation>,
}

impl HandlerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an index file, JSON or YAML
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let index = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(index)
    }

    /// Collect locations declared through `x-handler*` extensions
    pub fn from_spec_extensions(spec: &OpenApiContext) -> crate::Result<Self> {
        let mut index = Self::new();
        for (path, item) in spec.path_items()? {
            if let (_, Some(op)) = select_operation(&item) {
                if let Some(location) = location_from_extensions(op) {
                    index.insert(path, location);
                }
            }
        }
        Ok(index)
    }

    pub fn insert(&mut self, path: impl Into<String>, location: HandlerLocation) {
        self.entries.insert(path.into(), location);
    }

    pub fn get(&self, path: &str) -> Option<&HandlerLocation> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layer `other` on top of `self`; entries in `other` win
    pub fn merge(mut self, other: HandlerIndex) -> Self {
        self.entries.extend(other.entries);
        self
    }
}

fn location_from_extensions(op: &Operation) -> Option<HandlerLocation> {
    let handler = op.extension_str("x-handler")?;
    let dir = op.extension_str("x-handler-dir")?;
    let package = op
        .extension_str("x-handler-package")
        .map(String::from)
        .or_else(|| {
            Path::new(dir)
                .file_name()
                .and_then(|n| n.to_str())
                .map(String::from)
        })?;

    Some(HandlerLocation {
        handler: handler.to_string(),
        dir: dir.to_string(),
        package,
        module: op.extension_str("x-handler-module").map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_from_yaml_file() -> crate::Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("handlers.yaml");
        tokio::fs::write(
            &file,
            r#"
/users:
  handler: ListUsers
  dir: internal/user
  package: user
/users/{id}:
  handler: sub.GetUser
  dir: internal/user
  package: user
  module: profile
"#,
        )
        .await?;

        let index = HandlerIndex::from_file(&file).await?;
        assert_eq!(index.len(), 2);
        let by_id = index.get("/users/{id}").unwrap();
        assert_eq!(by_id.handler, "sub.GetUser");
        assert_eq!(by_id.module.as_deref(), Some("profile"));
        assert_eq!(index.get("/users").unwrap().module, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_from_json_file() -> crate::Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("handlers.json");
        tokio::fs::write(
            &file,
            r#"{"/a": {"handler": "A", "dir": "api", "package": "api"}}"#,
        )
        .await?;
        let index = HandlerIndex::from_file(&file).await?;
        assert_eq!(index.get("/a").unwrap().package, "api");
        Ok(())
    }

    #[test]
    fn test_from_spec_extensions() -> crate::Result<()> {
        let spec = OpenApiContext::new(json!({
            "paths": {
                "/a": {"get": {
                    "x-handler": "sub.A",
                    "x-handler-dir": "internal/api",
                    "x-handler-module": "admin"
                }},
                "/b": {"post": {"x-handler": "B"}},
                "/c": {}
            }
        }));
        let index = HandlerIndex::from_spec_extensions(&spec)?;
        assert_eq!(index.len(), 1);
        let a = index.get("/a").unwrap();
        assert_eq!(a.package, "api");
        assert_eq!(a.module.as_deref(), Some("admin"));
        Ok(())
    }

    #[test]
    fn test_merge_prefers_other() {
        let loc = |h: &str| HandlerLocation {
            handler: h.into(),
            dir: "d".into(),
            package: "d".into(),
            module: None,
        };
        let mut base = HandlerIndex::new();
        base.insert("/a", loc("Old"));
        base.insert("/b", loc("B"));
        let mut file = HandlerIndex::new();
        file.insert("/a", loc("New"));

        let merged = base.merge(file);
        assert_eq!(merged.get("/a").unwrap().handler, "New");
        assert_eq!(merged.get("/b").unwrap().handler, "B");
    }
}
