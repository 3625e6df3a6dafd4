//! Generated artifact kinds and their built-in templates.
//!
//! ```
//! use routegen_core::templates::ArtifactKind;
//! use std::str::FromStr;
//!
//! let kind = ArtifactKind::from_str("router").unwrap();
//! assert_eq!(kind, ArtifactKind::Router);
//! assert_eq!(kind.template_name(), "router.go.tera");
//! assert_eq!(kind.to_string(), "router");
//! ```

use std::fmt;
use std::str::FromStr;

/// One kind of generated Go file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// Per-destination public/private registration functions
    Router,
    /// Flat documentation manifest (`resource.go`)
    Manifest,
    /// Route table with live handler bindings (`IntRouterPaths.go`)
    RouteTable,
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "router" => Ok(ArtifactKind::Router),
            "resource" | "manifest" => Ok(ArtifactKind::Manifest),
            "route_table" => Ok(ArtifactKind::RouteTable),
            _ => Err(format!("Unknown artifact kind: {}", s)),
        }
    }
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Manifest => "resource",
            Self::RouteTable => "route_table",
        }
    }

    /// Name the template is registered under, and the file name a custom
    /// template directory must use to override it
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::Router => "router.go.tera",
            Self::Manifest => "resource.go.tera",
            Self::RouteTable => "route_table.go.tera",
        }
    }

    pub(crate) fn builtin_source(&self) -> &'static str {
        match self {
            Self::Router => include_str!("../../templates/gin/router.go.tera"),
            Self::Manifest => include_str!("../../templates/gin/resource.go.tera"),
            Self::RouteTable => include_str!("../../templates/gin/route_table.go.tera"),
        }
    }

    pub fn all() -> impl Iterator<Item = Self> {
        use ArtifactKind::*;
        [Router, Manifest, RouteTable].into_iter()
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
