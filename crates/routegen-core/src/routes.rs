//! Route descriptors and per-path operation selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregate::Destination;
use crate::openapi::{Operation, PathItem};
use crate::security::AuthChain;

/// Group name used when an operation declares no tags
pub const UNKNOWN_GROUP: &str = "unknown";

/// HTTP methods a route can be registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    /// No operation was declared on the path
    Unknown,
}

impl HttpMethod {
    /// Selection precedence when a path item declares several operations
    pub const PRECEDENCE: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Router method used to register this verb, `None` for `Unknown`
    pub fn router_fn(&self) -> Option<&'static str> {
        match self {
            Self::Unknown => None,
            known => Some(known.as_str()),
        }
    }

    fn slot<'a>(&self, item: &'a PathItem) -> Option<&'a Operation> {
        match self {
            Self::Get => item.get.as_ref(),
            Self::Post => item.post.as_ref(),
            Self::Put => item.put.as_ref(),
            Self::Delete => item.delete.as_ref(),
            Self::Head => item.head.as_ref(),
            Self::Options => item.options.as_ref(),
            Self::Patch => item.patch.as_ref(),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH" => Ok(Self::Patch),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(format!("Unknown HTTP method: {}", s)),
        }
    }
}

/// Pick the single operation a path item registers.
///
/// The first populated slot in [`HttpMethod::PRECEDENCE`] wins; an empty
/// path item yields `(Unknown, None)`.
pub fn select_operation(item: &PathItem) -> (HttpMethod, Option<&Operation>) {
    let mut present = HttpMethod::PRECEDENCE
        .into_iter()
        .filter_map(|m| m.slot(item).map(|op| (m, op)));

    match present.next() {
        Some((method, op)) => {
            let ignored: Vec<_> = present.map(|(m, _)| m.as_str()).collect();
            if !ignored.is_empty() {
                log::debug!(
                    "path item declares several methods, registering {} and ignoring {}",
                    method,
                    ignored.join(", ")
                );
            }
            (method, Some(op))
        }
        None => (HttpMethod::Unknown, None),
    }
}

/// One route to document and register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub method: HttpMethod,
    /// Path template, base path already applied
    pub path: String,
    /// Dotted package-qualified or bare handler function name
    pub handler: String,
    pub summary: String,
    /// First declared tag, or [`UNKNOWN_GROUP`]
    pub group: String,
    pub public: bool,
    #[serde(skip_serializing_if = "AuthChain::is_empty", default)]
    pub auth_chain: AuthChain,
    #[serde(skip)]
    pub destination: Destination,
}

impl RouteDescriptor {
    /// Whether the route produces a registration call
    pub fn is_registrable(&self) -> bool {
        self.method.router_fn().is_some()
    }

    /// Ordering key used for every emitted list
    pub(crate) fn sort_key(&self) -> (&str, HttpMethod) {
        (self.path.as_str(), self.method)
    }
}

/// Group label for an operation
pub fn group_of(op: Option<&Operation>) -> String {
    op.and_then(|o| o.tags.first())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_GROUP.to_string())
}

/// Join a base path and a path template without doubling slashes
pub fn join_base_path(base: Option<&str>, path: &str) -> String {
    match base.map(|b| b.trim_end_matches('/')) {
        Some(b) if !b.is_empty() => {
            if path.starts_with('/') {
                format!("{}{}", b, path)
            } else {
                format!("{}/{}", b, path)
            }
        }
        _ => path.to_string(),
    }
}
