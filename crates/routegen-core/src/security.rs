//! Security requirement to middleware chain resolution.
//!
//! An operation's security decides two things: whether its route is public,
//! and which middleware is registered in front of its handler. Only the first
//! requirement of an operation is consulted; alternatives after it are ignored.
//! Within that requirement, scheme entries are visited in ascending name order
//! and the last entry that supplies a chain wins:
//!
//! - a scheme with a configured [`SecurityPreset`] (`auth` and `wx` by default)
//!   replaces the chain with the preset's chain;
//! - any other scheme with a non-empty parameter list replaces the chain with
//!   those parameters, read as `qualifier, symbol` pairs.
//!
//! A chain with an odd number of entries is rejected with
//! [`Error::Security`](crate::Error::Security).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_value::Value as SerdeValue;

use crate::openapi::SecurityRequirement;
use crate::Error;

/// Scheme name of the JWT + role check preset
pub const AUTH_SCHEME: &str = "auth";
/// Scheme name of the alternate login preset
pub const WX_SCHEME: &str = "wx";

/// A middleware expression qualified by the package that provides it.
///
/// `package` is an import path, or empty for a symbol that lives in the
/// destination package itself. `symbol` is emitted verbatim and may be a call
/// expression such as `JwtAuthMiddleware()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MiddlewareRef {
    pub package: String,
    pub symbol: String,
}

/// Ordered middleware inserted before a route's handler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChain {
    pub refs: Vec<MiddlewareRef>,
    /// Import paths referenced from inside symbol expressions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
}

impl AuthChain {
    /// Build a chain from alternating qualifier/symbol entries
    pub fn from_pairs(
        path: &str,
        scheme: &str,
        entries: &[String],
        imports: &[String],
    ) -> crate::Result<Self> {
        if entries.len() % 2 != 0 {
            return Err(Error::Security {
                path: path.to_string(),
                scheme: scheme.to_string(),
                len: entries.len(),
            });
        }

        let refs = entries
            .chunks_exact(2)
            .map(|pair| MiddlewareRef {
                package: pair[0].clone(),
                symbol: pair[1].clone(),
            })
            .collect();

        Ok(Self {
            refs,
            imports: imports.to_vec(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Number of middleware references
    pub fn len(&self) -> usize {
        self.refs.len()
    }
}

/// A named, fixed middleware chain selected by security scheme name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPreset {
    /// Alternating qualifier/symbol entries. Accepts a list or a single
    /// comma separated string.
    #[serde(deserialize_with = "deserialize_chain")]
    pub chain: Vec<String>,
    /// Extra imports the chain's symbol expressions refer to
    #[serde(default)]
    pub imports: Vec<String>,
}

/// Maps security requirements to middleware chains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    #[serde(default = "default_presets")]
    pub presets: BTreeMap<String, SecurityPreset>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            presets: default_presets(),
        }
    }
}

/// Outcome of resolving one operation's security
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSecurity {
    pub public: bool,
    pub chain: AuthChain,
}

impl SecurityPolicy {
    /// Resolve the security requirements of the operation at `path`
    pub fn resolve(
        &self,
        path: &str,
        requirements: &[SecurityRequirement],
    ) -> crate::Result<ResolvedSecurity> {
        let Some(first) = requirements.first() else {
            return Ok(ResolvedSecurity {
                public: true,
                chain: AuthChain::default(),
            });
        };

        if requirements.len() > 1 {
            log::debug!(
                "{}: {} alternative security requirements ignored",
                path,
                requirements.len() - 1
            );
        }

        let mut selected: Option<(&str, &[String], &[String])> = None;
        for (scheme, params) in first {
            if let Some(preset) = self.presets.get(scheme) {
                selected = Some((
                    scheme.as_str(),
                    preset.chain.as_slice(),
                    preset.imports.as_slice(),
                ));
            } else if !params.is_empty() {
                selected = Some((scheme.as_str(), params.as_slice(), &[][..]));
            }
        }

        let chain = match selected {
            Some((scheme, entries, imports)) => {
                AuthChain::from_pairs(path, scheme, entries, imports)?
            }
            None => AuthChain::default(),
        };

        Ok(ResolvedSecurity {
            public: false,
            chain,
        })
    }
}

fn default_presets() -> BTreeMap<String, SecurityPreset> {
    let mut presets = BTreeMap::new();
    presets.insert(
        AUTH_SCHEME.to_string(),
        SecurityPreset {
            chain: vec![
                "auth".into(),
                "JwtAuthMiddleware()".into(),
                "handler".into(),
                "AuthCheckRole(util.GetE())".into(),
            ],
            imports: vec!["util".into()],
        },
    );
    presets.insert(
        WX_SCHEME.to_string(),
        SecurityPreset {
            chain: vec!["auth".into(), "WeiXinAuth()".into()],
            imports: Vec::new(),
        },
    );
    presets
}

/// Split a comma separated chain, ignoring commas nested in parentheses
fn split_chain(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Helper function to deserialize either a comma separated string or a list of strings
fn deserialize_chain<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = SerdeValue::deserialize(deserializer)?;

    match value {
        SerdeValue::String(s) => Ok(split_chain(&s)),
        SerdeValue::Seq(seq) => {
            let mut result = Vec::new();
            for item in seq {
                if let SerdeValue::String(s) = item {
                    result.push(s);
                } else {
                    return Err(serde::de::Error::custom(
                        "Expected string or array of strings",
                    ));
                }
            }
            Ok(result)
        }
        _ => Err(serde::de::Error::custom(
            "Expected string or array of strings",
        )),
    }
}
