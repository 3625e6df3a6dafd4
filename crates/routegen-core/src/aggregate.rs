//! Grouping of route descriptors by generated-file destination.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::handlers::HandlerIndex;
use crate::openapi::{OpenApiContext, SecurityRequirement};
use crate::routes::{group_of, join_base_path, select_operation, HttpMethod, RouteDescriptor};
use crate::security::SecurityPolicy;
use crate::utils::{to_snake_case, to_upper_camel_case};
use crate::Error;

/// Which handler-location fields identify a generated registration file
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GroupingKey {
    /// One file per (directory, package)
    Directory,
    /// One file per (directory, package, module)
    #[default]
    Module,
}

/// Target of one generated registration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Destination {
    pub dir: String,
    pub package: String,
    /// Empty when grouping by directory or when no module was declared
    pub module: String,
}

impl Destination {
    pub fn file_name(&self) -> String {
        if self.module.is_empty() {
            "router.go".to_string()
        } else {
            format!("{}_router.go", to_snake_case(&self.module))
        }
    }

    /// Full path of the registration file
    pub fn router_path(&self) -> PathBuf {
        Path::new(&self.dir).join(self.file_name())
    }

    /// Name of the function registering public routes
    pub fn public_fn(&self) -> String {
        format!("Init{}PublicRouter", to_upper_camel_case(&self.module))
    }

    /// Name of the function registering private routes
    pub fn private_fn(&self) -> String {
        format!("Init{}PrivateRouter", to_upper_camel_case(&self.module))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (package {}", self.dir, self.package)?;
        if !self.module.is_empty() {
            write!(f, ", module {}", self.module)?;
        }
        write!(f, ")")
    }
}

/// Routes sharing one destination, sorted by path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGroup {
    pub destination: Destination,
    pub routes: Vec<RouteDescriptor>,
}

impl RouteGroup {
    pub fn public_routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter().filter(|r| r.public)
    }

    pub fn private_routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter().filter(|r| !r.public)
    }
}

/// Options that shape descriptor construction
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub group_by: GroupingKey,
    /// Prefix applied to every path
    pub base_path: Option<String>,
}

/// All descriptors of a run, as a flat list and grouped by destination
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    groups: Vec<RouteGroup>,
}

impl RouteTable {
    /// Extract, resolve and group every path of the spec
    pub fn build(
        spec: &OpenApiContext,
        handlers: &HandlerIndex,
        policy: &SecurityPolicy,
        options: &AggregateOptions,
    ) -> crate::Result<Self> {
        let default_security = spec.default_security()?.unwrap_or_default();
        let mut descriptors = Vec::new();

        for (path, item) in spec.path_items()? {
            let (method, op) = select_operation(&item);

            let Some(location) = handlers.get(&path) else {
                if method == HttpMethod::Unknown {
                    log::warn!("{}: no operation and no handler location, skipping", path);
                    continue;
                }
                return Err(Error::config(format!(
                    "no handler location for {} {}",
                    method, path
                )));
            };

            let requirements: &[SecurityRequirement] = match op {
                Some(op) => op.security.as_deref().unwrap_or(&default_security),
                None => &[],
            };
            let security = policy.resolve(&path, requirements)?;

            let module = match options.group_by {
                GroupingKey::Directory => String::new(),
                GroupingKey::Module => location.module.clone().unwrap_or_default(),
            };

            descriptors.push(RouteDescriptor {
                method,
                path: join_base_path(options.base_path.as_deref(), &path),
                handler: location.handler.clone(),
                summary: op.and_then(|o| o.summary.clone()).unwrap_or_default(),
                group: group_of(op),
                public: security.public,
                auth_chain: security.chain,
                destination: Destination {
                    dir: location.dir.clone(),
                    package: location.package.clone(),
                    module,
                },
            });
        }

        Ok(Self::from_descriptors(descriptors))
    }

    /// Group descriptors by destination in first-seen order, then sort
    /// every list by path.
    pub fn from_descriptors(descriptors: Vec<RouteDescriptor>) -> Self {
        let mut groups: Vec<RouteGroup> = Vec::new();
        let mut index: HashMap<Destination, usize> = HashMap::new();

        for route in &descriptors {
            let slot = *index.entry(route.destination.clone()).or_insert_with(|| {
                groups.push(RouteGroup {
                    destination: route.destination.clone(),
                    routes: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].routes.push(route.clone());
        }

        for group in &mut groups {
            group.routes.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        }

        let mut routes = descriptors;
        routes.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        Self { routes, groups }
    }

    /// Flat list for the manifest, sorted by path
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn groups(&self) -> &[RouteGroup] {
        &self.groups
    }

    pub fn group(&self, destination: &Destination) -> Option<&RouteGroup> {
        self.groups.iter().find(|g| &g.destination == destination)
    }
}
