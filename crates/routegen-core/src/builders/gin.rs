//! gin-specific contexts: registration files, the manifest and the route table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{Artifact, ArtifactBuilder, ImportSet, PackageIndex};
use crate::aggregate::{Destination, RouteGroup, RouteTable};
use crate::routes::RouteDescriptor;
use crate::security::AuthChain;
use crate::templates::ArtifactKind;
use crate::utils::{go_ident, go_quote, last_segment};
use crate::Error;

/// One `r.METHOD(path, args...)` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationCall {
    pub method: &'static str,
    /// Quoted path literal
    pub path: String,
    /// Middleware references followed by the handler
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterContext {
    pub package: String,
    pub imports: Vec<String>,
    pub public_fn: String,
    pub private_fn: String,
    pub public_calls: Vec<RegistrationCall>,
    pub private_calls: Vec<RegistrationCall>,
}

/// Entry of `GetRouteInfos()`, every field already a Go literal
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub method: String,
    pub path: String,
    pub handler: String,
    pub summary: String,
    pub public: bool,
    pub group: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestContext {
    pub package: String,
    pub routes: Vec<ManifestEntry>,
}

/// Entry of `IntRouterPaths()`
#[derive(Debug, Clone, Serialize)]
pub struct RouteTableEntry {
    pub method: String,
    pub path: String,
    pub fun: String,
    pub remarks: String,
    pub auth: bool,
    pub auth_handlers: Vec<String>,
    pub menu_items: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteTableContext {
    pub package: String,
    pub imports: Vec<String>,
    pub routes: Vec<RouteTableEntry>,
}

/// Bind the imports named inside chain symbols before any handler import.
///
/// Those symbols carry their qualifier verbatim (`util.GetE()`), so each
/// import must get exactly its own package name.
fn reserve_chain_imports<'a>(
    imports: &mut ImportSet,
    routes: impl IntoIterator<Item = &'a RouteDescriptor>,
) -> crate::Result<()> {
    for route in routes {
        if route.public || !route.is_registrable() {
            continue;
        }
        for path in &route.auth_chain.imports {
            let expected = go_ident(last_segment(path));
            let alias = imports.alias(path);
            if alias != expected {
                return Err(Error::config(format!(
                    "{}: middleware refers to {} as '{}', but that name is already imported",
                    route.path, path, expected
                )));
            }
        }
    }
    Ok(())
}

/// Middleware references of a chain, registering its imports
fn chain_args(imports: &mut ImportSet, chain: &AuthChain) -> Vec<String> {
    for extra in &chain.imports {
        imports.alias(extra);
    }
    chain
        .refs
        .iter()
        .map(|r| imports.qualify(&r.package, &r.symbol))
        .collect()
}

/// Registration call for one route, `None` when it has no router method
fn registration_call(
    imports: &mut ImportSet,
    dir_import: &str,
    route: &RouteDescriptor,
) -> Option<RegistrationCall> {
    let method = route.method.router_fn()?;
    let mut args = if route.public {
        Vec::new()
    } else {
        chain_args(imports, &route.auth_chain)
    };
    args.push(imports.qualify_handler(
        dir_import,
        &route.destination.package,
        &route.handler,
    ));

    Some(RegistrationCall {
        method,
        path: go_quote(&route.path),
        args,
    })
}

/// Build the registration file context of one destination
pub fn router_context(group: &RouteGroup, dir_import: &str) -> crate::Result<RouterContext> {
    let mut imports = ImportSet::new(Some(dir_import));
    reserve_chain_imports(&mut imports, &group.routes)?;
    let mut public_calls = Vec::new();
    let mut private_calls = Vec::new();

    for route in &group.routes {
        match registration_call(&mut imports, dir_import, route) {
            Some(call) if route.public => public_calls.push(call),
            Some(call) => private_calls.push(call),
            None => log::debug!("{}: method unknown, not registered", route.path),
        }
    }

    Ok(RouterContext {
        package: group.destination.package.clone(),
        imports: imports.lines(),
        public_fn: group.destination.public_fn(),
        private_fn: group.destination.private_fn(),
        public_calls,
        private_calls,
    })
}

/// One registration file per destination
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterBuilder;

impl ArtifactBuilder for RouterBuilder {
    fn build(&self, table: &RouteTable, packages: &PackageIndex) -> crate::Result<Vec<Artifact>> {
        let mut artifacts = Vec::new();
        let mut claimed: HashMap<PathBuf, &Destination> = HashMap::new();
        for group in table.groups() {
            if !group.routes.iter().any(RouteDescriptor::is_registrable) {
                log::warn!(
                    "{}: no registrable routes, skipping",
                    group.destination.router_path().display()
                );
                continue;
            }
            let path = group.destination.router_path();
            if let Some(other) = claimed.insert(path.clone(), &group.destination) {
                return Err(Error::config(format!(
                    "destinations {} and {} both generate {}",
                    other,
                    group.destination,
                    path.display()
                )));
            }
            let dir_import = packages.import_of(&group.destination.dir)?;
            let context = router_context(group, dir_import)?;
            artifacts.push(Artifact {
                kind: ArtifactKind::Router,
                path,
                context: serde_json::to_value(context)?,
            });
        }
        Ok(artifacts)
    }
}

/// The documentation manifest
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    path: PathBuf,
    package: String,
}

impl ManifestBuilder {
    pub fn new(path: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            package: package.into(),
        }
    }

    pub fn context(&self, table: &RouteTable) -> ManifestContext {
        ManifestContext {
            package: self.package.clone(),
            routes: table
                .routes()
                .iter()
                .map(|route| ManifestEntry {
                    method: go_quote(route.method.as_str()),
                    path: go_quote(&route.path),
                    handler: go_quote(&route.handler),
                    summary: go_quote(&route.summary),
                    public: route.public,
                    group: go_quote(&route.group),
                })
                .collect(),
        }
    }
}

impl ArtifactBuilder for ManifestBuilder {
    fn build(&self, table: &RouteTable, _packages: &PackageIndex) -> crate::Result<Vec<Artifact>> {
        Ok(vec![Artifact {
            kind: ArtifactKind::Manifest,
            path: self.path.clone(),
            context: serde_json::to_value(self.context(table))?,
        }])
    }
}

/// The route table with live handler bindings
#[derive(Debug, Clone)]
pub struct RouteTableBuilder {
    path: PathBuf,
    dir: String,
    package: String,
}

impl RouteTableBuilder {
    pub fn new(path: impl Into<PathBuf>, dir: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dir: dir.into(),
            package: package.into(),
        }
    }

    pub fn context(
        &self,
        table: &RouteTable,
        packages: &PackageIndex,
    ) -> crate::Result<RouteTableContext> {
        // Local to the table only when it shares a directory with handlers
        let mut imports = ImportSet::new(packages.get(&self.dir));
        reserve_chain_imports(&mut imports, table.routes())?;
        let mut routes = Vec::new();

        for route in table.routes().iter().filter(|r| r.is_registrable()) {
            let dir_import = packages.import_of(&route.destination.dir)?;
            let auth_handlers = if route.public {
                Vec::new()
            } else {
                chain_args(&mut imports, &route.auth_chain)
            };
            routes.push(RouteTableEntry {
                method: go_quote(route.method.as_str()),
                path: go_quote(&route.path),
                fun: imports.qualify_handler(
                    dir_import,
                    &route.destination.package,
                    &route.handler,
                ),
                remarks: go_quote(&route.summary),
                auth: !route.public,
                auth_handlers,
                menu_items: go_quote(&route.group),
            });
        }

        Ok(RouteTableContext {
            package: self.package.clone(),
            imports: imports.lines(),
            routes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactBuilder for RouteTableBuilder {
    fn build(&self, table: &RouteTable, packages: &PackageIndex) -> crate::Result<Vec<Artifact>> {
        Ok(vec![Artifact {
            kind: ArtifactKind::RouteTable,
            path: self.path.clone(),
            context: serde_json::to_value(self.context(table, packages)?)?,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Destination;
    use crate::routes::HttpMethod;
    use crate::security::{AuthChain, SecurityPolicy};

    fn dest() -> Destination {
        Destination {
            dir: "internal/api".into(),
            package: "api".into(),
            module: String::new(),
        }
    }

    fn route(method: HttpMethod, path: &str, handler: &str, chain: AuthChain) -> RouteDescriptor {
        RouteDescriptor {
            method,
            path: path.into(),
            handler: handler.into(),
            summary: format!("{} summary", path),
            group: "x".into(),
            public: chain.is_empty(),
            auth_chain: chain,
            destination: dest(),
        }
    }

    fn auth_chain() -> AuthChain {
        let policy = SecurityPolicy::default();
        let preset = &policy.presets["auth"];
        AuthChain::from_pairs("/b", "auth", &preset.chain, &preset.imports).unwrap()
    }

    fn packages() -> PackageIndex {
        let mut packages = PackageIndex::default();
        packages.insert("internal/api", "example.com/app/internal/api");
        packages
    }

    #[test]
    fn test_router_context_partitions_calls() {
        let table = RouteTable::from_descriptors(vec![
            route(HttpMethod::Post, "/b", "CreateB", auth_chain()),
            route(HttpMethod::Get, "/a", "sub.ListA", AuthChain::default()),
            route(HttpMethod::Unknown, "/c", "C", AuthChain::default()),
        ]);
        let ctx = router_context(&table.groups()[0], "example.com/app/internal/api").unwrap();

        assert_eq!(ctx.package, "api");
        assert_eq!(
            ctx.public_calls,
            vec![RegistrationCall {
                method: "GET",
                path: "\"/a\"".into(),
                args: vec!["sub.ListA".into()],
            }]
        );
        assert_eq!(
            ctx.private_calls,
            vec![RegistrationCall {
                method: "POST",
                path: "\"/b\"".into(),
                args: vec![
                    "auth.JwtAuthMiddleware()".into(),
                    "handler.AuthCheckRole(util.GetE())".into(),
                    "CreateB".into(),
                ],
            }]
        );
        assert_eq!(
            ctx.imports,
            vec![
                r#""auth""#.to_string(),
                r#""example.com/app/internal/api/sub""#.to_string(),
                r#""handler""#.to_string(),
                r#""util""#.to_string(),
            ]
        );
    }

    #[test]
    fn test_router_builder_requires_resolved_dir() {
        let table = RouteTable::from_descriptors(vec![route(
            HttpMethod::Get,
            "/a",
            "A",
            AuthChain::default(),
        )]);
        let result = RouterBuilder.build(&table, &PackageIndex::default());
        assert!(matches!(result, Err(crate::Error::PackageResolution { .. })));
    }

    #[test]
    fn test_router_builder_skips_unknown_only_groups() -> crate::Result<()> {
        let table = RouteTable::from_descriptors(vec![route(
            HttpMethod::Unknown,
            "/ghost",
            "Ghost",
            AuthChain::default(),
        )]);
        assert!(RouterBuilder.build(&table, &PackageIndex::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_chain_imports_keep_their_name() -> crate::Result<()> {
        // The handler subpackage would otherwise take `util` first
        let table = RouteTable::from_descriptors(vec![
            route(HttpMethod::Get, "/a", "util.Ping", AuthChain::default()),
            route(HttpMethod::Post, "/b", "CreateB", auth_chain()),
        ]);
        let ctx = router_context(&table.groups()[0], "example.com/app/internal/api")?;

        assert_eq!(ctx.public_calls[0].args, vec!["util2.Ping".to_string()]);
        assert_eq!(ctx.private_calls[0].args[1], "handler.AuthCheckRole(util.GetE())");
        assert!(ctx.imports.contains(&r#"util2 "example.com/app/internal/api/util""#.to_string()));
        assert!(ctx.imports.contains(&r#""util""#.to_string()));
        Ok(())
    }

    #[test]
    fn test_clashing_chain_imports_are_rejected() {
        let chain = AuthChain::from_pairs(
            "/b",
            "custom",
            &["auth".into(), "Check(util.GetE())".into()],
            &["util".into(), "example.com/legacy/util".into()],
        )
        .unwrap();
        let table = RouteTable::from_descriptors(vec![route(HttpMethod::Post, "/b", "B", chain)]);

        let err = router_context(&table.groups()[0], "example.com/app/internal/api").unwrap_err();
        assert!(matches!(err, crate::Error::Config(ref msg) if msg.contains("example.com/legacy/util")));
    }

    #[test]
    fn test_router_builder_rejects_shared_file() {
        let mut first = route(HttpMethod::Get, "/a", "A", AuthChain::default());
        first.destination.module = "UserAdmin".into();
        let mut second = route(HttpMethod::Get, "/b", "B", AuthChain::default());
        second.destination.module = "user_admin".into();
        let table = RouteTable::from_descriptors(vec![first, second]);

        let err = RouterBuilder.build(&table, &packages()).unwrap_err();
        match err {
            crate::Error::Config(msg) => {
                assert!(msg.contains("UserAdmin"));
                assert!(msg.contains("user_admin"));
                assert!(msg.contains("user_admin_router.go"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_manifest_context_quotes_fields() {
        let mut odd = route(HttpMethod::Get, "/q", "Q", AuthChain::default());
        odd.summary = "say \"hi\"".into();
        let table = RouteTable::from_descriptors(vec![
            odd,
            route(HttpMethod::Unknown, "/u", "U", AuthChain::default()),
        ]);

        let ctx = ManifestBuilder::new("docs/resource.go", "docs").context(&table);
        assert_eq!(ctx.routes.len(), 2);
        assert_eq!(ctx.routes[0].summary, r#""say \"hi\"""#);
        assert_eq!(ctx.routes[0].handler, r#""Q""#);
        assert_eq!(ctx.routes[1].method, r#""UNKNOWN""#);
    }

    #[test]
    fn test_route_table_qualifies_local_handlers() -> crate::Result<()> {
        let table = RouteTable::from_descriptors(vec![
            route(HttpMethod::Get, "/a", "ListA", AuthChain::default()),
            route(HttpMethod::Post, "/b", "sub.CreateB", auth_chain()),
        ]);
        let builder = RouteTableBuilder::new("internal/router/IntRouterPaths.go", "internal/router", "router");
        let ctx = builder.context(&table, &packages())?;

        assert_eq!(ctx.routes[0].fun, "api.ListA");
        assert!(!ctx.routes[0].auth);
        assert_eq!(ctx.routes[1].fun, "sub.CreateB");
        assert!(ctx.routes[1].auth);
        assert_eq!(ctx.routes[1].auth_handlers.len(), 2);
        assert!(ctx.imports.contains(&r#""example.com/app/internal/api""#.to_string()));
        assert!(ctx.imports.contains(&r#""example.com/app/internal/api/sub""#.to_string()));
        assert_eq!(builder.path(), Path::new("internal/router/IntRouterPaths.go"));
        Ok(())
    }
}
