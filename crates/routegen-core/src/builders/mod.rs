//! Template context builders for generated Go files.
pub mod gin;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::aggregate::RouteTable;
use crate::config::GenConfig;
use crate::resolver::{CachedResolver, PackageResolver};
use crate::templates::ArtifactKind;
use crate::utils::{go_ident, go_quote, last_segment};
use crate::Error;

/// Import path of the router package every registration file uses
pub const GIN_IMPORT: &str = "github.com/gin-gonic/gin";

/// Identifiers already bound in generated files
const RESERVED_ALIASES: &[&str] = &["gin", "r"];

/// One file to render
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub context: JsonValue,
}

/// Turns an aggregated route table into render-ready artifacts
pub trait ArtifactBuilder {
    fn build(&self, table: &RouteTable, packages: &PackageIndex) -> crate::Result<Vec<Artifact>>;
}

/// Builders for every artifact the configuration enables
pub fn builders_for(config: &GenConfig) -> Vec<Box<dyn ArtifactBuilder>> {
    let mut builders: Vec<Box<dyn ArtifactBuilder>> = vec![
        Box::new(gin::ManifestBuilder::new(
            config.manifest_path(),
            config.manifest_package(),
        )),
        Box::new(gin::RouterBuilder),
    ];
    if let (Some(dir), Some(path)) = (config.route_table_dir.as_deref(), config.route_table_path()) {
        builders.push(Box::new(gin::RouteTableBuilder::new(
            path,
            dir,
            go_ident(last_segment(dir)),
        )));
    }
    builders
}

/// Import paths of the destination directories of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageIndex {
    by_dir: BTreeMap<String, String>,
}

impl PackageIndex {
    /// Resolve every directory that receives registration calls.
    ///
    /// Each distinct directory hits the resolver once; the first failure
    /// aborts the run before anything is written.
    pub fn resolve<R: PackageResolver + ?Sized>(
        table: &RouteTable,
        resolver: &R,
    ) -> crate::Result<Self> {
        let resolver = CachedResolver::new(resolver);
        let mut index = Self::default();

        for group in table.groups() {
            if !group.routes.iter().any(|r| r.is_registrable()) {
                continue;
            }
            let dir = &group.destination.dir;
            let import_path = resolver.resolve(Path::new(dir))?;
            log::debug!("{} resolves to {}", dir, import_path);
            index.insert(dir.clone(), import_path);
        }

        Ok(index)
    }

    pub fn insert(&mut self, dir: impl Into<String>, import_path: impl Into<String>) {
        self.by_dir.insert(dir.into(), import_path.into());
    }

    pub fn get(&self, dir: &str) -> Option<&str> {
        self.by_dir.get(dir).map(String::as_str)
    }

    /// Import path of `dir`, which must have been resolved
    pub fn import_of(&self, dir: &str) -> crate::Result<&str> {
        self.get(dir)
            .ok_or_else(|| Error::resolution(dir, "directory was not resolved"))
    }
}

/// Split `pkg.Func` into its qualifier and symbol; bare names have none
pub fn split_handler(handler: &str) -> (Option<&str>, &str) {
    match handler.split_once('.') {
        Some((pkg, func)) if !pkg.is_empty() && !func.is_empty() => (Some(pkg), func),
        _ => (None, handler),
    }
}

/// Imports of one generated file, keyed by path
#[derive(Debug, Clone)]
pub struct ImportSet {
    /// Import path of the file's own package
    self_path: Option<String>,
    aliases: BTreeMap<String, String>,
    taken: HashSet<String>,
}

impl ImportSet {
    pub fn new(self_path: Option<&str>) -> Self {
        Self {
            self_path: self_path.map(String::from),
            aliases: BTreeMap::new(),
            taken: RESERVED_ALIASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Register `path` and return the identifier it is imported under
    pub fn alias(&mut self, path: &str) -> String {
        self.alias_as(path, last_segment(path))
    }

    /// Register `path` under a name derived from its package name.
    ///
    /// Needed when the package clause differs from the last path segment;
    /// [`lines`](Self::lines) then writes the alias explicitly.
    pub fn alias_as(&mut self, path: &str, package: &str) -> String {
        if path == GIN_IMPORT {
            return "gin".to_string();
        }
        if let Some(alias) = self.aliases.get(path) {
            return alias.clone();
        }

        let base = go_ident(package);
        let mut alias = base.clone();
        let mut n = 2;
        while self.taken.contains(&alias) {
            alias = format!("{}{}", base, n);
            n += 1;
        }

        self.taken.insert(alias.clone());
        self.aliases.insert(path.to_string(), alias.clone());
        alias
    }

    /// Reference `symbol` from the package at `path`.
    ///
    /// An empty path or the file's own import path yields the bare symbol.
    pub fn qualify(&mut self, path: &str, symbol: &str) -> String {
        if path.is_empty() || self.self_path.as_deref() == Some(path) {
            return symbol.to_string();
        }
        format!("{}.{}", self.alias(path), symbol)
    }

    /// Reference a route handler registered from the directory whose
    /// import path is `dir_import` and whose package clause is `package`.
    ///
    /// `pkg.Func` lives in the `pkg` subpackage of that directory; a bare
    /// name lives in the directory's own package.
    pub fn qualify_handler(&mut self, dir_import: &str, package: &str, handler: &str) -> String {
        match split_handler(handler) {
            (Some(pkg), func) => self.qualify(&format!("{}/{}", dir_import, pkg), func),
            (None, func) => {
                if self.self_path.as_deref() == Some(dir_import) {
                    return func.to_string();
                }
                format!("{}.{}", self.alias_as(dir_import, package), func)
            }
        }
    }

    /// Import lines, sorted by path, without the gin import
    pub fn lines(&self) -> Vec<String> {
        self.aliases
            .iter()
            .map(|(path, alias)| {
                if *alias == last_segment(path) {
                    go_quote(path)
                } else {
                    format!("{} {}", alias, go_quote(path))
                }
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Destination;
    use crate::routes::{HttpMethod, RouteDescriptor};
    use std::cell::RefCell;

    #[test]
    fn test_split_handler() {
        assert_eq!(split_handler("sub.Handler"), (Some("sub"), "Handler"));
        assert_eq!(split_handler("Handler"), (None, "Handler"));
        assert_eq!(split_handler("a.b.C"), (Some("a"), "b.C"));
        assert_eq!(split_handler(".Handler"), (None, ".Handler"));
    }

    #[test]
    fn test_qualify_handler() {
        let mut imports = ImportSet::new(Some("example.com/app/api"));
        assert_eq!(
            imports.qualify_handler("example.com/app/api", "api", "sub.Handler"),
            "sub.Handler"
        );
        assert_eq!(imports.qualify_handler("example.com/app/api", "api", "Local"), "Local");
        assert_eq!(imports.lines(), vec![r#""example.com/app/api/sub""#]);
    }

    #[test]
    fn test_qualify_handler_uses_package_clause() {
        let mut imports = ImportSet::new(None);
        assert_eq!(
            imports.qualify_handler("example.com/app/internal/api", "apiv1", "ListA"),
            "apiv1.ListA"
        );
        assert_eq!(
            imports.qualify_handler("example.com/app/internal/user", "user", "ListUsers"),
            "user.ListUsers"
        );
        assert_eq!(
            imports.lines(),
            vec![
                r#"apiv1 "example.com/app/internal/api""#,
                r#""example.com/app/internal/user""#,
            ]
        );
    }

    #[test]
    fn test_alias_deduplication() {
        let mut imports = ImportSet::new(None);
        assert_eq!(imports.alias("example.com/a/handler"), "handler");
        assert_eq!(imports.alias("example.com/b/handler"), "handler2");
        assert_eq!(imports.alias("example.com/a/handler"), "handler");
        assert_eq!(imports.alias("example.com/x/gin"), "gin2");
        assert_eq!(imports.alias("example.com/x/r"), "r2");
        assert_eq!(imports.alias(GIN_IMPORT), "gin");
        assert_eq!(imports.alias("github.com/go-redis/redis/v8"), "pkg_v8");

        assert_eq!(
            imports.lines(),
            vec![
                r#""example.com/a/handler""#,
                r#"handler2 "example.com/b/handler""#,
                r#"gin2 "example.com/x/gin""#,
                r#"r2 "example.com/x/r""#,
                r#"pkg_v8 "github.com/go-redis/redis/v8""#,
            ]
        );
    }

    #[test]
    fn test_qualify_empty_path_is_local() {
        let mut imports = ImportSet::new(None);
        assert_eq!(imports.qualify("", "Audit()"), "Audit()");
        assert!(imports.is_empty());
        assert_eq!(imports.qualify("auth", "JwtAuthMiddleware()"), "auth.JwtAuthMiddleware()");
        assert_eq!(imports.lines(), vec![r#""auth""#]);
    }

    struct Recording(RefCell<Vec<PathBuf>>);

    impl PackageResolver for Recording {
        fn resolve(&self, dir: &Path) -> crate::Result<String> {
            self.0.borrow_mut().push(dir.to_path_buf());
            Ok(format!("example.com/app/{}", dir.display()))
        }
    }

    fn route(path: &str, method: HttpMethod, dir: &str, module: &str) -> RouteDescriptor {
        RouteDescriptor {
            method,
            path: path.into(),
            handler: "H".into(),
            summary: String::new(),
            group: "unknown".into(),
            public: true,
            auth_chain: Default::default(),
            destination: Destination {
                dir: dir.into(),
                package: last_segment(dir).into(),
                module: module.into(),
            },
        }
    }

    #[test]
    fn test_package_index_resolves_each_dir_once() -> crate::Result<()> {
        let table = RouteTable::from_descriptors(vec![
            route("/a", HttpMethod::Get, "api", "user"),
            route("/b", HttpMethod::Get, "api", "admin"),
            route("/c", HttpMethod::Get, "other", ""),
            route("/d", HttpMethod::Unknown, "ghost", ""),
        ]);
        let resolver = Recording(RefCell::new(Vec::new()));

        let packages = PackageIndex::resolve(&table, &resolver)?;
        assert_eq!(packages.get("api"), Some("example.com/app/api"));
        assert_eq!(packages.import_of("other")?, "example.com/app/other");
        assert_eq!(packages.get("ghost"), None);
        assert!(packages.import_of("ghost").is_err());
        assert_eq!(
            resolver.0.into_inner(),
            vec![PathBuf::from("api"), PathBuf::from("other")]
        );
        Ok(())
    }
}
