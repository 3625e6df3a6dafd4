//! Directory to Go import path resolution.
//!
//! The generator never guesses import paths itself. A [`PackageResolver`]
//! is handed in by the caller: [`GoListResolver`] asks the Go toolchain,
//! [`ModuleRootResolver`] derives the path from a module name without a
//! toolchain, and tests supply their own fakes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use crate::Error;

/// Capability that maps a package directory to its import path
pub trait PackageResolver {
    fn resolve(&self, dir: &Path) -> crate::Result<String>;
}

impl<R: PackageResolver + ?Sized> PackageResolver for &R {
    fn resolve(&self, dir: &Path) -> crate::Result<String> {
        (**self).resolve(dir)
    }
}

impl<R: PackageResolver + ?Sized> PackageResolver for Box<R> {
    fn resolve(&self, dir: &Path) -> crate::Result<String> {
        (**self).resolve(dir)
    }
}

/// Workspace root used when `$GOPATH` is unset
pub fn default_gopath() -> Option<PathBuf> {
    std::env::var_os("GOPATH")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join("go")))
}

/// Clean up raw resolver output.
///
/// Keeps the first line, strips the `_<gopath>/src/` prefix reported for
/// packages outside module mode and converts backslashes to slashes.
pub fn normalize_import_path(raw: &str, gopath: Option<&Path>) -> String {
    let mut out = raw.lines().next().unwrap_or_default().trim().to_string();

    if out.starts_with('_') {
        if let Some(gopath) = gopath {
            let root = gopath.to_string_lossy().replace('\\', "/");
            let prefix = format!("_{}/src/", root.trim_end_matches('/'));
            if let Some(rest) = out.strip_prefix(&prefix) {
                out = rest.to_string();
            }
        }
    }

    out.replace('\\', "/")
}

/// Runs `go list -f={{.ImportPath}}` inside the directory
#[derive(Debug, Clone, Default)]
pub struct GoListResolver {
    gopath: Option<PathBuf>,
}

impl GoListResolver {
    pub fn new(gopath: Option<PathBuf>) -> Self {
        Self { gopath }
    }
}

impl PackageResolver for GoListResolver {
    fn resolve(&self, dir: &Path) -> crate::Result<String> {
        log::debug!("running go list in {}", dir.display());

        let output = Command::new("go")
            .arg("list")
            .arg("-f={{.ImportPath}}")
            .current_dir(dir)
            .output()
            .map_err(|e| Error::resolution(dir, format!("failed to run go list: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(Error::PackageResolution {
                dir: dir.to_path_buf(),
                reason: format!("go list exited with {}", output.status),
                stdout,
                stderr,
            });
        }

        let import_path = normalize_import_path(&stdout, self.gopath.as_deref());
        if import_path.is_empty() {
            return Err(Error::PackageResolution {
                dir: dir.to_path_buf(),
                reason: "go list printed no import path".to_string(),
                stdout,
                stderr,
            });
        }
        Ok(import_path)
    }
}

/// Derives `<module>/<dir relative to root>` lexically
#[derive(Debug, Clone)]
pub struct ModuleRootResolver {
    module: String,
    root: PathBuf,
}

impl ModuleRootResolver {
    pub fn new(module: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            module: module.into().trim_end_matches('/').to_string(),
            root: root.into(),
        }
    }
}

impl PackageResolver for ModuleRootResolver {
    fn resolve(&self, dir: &Path) -> crate::Result<String> {
        let relative = if dir.is_absolute() {
            dir.strip_prefix(&self.root).map_err(|_| {
                Error::resolution(
                    dir,
                    format!("outside of module root {}", self.root.display()),
                )
            })?
        } else {
            dir
        };

        let mut segments = vec![self.module.clone()];
        for component in relative.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                Component::ParentDir => {
                    if segments.len() == 1 {
                        return Err(Error::resolution(dir, "escapes the module root"));
                    }
                    segments.pop();
                }
                Component::RootDir | Component::Prefix(_) => {}
            }
        }

        Ok(normalize_import_path(&segments.join("/"), None))
    }
}

/// Memoizes another resolver for the duration of one run
pub struct CachedResolver<R> {
    inner: R,
    cache: RefCell<HashMap<PathBuf, String>>,
}

impl<R: PackageResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Number of directories resolved so far
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<R: PackageResolver> PackageResolver for CachedResolver<R> {
    fn resolve(&self, dir: &Path) -> crate::Result<String> {
        if let Some(hit) = self.cache.borrow().get(dir) {
            return Ok(hit.clone());
        }
        let resolved = self.inner.resolve(dir)?;
        self.cache
            .borrow_mut()
            .insert(dir.to_path_buf(), resolved.clone());
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counting<'a>(&'a Cell<usize>);

    impl PackageResolver for Counting<'_> {
        fn resolve(&self, dir: &Path) -> crate::Result<String> {
            self.0.set(self.0.get() + 1);
            Ok(format!("example.com/app/{}", dir.display()))
        }
    }

    #[test]
    fn test_normalize_first_line() {
        assert_eq!(
            normalize_import_path("example.com/app/api\nexample.com/app/api_test\n", None),
            "example.com/app/api"
        );
        assert_eq!(normalize_import_path("", None), "");
    }

    #[test]
    fn test_normalize_gopath_prefix() {
        let gopath = Path::new("/home/dev/go");
        assert_eq!(
            normalize_import_path("_/home/dev/go/src/shop/api\n", Some(gopath)),
            "shop/api"
        );
        // Unrelated leading underscore stays
        assert_eq!(
            normalize_import_path("_/opt/other/api", Some(gopath)),
            "_/opt/other/api"
        );
    }

    #[test]
    fn test_normalize_backslashes() {
        assert_eq!(
            normalize_import_path(r"shop\internal\api", None),
            "shop/internal/api"
        );
    }

    #[test]
    fn test_module_root_resolver() -> crate::Result<()> {
        let resolver = ModuleRootResolver::new("github.com/acme/shop/", "/src/shop");
        assert_eq!(
            resolver.resolve(Path::new("internal/api"))?,
            "github.com/acme/shop/internal/api"
        );
        assert_eq!(
            resolver.resolve(Path::new("/src/shop/internal/user"))?,
            "github.com/acme/shop/internal/user"
        );
        assert_eq!(
            resolver.resolve(Path::new("./internal/../pkg"))?,
            "github.com/acme/shop/pkg"
        );
        assert_eq!(resolver.resolve(Path::new("."))?, "github.com/acme/shop");
        Ok(())
    }

    #[test]
    fn test_module_root_resolver_rejects_outside() {
        let resolver = ModuleRootResolver::new("shop", "/src/shop");
        assert!(matches!(
            resolver.resolve(Path::new("/elsewhere/api")),
            Err(Error::PackageResolution { .. })
        ));
        assert!(resolver.resolve(Path::new("../api")).is_err());
    }

    #[test]
    fn test_cached_resolver_calls_once_per_dir() -> crate::Result<()> {
        let calls = Cell::new(0);
        let resolver = CachedResolver::new(Counting(&calls));

        assert_eq!(resolver.resolve(Path::new("api"))?, "example.com/app/api");
        assert_eq!(resolver.resolve(Path::new("api"))?, "example.com/app/api");
        resolver.resolve(Path::new("user"))?;

        assert_eq!(calls.get(), 2);
        assert_eq!(resolver.cached(), 2);
        Ok(())
    }

    #[test]
    fn test_go_list_missing_dir_is_resolution_error() {
        let resolver = GoListResolver::new(None);
        let err = resolver
            .resolve(Path::new("/definitely/not/a/real/dir"))
            .unwrap_err();
        assert!(matches!(err, Error::PackageResolution { .. }));
    }
}
