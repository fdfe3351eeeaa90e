//! `node_modules` package resolution.
//!
//! ## Specifier Types
//!
//! - Relative: `./utils`, `../lib/foo`
//! - Absolute: `/abs/path/to/module`
//! - Bare: `lodash`, `@scope/pkg`, `react-native/Libraries/x`
//! - Built-in: `fs`, `node:path` (returned unchanged)

use super::{dir_exists, file_exists, ManifestFilter, PackageResolver, ResolveError};
use crate::descriptor::{PackageDescriptor, DESCRIPTOR_FILE};
use crate::tables::DEFAULT_CONTAINER_DIR;
use std::path::{Path, PathBuf};
use sugar_path::SugarPath;
use tracing::trace;

const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".json"];

const BUILTIN_MODULES: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Whether `name` is a Node built-in module.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    name.starts_with("node:") || BUILTIN_MODULES.contains(&name)
}

/// Resolves package names by walking `node_modules` directories upward from
/// the requesting file.
#[derive(Debug, Clone)]
pub struct NodeModulesResolver {
    /// Descriptor fields consulted for a package's entry, in order.
    entry_fields: Vec<String>,
    extensions: Vec<String>,
    container: String,
}

impl Default for NodeModulesResolver {
    fn default() -> Self {
        Self::new("react-native")
    }
}

impl NodeModulesResolver {
    /// Create a resolver preferring `platform_field`, then `browser`, then `main`.
    #[must_use]
    pub fn new(platform_field: &str) -> Self {
        let mut entry_fields = vec![platform_field.to_string()];
        for field in ["browser", "main"] {
            if !entry_fields.iter().any(|f| f == field) {
                entry_fields.push(field.to_string());
            }
        }
        Self {
            entry_fields,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            container: DEFAULT_CONTAINER_DIR.to_string(),
        }
    }

    /// Use a different dependency container directory name.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    fn is_container(&self, dir: &Path) -> bool {
        dir.file_name().and_then(|n| n.to_str()) == Some(self.container.as_str())
    }

    async fn resolve_bare(&self, specifier: &str, from: &Path) -> Option<PathBuf> {
        let (pkg_name, subpath) = parse_bare_specifier(specifier);

        let mut current = from.parent();
        while let Some(dir) = current {
            // `node_modules/node_modules` is never a lookup location.
            if !self.is_container(dir) {
                let pkg_dir = dir.join(&self.container).join(pkg_name);
                if dir_exists(&pkg_dir).await {
                    trace!(package = pkg_name, dir = %pkg_dir.display(), "found package directory");
                    let found = match subpath {
                        Some(sub) => self.resolve_file_or_directory(&pkg_dir.join(sub)).await,
                        None => self.resolve_package_entry(&pkg_dir).await,
                    };
                    if found.is_some() {
                        return found;
                    }
                }
            }
            current = dir.parent();
        }
        None
    }

    async fn resolve_package_entry(&self, pkg_dir: &Path) -> Option<PathBuf> {
        if let Some(descriptor) = read_descriptor(&pkg_dir.join(DESCRIPTOR_FILE)).await {
            if let Some(entry) = descriptor.entry(&self.entry_fields) {
                if let Some(found) = self.resolve_file_or_directory(&pkg_dir.join(entry)).await {
                    return Some(found);
                }
            }
        }
        self.resolve_index(pkg_dir).await
    }

    async fn resolve_file_or_directory(&self, target: &Path) -> Option<PathBuf> {
        let target = target.normalize();
        if file_exists(&target).await {
            return Some(target);
        }

        for ext in &self.extensions {
            let with_ext = PathBuf::from(format!("{}{ext}", target.display()));
            if file_exists(&with_ext).await {
                return Some(with_ext);
            }
        }

        if dir_exists(&target).await {
            return self.resolve_index(&target).await;
        }
        None
    }

    async fn resolve_index(&self, dir: &Path) -> Option<PathBuf> {
        for ext in &self.extensions {
            let index = dir.join(format!("index{ext}"));
            if file_exists(&index).await {
                return Some(index);
            }
        }
        None
    }

    /// Report the nearest named descriptor above `file` to `on_manifest`.
    async fn report_owner(
        &self,
        file: &Path,
        on_manifest: &mut ManifestFilter<'_>,
    ) -> Result<(), ResolveError> {
        let mut current = file.parent();
        while let Some(dir) = current {
            if self.is_container(dir) {
                break;
            }
            let path = dir.join(DESCRIPTOR_FILE);
            if file_exists(&path).await {
                let descriptor = PackageDescriptor::load(&path).await.map_err(|e| {
                    ResolveError::Manifest {
                        path: path.clone(),
                        message: e.to_string(),
                    }
                })?;
                if descriptor.name.is_some() {
                    on_manifest(&descriptor, dir);
                    return Ok(());
                }
            }
            current = dir.parent();
        }
        Ok(())
    }
}

impl PackageResolver for NodeModulesResolver {
    async fn resolve(
        &self,
        name: &str,
        from: &Path,
        on_manifest: &mut ManifestFilter<'_>,
    ) -> Result<PathBuf, ResolveError> {
        if is_builtin(name) {
            return Ok(PathBuf::from(name));
        }

        let is_path = name.starts_with("./") || name.starts_with("../") || name.starts_with('/');
        let found = if is_path {
            let base = from.parent().unwrap_or(Path::new("."));
            self.resolve_file_or_directory(&base.join(name)).await
        } else {
            self.resolve_bare(name, from).await
        };

        let Some(file) = found else {
            return Err(ResolveError::NotFound {
                name: name.to_string(),
                from: from.to_path_buf(),
            });
        };

        self.report_owner(&file, on_manifest).await?;
        Ok(file)
    }
}

async fn read_descriptor(path: &Path) -> Option<PackageDescriptor> {
    PackageDescriptor::load(path).await.ok()
}

/// Split a bare specifier into package name and subpath.
fn parse_bare_specifier(specifier: &str) -> (&str, Option<&str>) {
    let split_at = if specifier.starts_with('@') {
        specifier
            .match_indices('/')
            .nth(1)
            .map(|(idx, _)| idx)
    } else {
        specifier.find('/')
    };

    match split_at {
        Some(idx) => (&specifier[..idx], Some(&specifier[idx + 1..])),
        None => (specifier, None),
    }
}
