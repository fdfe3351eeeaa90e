//! Package resolver adapter.
//!
//! Wraps a [`PackageResolver`] and records what each successful resolution
//! says about the package it landed in. A [`ResolutionSession`] lives for one
//! bundling invocation; its tables are handed to the config emitter at the end.

use crate::descriptor::PackageDescriptor;
use crate::file_url::relative_url;
use crate::resolve::{PackageResolver, ResolveError};
use crate::tables::{PackageSpec, ResolutionTables, DEFAULT_CONTAINER_DIR};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tracing::debug;

/// State of one bundling session.
///
/// Tables sit behind a `RefCell`: the session is driven from a single task
/// and no borrow is held across an await point.
#[derive(Debug)]
pub struct ResolutionSession<R> {
    base_dir: PathBuf,
    container: String,
    resolver: R,
    tables: RefCell<ResolutionTables>,
}

impl<R: PackageResolver> ResolutionSession<R> {
    /// Create an empty session rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, resolver: R) -> Self {
        Self {
            base_dir: base_dir.into(),
            container: DEFAULT_CONTAINER_DIR.to_string(),
            resolver,
            tables: RefCell::new(ResolutionTables::new()),
        }
    }

    /// Group packages by a different container directory name.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `name` as a dependency package on behalf of `requesting_path`.
    ///
    /// Returns the resolved file relative to the base directory, URL-encoded.
    /// Built-ins fail with [`ResolveError::InternalModule`] and are not
    /// recorded. Files owned by the base package itself resolve but are not
    /// recorded either.
    pub async fn resolve_package(
        &self,
        name: &str,
        requesting_path: &Path,
    ) -> Result<String, ResolveError> {
        let mut declaring: Option<(Option<String>, PathBuf)> = None;
        let resolved = self
            .resolver
            .resolve(name, requesting_path, &mut |descriptor: &PackageDescriptor, dir: &Path| {
                declaring = Some((descriptor.name.clone(), dir.to_path_buf()));
            })
            .await?;

        if resolved.as_os_str() == name {
            return Err(ResolveError::InternalModule {
                name: name.to_string(),
            });
        }

        let (declared_name, root) = declaring.unwrap_or_else(|| {
            let parent = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
            (None, parent)
        });

        let root_path = relative_url(&self.base_dir, &root);
        if root_path.is_empty() {
            debug!(name, "resolved inside the base package");
            return Ok(relative_url(&self.base_dir, &resolved));
        }

        let spec = PackageSpec {
            root_path,
            entry_path: (declared_name.as_deref() == Some(name))
                .then(|| relative_url(&root, &resolved)),
        };
        debug!(
            package = name,
            root = %spec.root_path,
            entry = spec.entry_path.as_deref().unwrap_or("-"),
            "recorded package"
        );
        self.tables
            .borrow_mut()
            .record_package(name, spec, &self.container);

        Ok(relative_url(&self.base_dir, &resolved))
    }
}

impl<R> ResolutionSession<R> {
    /// Record a load-time rewrite from one relative path to another.
    pub fn record_fix(&self, from: String, to: String) {
        self.tables.borrow_mut().record_fix(from, to);
    }

    /// Copy of the tables accumulated so far.
    pub fn snapshot(&self) -> ResolutionTables {
        self.tables.borrow().clone()
    }

    /// Finish the session and take its tables.
    pub fn into_tables(self) -> ResolutionTables {
        self.tables.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::NodeModulesResolver;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("index.js"), "");
        write(
            &root.join("node_modules/left-pad/package.json"),
            r#"{"name": "left-pad", "main": "lib/index.js"}"#,
        );
        write(&root.join("node_modules/left-pad/lib/index.js"), "");
        write(
            &root.join("node_modules/lodash/package.json"),
            r#"{"name": "lodash", "main": "lodash.js"}"#,
        );
        write(&root.join("node_modules/lodash/lodash.js"), "");
        write(&root.join("node_modules/lodash/fp.js"), "");
        dir
    }

    #[tokio::test]
    async fn test_records_entry_when_package_name_matches() {
        let dir = project();
        let session = ResolutionSession::new(dir.path(), NodeModulesResolver::default());

        let resolved = session
            .resolve_package("left-pad", &dir.path().join("index.js"))
            .await
            .unwrap();

        assert_eq!(resolved, "node_modules/left-pad/lib/index.js");
        let tables = session.into_tables();
        assert_eq!(
            tables.packages["left-pad"],
            PackageSpec {
                root_path: "node_modules/left-pad".to_string(),
                entry_path: Some("lib/index.js".to_string()),
            }
        );
        assert!(tables.repositories["node_modules"].contains("left-pad"));
    }

    #[tokio::test]
    async fn test_subpath_records_root_only() {
        let dir = project();
        let session = ResolutionSession::new(dir.path(), NodeModulesResolver::default());

        session
            .resolve_package("lodash/fp", &dir.path().join("index.js"))
            .await
            .unwrap();

        let tables = session.into_tables();
        assert_eq!(tables.packages["lodash/fp"].root_path, "node_modules/lodash");
        assert_eq!(tables.packages["lodash/fp"].entry_path, None);
    }

    #[tokio::test]
    async fn test_resolving_twice_is_idempotent() {
        let dir = project();
        let session = ResolutionSession::new(dir.path(), NodeModulesResolver::default());
        let from = dir.path().join("index.js");

        session.resolve_package("lodash", &from).await.unwrap();
        let first = session.snapshot();
        session.resolve_package("lodash", &from).await.unwrap();

        assert_eq!(session.snapshot(), first);
        assert_eq!(first.packages.len(), 1);
        assert_eq!(first.repositories.len(), 1);
    }

    #[tokio::test]
    async fn test_builtin_is_internal_module_and_not_recorded() {
        let dir = project();
        let session = ResolutionSession::new(dir.path(), NodeModulesResolver::default());

        let err = session
            .resolve_package("path", &dir.path().join("index.js"))
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::InternalModule { .. }));
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_base_package_file_is_not_recorded() {
        let dir = project();
        write(&dir.path().join("data.json"), "{}");
        let session = ResolutionSession::new(dir.path(), NodeModulesResolver::default());

        let resolved = session
            .resolve_package("./data", &dir.path().join("index.js"))
            .await
            .unwrap();

        assert_eq!(resolved, "data.json");
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_named_base_package_file_is_not_recorded() {
        let dir = project();
        write(&dir.path().join("package.json"), r#"{"name": "app"}"#);
        write(&dir.path().join("src/data.json"), "{}");
        let session = ResolutionSession::new(dir.path(), NodeModulesResolver::default());

        let resolved = session
            .resolve_package("./src/data", &dir.path().join("index.js"))
            .await
            .unwrap();

        assert_eq!(resolved, "src/data.json");
        assert!(session.snapshot().is_empty());
    }
}
