//! Normalization interceptor.
//!
//! The bundling engine turns every import specifier into a module name by
//! calling a [`Normalize`] implementation. [`Interceptor`] wraps the engine's
//! own loader and repairs names that point at nothing on disk:
//!
//! 1. **Probe**: the original name exists as a file.
//! 2. **Index fallback**: `x.js` is really `x/index.js`; the rewrite is
//!    recorded in the fix table.
//! 3. **Package fallback**: the name is an installed dependency package,
//!    either through the loader's alias map or through package resolution.
//!
//! A name that survives all three stages is returned unchanged and the
//! engine reports it however it reports missing modules.

use crate::adapter::ResolutionSession;
use crate::descriptor::DESCRIPTOR_FILE;
use crate::file_url::{dot_relative, to_native};
use crate::resolve::{file_exists, PackageResolver, ResolveError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Error raised by a loader's normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Invalid module specifier '{name}': {message}")]
    InvalidSpecifier { name: String, message: String },
}

/// Turns an import specifier into a module name.
#[allow(async_fn_in_trait)]
pub trait Normalize {
    async fn normalize(
        &self,
        name: &str,
        parent_name: Option<&str>,
        parent_address: Option<&str>,
    ) -> Result<String, NormalizeError>;
}

impl<T: Normalize> Normalize for &T {
    async fn normalize(
        &self,
        name: &str,
        parent_name: Option<&str>,
        parent_address: Option<&str>,
    ) -> Result<String, NormalizeError> {
        (**self).normalize(name, parent_name, parent_address).await
    }
}

/// The engine's built-in loader.
pub trait Loader: Normalize {
    /// User-configured module aliases, `name -> target`.
    fn alias_map(&self) -> &BTreeMap<String, String>;
}

/// Outcome of one fallback stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Resolved(String),
    Next,
}

/// Normalizer that falls back to directory indexes and dependency packages.
pub struct Interceptor<'a, L, R> {
    loader: &'a L,
    session: &'a ResolutionSession<R>,
}

impl<'a, L: Loader, R: PackageResolver> Interceptor<'a, L, R> {
    pub fn new(loader: &'a L, session: &'a ResolutionSession<R>) -> Self {
        Self { loader, session }
    }

    /// Accept `candidate` when it names an existing file.
    pub async fn probe(&self, candidate: &str) -> Step {
        if file_exists(&to_native(self.session.base_dir(), candidate)).await {
            Step::Resolved(candidate.to_string())
        } else {
            Step::Next
        }
    }

    /// Try `<stem>/index.js` for a `.js` candidate that does not exist.
    pub async fn index_fallback(&self, candidate: &str) -> Step {
        let Some(index) = index_candidate(candidate) else {
            return Step::Next;
        };
        let base = self.session.base_dir();
        let index_path = to_native(base, &index);
        if !file_exists(&index_path).await {
            return Step::Next;
        }

        let from = dot_relative(base, &to_native(base, candidate));
        let to = dot_relative(base, &index_path);
        debug!(from = %from, to = %to, "directory index fallback");
        self.session.record_fix(from, to);
        Step::Resolved(index)
    }

    /// Treat `name` as a dependency package.
    pub async fn package_fallback(
        &self,
        name: &str,
        parent_name: Option<&str>,
        parent_address: Option<&str>,
    ) -> Step {
        if let Some(other) = self.loader.alias_map().get(name).filter(|o| *o != name) {
            debug!(name, alias = %other, "aliased module");
            return match self
                .loader
                .normalize(other, parent_name, parent_address)
                .await
            {
                Ok(normalized) => Step::Resolved(normalized),
                Err(e) => {
                    debug!(alias = %other, error = %e, "alias target did not normalize");
                    Step::Next
                }
            };
        }

        let requester = self.requester(parent_name);
        match self.session.resolve_package(name, &requester).await {
            Ok(resolved) => {
                debug!(name, resolved = %resolved, "resolved as package");
                Step::Resolved(resolved)
            }
            Err(ResolveError::InternalModule { .. }) => {
                debug!(name, "built-in module left to the engine");
                Step::Next
            }
            Err(e) => {
                warn!(name, error = %e, "package resolution failed");
                Step::Next
            }
        }
    }

    fn requester(&self, parent_name: Option<&str>) -> PathBuf {
        let base = self.session.base_dir();
        match parent_name {
            Some(parent) => to_native(base, parent),
            None => base.join(DESCRIPTOR_FILE),
        }
    }
}

impl<L: Loader, R: PackageResolver> Normalize for Interceptor<'_, L, R> {
    async fn normalize(
        &self,
        name: &str,
        parent_name: Option<&str>,
        parent_address: Option<&str>,
    ) -> Result<String, NormalizeError> {
        let candidate = self
            .loader
            .normalize(name, parent_name, parent_address)
            .await?;

        if let Step::Resolved(found) = self.probe(&candidate).await {
            return Ok(found);
        }
        if let Step::Resolved(found) = self.index_fallback(&candidate).await {
            return Ok(found);
        }
        match self
            .package_fallback(name, parent_name, parent_address)
            .await
        {
            Step::Resolved(found) => Ok(found),
            Step::Next => Ok(candidate),
        }
    }
}

/// `a/b.js` -> `a/b/index.js`.
fn index_candidate(candidate: &str) -> Option<String> {
    candidate
        .strip_suffix(".js")
        .map(|stem| format!("{stem}/index.js"))
}
