//! Package resolution seam.
//!
//! The normalization chain only needs "give me a file for this package name,
//! and tell me which package declared it". [`PackageResolver`] is that seam;
//! [`NodeModulesResolver`] is the implementation the CLI uses.

mod node_modules;

pub use node_modules::{is_builtin, NodeModulesResolver};

use crate::descriptor::PackageDescriptor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error from package resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The specifier names a platform built-in, not a file.
    #[error("'{name}' is a platform built-in module")]
    InternalModule { name: String },

    #[error("Cannot find package '{name}' from '{}'", from.display())]
    NotFound { name: String, from: PathBuf },

    #[error("Invalid package descriptor at {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },
}

/// Callback receiving every package descriptor found while resolving,
/// together with the directory it lives in.
pub type ManifestFilter<'a> = dyn FnMut(&PackageDescriptor, &Path) + 'a;

/// External package-resolution engine.
///
/// Built-ins are reported by returning the bare requested name as the path,
/// the same signal Node-style resolvers give.
#[allow(async_fn_in_trait)]
pub trait PackageResolver {
    async fn resolve(
        &self,
        name: &str,
        from: &Path,
        on_manifest: &mut ManifestFilter<'_>,
    ) -> Result<PathBuf, ResolveError>;
}

impl<T: PackageResolver> PackageResolver for &T {
    async fn resolve(
        &self,
        name: &str,
        from: &Path,
        on_manifest: &mut ManifestFilter<'_>,
    ) -> Result<PathBuf, ResolveError> {
        (**self).resolve(name, from, on_manifest).await
    }
}

/// Whether `path` exists as a regular file. Probe errors count as "no".
pub async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

pub(crate) async fn dir_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}
