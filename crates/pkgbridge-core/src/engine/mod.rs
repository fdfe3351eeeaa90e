//! Bundling engine seam.
//!
//! The engine walks the module graph and concatenates modules; it learns
//! module names only through the [`Normalize`] implementation it is handed.
//! [`ScanEngine`] is a small reference engine used by the CLI.

mod scan;

pub use scan::{scan_specifiers, ScanEngine, ScanLoader};

use crate::normalize::{Loader, Normalize, NormalizeError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Options passed through to the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Emit a development build.
    pub debug: bool,
}

/// One module of a finished bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    /// Dependency specifiers exactly as written, in source order.
    pub deps: Vec<String>,
    /// Specifier -> module name it normalized to.
    #[serde(rename = "depMap")]
    pub dep_map: BTreeMap<String, String>,
}

/// Output of a bundling run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BundleResult {
    /// Bundled source text.
    pub source: String,
    /// Module names in the order they were bundled.
    pub modules: Vec<String>,
    /// Entry modules, when the engine reports them.
    #[serde(rename = "entryPoints", skip_serializing_if = "Option::is_none")]
    pub entry_points: Option<Vec<String>>,
    /// Module name -> record.
    pub tree: BTreeMap<String, ModuleRecord>,
}

/// Error surfaced by a bundling engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot find module '{name}' at {}", path.display())]
    ModuleNotFound { name: String, path: PathBuf },

    #[error("Failed to read module '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl EngineError {
    /// Stable machine-readable code for JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModuleNotFound { .. } => "MODULE_NOT_FOUND",
            Self::Read { .. } => "MODULE_READ_FAILED",
            Self::Normalize(_) => "NORMALIZE_FAILED",
        }
    }
}

/// External bundling engine.
#[allow(async_fn_in_trait)]
pub trait BundleEngine {
    type Loader: Loader;

    /// The engine's built-in loader, wrapped by the caller before bundling.
    fn loader(&self) -> &Self::Loader;

    /// Bundle `source_url` as loader-registered modules.
    async fn bundle<N: Normalize>(
        &self,
        source_url: &str,
        normalizer: &N,
        options: &EngineOptions,
    ) -> Result<BundleResult, EngineError>;

    /// Bundle `source_url` as a self-executing static bundle.
    async fn build_static<N: Normalize>(
        &self,
        source_url: &str,
        normalizer: &N,
        options: &EngineOptions,
    ) -> Result<BundleResult, EngineError>;
}
