use crate::engine::EngineError;
use crate::resolve::ResolveError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pkgbridge operations.
///
/// Resolution failures inside the normalization chain never reach this type;
/// they are recovered where they happen. What remains here is fatal to a
/// build.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read package descriptor at {path}: {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse package descriptor at {path}: {source}")]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read included config {path}: {source}")]
    FragmentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render loader config: {0}")]
    ConfigRender(#[from] serde_json::Error),

    #[error("Failed to write loader config to {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write bundle to {path}: {source}")]
    BundleWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot map package '{name}': {source}")]
    MapPackage {
        name: String,
        #[source]
        source: ResolveError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{0}")]
    InvalidArgument(String),
}

impl Error {
    #[must_use]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Stable machine-readable code for JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::ConfigRead { .. } => "CONFIG_READ_FAILED",
            Self::ConfigParse { .. } => "CONFIG_PARSE_FAILED",
            Self::DescriptorRead { .. } => "DESCRIPTOR_READ_FAILED",
            Self::DescriptorParse { .. } => "DESCRIPTOR_PARSE_FAILED",
            Self::FragmentRead { .. } => "INCLUDE_CONFIG_READ_FAILED",
            Self::ConfigRender(_) => "CONFIG_RENDER_FAILED",
            Self::ConfigWrite { .. } => "CONFIG_WRITE_FAILED",
            Self::BundleWrite { .. } => "BUNDLE_WRITE_FAILED",
            Self::MapPackage { .. } => "MAP_PACKAGE_FAILED",
            Self::Engine(e) => e.code(),
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }
}
