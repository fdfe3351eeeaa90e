use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional per-project options file.
pub const OPTIONS_FILE: &str = "pkgbridge.json";

/// Runtime configuration for the pkgbridge CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// Options for one build.
///
/// Relative paths are resolved against `base_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Project root; must contain the base package descriptor.
    pub base_dir: PathBuf,
    /// Development build (selects the debug runtime shim).
    pub debug: bool,
    /// Produce a self-executing static bundle.
    pub sfx: bool,
    /// Where to write the bundle.
    pub bundle_path: Option<PathBuf>,
    /// Entry module; defaults from the base descriptor.
    pub source_path: Option<PathBuf>,
    /// Where to write the loader config.
    pub out_config_path: Option<PathBuf>,
    /// Config fragments prepended verbatim, in order.
    pub include_config_list: Vec<PathBuf>,
    /// Packages to map explicitly even when no module imports them.
    pub map_packages: Vec<String>,
    /// Descriptor field preferred over `main`.
    pub platform_field: String,
    /// Dependency container directory name.
    pub container_dir: String,
    /// Global name bound to the runtime shim.
    pub global_name: String,
    /// Maximum concurrent explicit package mappings.
    pub concurrency: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            debug: false,
            sfx: false,
            bundle_path: None,
            source_path: None,
            out_config_path: None,
            include_config_list: Vec::new(),
            map_packages: Vec::new(),
            platform_field: "react-native".to_string(),
            container_dir: crate::tables::DEFAULT_CONTAINER_DIR.to_string(),
            global_name: "process".to_string(),
            concurrency: 8,
        }
    }
}

impl BuildOptions {
    /// Options for `base_dir`, read from its `pkgbridge.json` when present.
    ///
    /// A `baseDir` inside the file is ignored; the directory the file was
    /// found in wins.
    pub fn load(base_dir: &Path) -> Result<Self, Error> {
        let path = base_dir.join(OPTIONS_FILE);
        let mut options = if path.is_file() {
            let text = pkgbridge_util::fs::read_text(&path).map_err(|source| Error::ConfigRead {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str::<Self>(&text)
                .map_err(|source| Error::ConfigParse { path, source })?
        } else {
            Self::default()
        };
        options.base_dir = base_dir.to_path_buf();
        Ok(options)
    }

    /// `path` resolved against the base directory.
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
