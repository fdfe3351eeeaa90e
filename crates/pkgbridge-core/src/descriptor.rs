//! Package descriptor (`package.json`) reading.

use crate::error::Error;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// File name of a package descriptor.
pub const DESCRIPTOR_FILE: &str = "package.json";

/// Descriptor key holding pkgbridge's own settings.
const SETTINGS_KEY: &str = "pkgbridge";

const DEFAULT_SHIM: &str = "shims/process.js";
const DEFAULT_DEBUG_SHIM: &str = "shims/process.debug.js";

/// The parts of a package descriptor resolution cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    /// Every other top-level field, for platform-specific entry lookups.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PackageDescriptor {
    /// Parse descriptor text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Read and parse the descriptor at `path`.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::DescriptorRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&text).map_err(|source| Error::DescriptorParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// String value of a top-level field.
    ///
    /// Object-valued fields (such as a `browser` alias map) are ignored.
    #[must_use]
    pub fn string_field(&self, field: &str) -> Option<&str> {
        if field == "main" {
            return self.main.as_deref();
        }
        self.fields.get(field).and_then(Value::as_str)
    }

    /// First string-valued field of `fields`, in order.
    #[must_use]
    pub fn entry<S: AsRef<str>>(&self, fields: &[S]) -> Option<&str> {
        fields
            .iter()
            .find_map(|field| self.string_field(field.as_ref()))
    }

    /// Runtime shim module path, relative to the descriptor's directory.
    #[must_use]
    pub fn shim_path(&self, debug: bool) -> &str {
        let (key, default) = if debug {
            ("debugShim", DEFAULT_DEBUG_SHIM)
        } else {
            ("shim", DEFAULT_SHIM)
        };
        self.fields
            .get(SETTINGS_KEY)
            .and_then(|settings| settings.get(key))
            .and_then(Value::as_str)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_prefers_platform_field() {
        let desc = PackageDescriptor::parse(
            r#"{"name": "x", "main": "main.js", "react-native": "native.js"}"#,
        )
        .unwrap();
        assert_eq!(desc.entry(&["react-native", "main"]), Some("native.js"));
        assert_eq!(desc.entry(&["browser", "main"]), Some("main.js"));
    }

    #[test]
    fn test_entry_skips_object_fields() {
        let desc = PackageDescriptor::parse(
            r#"{"main": "main.js", "browser": {"./fs.js": false}}"#,
        )
        .unwrap();
        assert_eq!(desc.entry(&["browser", "main"]), Some("main.js"));
    }

    #[test]
    fn test_shim_path_defaults() {
        let desc = PackageDescriptor::parse(r#"{"name": "app"}"#).unwrap();
        assert_eq!(desc.shim_path(false), "shims/process.js");
        assert_eq!(desc.shim_path(true), "shims/process.debug.js");
    }

    #[test]
    fn test_shim_path_from_settings() {
        let desc = PackageDescriptor::parse(
            r#"{"pkgbridge": {"shim": "rt/p.js", "debugShim": "rt/p.dev.js"}}"#,
        )
        .unwrap();
        assert_eq!(desc.shim_path(false), "rt/p.js");
        assert_eq!(desc.shim_path(true), "rt/p.dev.js");
    }

    #[tokio::test]
    async fn test_load_reports_parse_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DESCRIPTOR_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        let err = PackageDescriptor::load(&path).await.unwrap_err();
        assert!(matches!(err, Error::DescriptorParse { .. }));
        assert!(err.to_string().contains("package.json"));
    }
}
