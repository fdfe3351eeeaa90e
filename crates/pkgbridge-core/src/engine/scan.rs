//! Reference bundling engine.
//!
//! Discovers dependencies by scanning `import`/`require` specifiers, visits
//! modules breadth-first, and concatenates them. There is no transpilation
//! and no tree shaking.

use super::{BundleEngine, BundleResult, EngineError, EngineOptions, ModuleRecord};
use crate::descriptor::DESCRIPTOR_FILE;
use crate::file_url::{relative_url, to_native, to_url, FILE_SCHEME};
use crate::normalize::{Loader, Normalize, NormalizeError};
use crate::resolve::is_builtin;
use regex_lite::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use sugar_path::SugarPath;
use tracing::{debug, trace};

const COMMENT_PATTERN: &str = r"(?s:/\*.*?\*/)|(?m:^[ \t]*//[^\n]*)";
const SPECIFIER_PATTERN: &str =
    r#"(?:\bimport\s*\(?|\bfrom|\brequire\s*\()\s*["']([^"'\n]+)["']"#;

fn comment_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(COMMENT_PATTERN).ok()).as_ref()
}

fn specifier_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SPECIFIER_PATTERN).ok()).as_ref()
}

/// Import specifiers of `source` in first-appearance order, deduplicated.
///
/// Recognizes static and dynamic `import`, `export ... from`, and
/// `require(...)`. Block comments and whole-line `//` comments are skipped.
#[must_use]
pub fn scan_specifiers(source: &str) -> Vec<String> {
    let stripped = match comment_regex() {
        Some(re) => re.replace_all(source, ""),
        None => source.into(),
    };
    let Some(re) = specifier_regex() else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    re.captures_iter(&stripped)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|spec| seen.insert(spec.clone()))
        .collect()
}

/// Built-in loader of [`ScanEngine`].
///
/// Names become `file://` URLs: relative names against the parent module,
/// bare names against the base directory. A `.js` extension is added when
/// the name has no `.js`/`.json` extension.
#[derive(Debug, Clone)]
pub struct ScanLoader {
    base_dir: PathBuf,
    aliases: BTreeMap<String, String>,
}

impl ScanLoader {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn parent_dir(&self, parent_name: Option<&str>) -> PathBuf {
        let parent = match parent_name {
            Some(name) => to_native(&self.base_dir, name),
            None => self.base_dir.join(DESCRIPTOR_FILE),
        };
        parent
            .parent()
            .map_or_else(|| self.base_dir.clone(), Path::to_path_buf)
    }
}

impl Normalize for ScanLoader {
    async fn normalize(
        &self,
        name: &str,
        parent_name: Option<&str>,
        _parent_address: Option<&str>,
    ) -> Result<String, NormalizeError> {
        if name.trim().is_empty() {
            return Err(NormalizeError::InvalidSpecifier {
                name: name.to_string(),
                message: "empty specifier".to_string(),
            });
        }
        if name.starts_with(FILE_SCHEME) {
            return Ok(name.to_string());
        }

        let path = if name.starts_with("./") || name.starts_with("../") {
            self.parent_dir(parent_name).join(name)
        } else if name.starts_with('/') {
            PathBuf::from(name)
        } else {
            self.base_dir.join(name)
        };
        let path = with_default_extension(&path.normalize());
        Ok(to_url(&path.to_string_lossy()))
    }
}

impl Loader for ScanLoader {
    fn alias_map(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }
}

fn with_default_extension(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js" | "json") => path.to_path_buf(),
        _ => PathBuf::from(format!("{}.js", path.display())),
    }
}

/// Modules visited by one walk, in visiting order.
struct Walk {
    entry: String,
    modules: Vec<(String, String)>,
    tree: BTreeMap<String, ModuleRecord>,
}

/// Reference engine: breadth-first specifier scan plus concatenation.
#[derive(Debug, Clone)]
pub struct ScanEngine {
    loader: ScanLoader,
}

impl ScanEngine {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader: ScanLoader::new(base_dir),
        }
    }

    /// Configure module aliases consulted before package resolution.
    #[must_use]
    pub fn with_aliases(mut self, aliases: BTreeMap<String, String>) -> Self {
        self.loader.aliases = aliases;
        self
    }

    /// Module name as reported in results: base-relative and URL-encoded.
    fn module_key(&self, name: &str) -> String {
        let base = self.loader.base_dir();
        relative_url(base, &to_native(base, name))
    }

    async fn walk<N: Normalize>(
        &self,
        source_url: &str,
        normalizer: &N,
    ) -> Result<Walk, EngineError> {
        let base = self.loader.base_dir();
        let entry_name = normalizer.normalize(source_url, None, None).await?;
        let entry = self.module_key(&entry_name);

        let mut seen = BTreeSet::from([entry.clone()]);
        let mut queue = VecDeque::from([entry_name]);
        let mut modules = Vec::new();
        let mut tree = BTreeMap::new();

        while let Some(name) = queue.pop_front() {
            let key = self.module_key(&name);
            let source = read_module(&key, &to_native(base, &name)).await?;

            let mut record = ModuleRecord::default();
            for spec in scan_specifiers(&source) {
                if is_builtin(&spec) {
                    trace!(module = %key, specifier = %spec, "skipping built-in");
                    continue;
                }
                let dep_name = normalizer.normalize(&spec, Some(name.as_str()), None).await?;
                let dep_key = self.module_key(&dep_name);
                record.deps.push(spec.clone());
                record.dep_map.insert(spec, dep_key.clone());
                if seen.insert(dep_key) {
                    queue.push_back(dep_name);
                }
            }

            debug!(module = %key, deps = record.deps.len(), "bundled module");
            tree.insert(key.clone(), record);
            modules.push((key, source));
        }

        Ok(Walk {
            entry,
            modules,
            tree,
        })
    }
}

impl BundleEngine for ScanEngine {
    type Loader = ScanLoader;

    fn loader(&self) -> &ScanLoader {
        &self.loader
    }

    async fn bundle<N: Normalize>(
        &self,
        source_url: &str,
        normalizer: &N,
        options: &EngineOptions,
    ) -> Result<BundleResult, EngineError> {
        let walk = self.walk(source_url, normalizer).await?;

        let mut source = String::new();
        for (key, text) in &walk.modules {
            let deps = walk
                .tree
                .get(key)
                .map(|record| record.deps.clone())
                .unwrap_or_default();
            if options.debug {
                source.push_str(&format!("/* {key} */\n"));
            }
            source.push_str(&format!(
                "System.registerDynamic({}, {}, true, function (require, exports, module) {{\n{text}\n}});\n",
                Value::from(key.as_str()),
                Value::from(deps),
            ));
        }

        Ok(finish(walk, source))
    }

    async fn build_static<N: Normalize>(
        &self,
        source_url: &str,
        normalizer: &N,
        options: &EngineOptions,
    ) -> Result<BundleResult, EngineError> {
        let walk = self.walk(source_url, normalizer).await?;

        let mut source = String::from(STATIC_PRELUDE);
        for (key, text) in &walk.modules {
            let dep_map = walk
                .tree
                .get(key)
                .map(|record| record.dep_map.clone())
                .unwrap_or_default();
            if options.debug {
                source.push_str(&format!("/* {key} */\n"));
            }
            source.push_str(&format!(
                "{}: [{}, function (require, exports, module) {{\n{text}\n}}],\n",
                Value::from(key.as_str()),
                Value::Object(dep_map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
            ));
        }
        source.push_str(&format!("}}, {});\n", Value::from(walk.entry.as_str())));

        Ok(finish(walk, source))
    }
}

const STATIC_PRELUDE: &str = r#"(function (defs, entry) {
  var cache = {};
  function load(name) {
    if (cache[name]) return cache[name].exports;
    var def = defs[name];
    var module = (cache[name] = { exports: {} });
    def[1].call(module.exports, function (dep) {
      var target = def[0][dep];
      return target === undefined ? require(dep) : load(target);
    }, module.exports, module);
    return module.exports;
  }
  load(entry);
})({
"#;

fn finish(walk: Walk, source: String) -> BundleResult {
    BundleResult {
        source,
        modules: walk.modules.into_iter().map(|(key, _)| key).collect(),
        entry_points: Some(vec![walk.entry]),
        tree: walk.tree,
    }
}

async fn read_module(name: &str, path: &Path) -> Result<String, EngineError> {
    tokio::fs::read_to_string(path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            EngineError::ModuleNotFound {
                name: name.to_string(),
                path: path.to_path_buf(),
            }
        } else {
            EngineError::Read {
                name: name.to_string(),
                source,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn url(path: &Path) -> String {
        to_url(&path.to_string_lossy())
    }

    #[test]
    fn test_scan_specifiers_kinds() {
        let source = r#"
import React from "react";
import './side-effect';
export { a } from "./a";
const b = require('./b');
const lazy = import("./lazy");
"#;
        assert_eq!(
            scan_specifiers(source),
            vec!["react", "./side-effect", "./a", "./b", "./lazy"]
        );
    }

    #[test]
    fn test_scan_specifiers_skips_comments_and_duplicates() {
        let source = r#"
// import "commented";
/* require("blocked") */
const x = require("dup");
const y = require("dup");
const url = "http://example.com";
"#;
        assert_eq!(scan_specifiers(source), vec!["dup"]);
    }

    #[tokio::test]
    async fn test_loader_normalizes_names() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        let loader = ScanLoader::new(base);
        let parent = url(&base.join("src/app.js"));

        assert_eq!(
            loader.normalize("lodash", None, None).await.unwrap(),
            url(&base.join("lodash.js"))
        );
        assert_eq!(
            loader.normalize("./util", Some(parent.as_str()), None).await.unwrap(),
            url(&base.join("src/util.js"))
        );
        assert_eq!(
            loader.normalize("../data.json", Some(parent.as_str()), None).await.unwrap(),
            url(&base.join("data.json"))
        );
        assert_eq!(
            loader.normalize(&parent, None, None).await.unwrap(),
            parent
        );
    }

    #[tokio::test]
    async fn test_loader_rejects_empty_name() {
        let loader = ScanLoader::new("/proj");
        assert!(loader.normalize(" ", None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_bundle_walks_breadth_first() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        write(&base.join("index.js"), "require('./a');\nrequire('./b');\nrequire('fs');\n");
        write(&base.join("a.js"), "require('./c');\n");
        write(&base.join("b.js"), "require('./a');\n");
        write(&base.join("c.js"), "module.exports = 1;\n");

        let engine = ScanEngine::new(base);
        let result = engine
            .bundle(&url(&base.join("index.js")), engine.loader(), &EngineOptions::default())
            .await
            .unwrap();

        assert_eq!(result.modules, vec!["index.js", "a.js", "b.js", "c.js"]);
        assert_eq!(result.entry_points, Some(vec!["index.js".to_string()]));
        assert_eq!(result.tree["index.js"].deps, vec!["./a", "./b"]);
        assert_eq!(result.tree["b.js"].dep_map["./a"], "a.js");
        assert!(result
            .source
            .contains(r#"System.registerDynamic("c.js", [], true"#));
    }

    #[tokio::test]
    async fn test_build_static_calls_entry() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        write(&base.join("main.js"), "require('./dep');\n");
        write(&base.join("dep.js"), "module.exports = 2;\n");

        let engine = ScanEngine::new(base);
        let result = engine
            .build_static(&url(&base.join("main.js")), engine.loader(), &EngineOptions { debug: true })
            .await
            .unwrap();

        assert!(result.source.starts_with("(function (defs, entry)"));
        assert!(result.source.contains(r#""main.js": [{"./dep":"dep.js"}"#));
        assert!(result.source.contains("/* dep.js */"));
        assert!(result.source.ends_with("}, \"main.js\");\n"));
    }

    #[tokio::test]
    async fn test_missing_module_is_reported() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        write(&base.join("index.js"), "require('./gone');\n");

        let engine = ScanEngine::new(base);
        let err = engine
            .bundle(&url(&base.join("index.js")), engine.loader(), &EngineOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::ModuleNotFound { ref name, .. } if name == "gone.js"));
        assert_eq!(err.code(), "MODULE_NOT_FOUND");
    }
}
