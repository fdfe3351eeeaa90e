//! `pkgbridge build` command implementation.

use miette::{IntoDiagnostic, Result};
use pkgbridge_core::{
    build, build_tree, BuildOptions, BuildOutcome, Branch, Config, Error, NodeModulesResolver,
    ScanEngine,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Build command action. Unset fields fall back to `pkgbridge.json`.
#[derive(Debug, Clone, Default)]
pub struct BuildAction {
    pub debug: bool,
    pub sfx: bool,
    pub bundle: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub out_config: Option<PathBuf>,
    pub include_config: Vec<PathBuf>,
    pub map_packages: Vec<String>,
    /// `FROM=TO` module aliases.
    pub aliases: Vec<String>,
    /// Print the dependency tree instead of the bundle.
    pub tree: bool,
    /// Ignore every output path, including those from `pkgbridge.json`.
    pub in_memory: bool,
}

impl BuildAction {
    fn options(&self, base_dir: &Path) -> Result<BuildOptions, Error> {
        let mut options = BuildOptions::load(base_dir)?;
        options.debug |= self.debug;
        options.sfx |= self.sfx;
        if self.bundle.is_some() {
            options.bundle_path.clone_from(&self.bundle);
        }
        if self.source.is_some() {
            options.source_path.clone_from(&self.source);
        }
        if self.out_config.is_some() {
            options.out_config_path.clone_from(&self.out_config);
        }
        options
            .include_config_list
            .extend(self.include_config.iter().cloned());
        options.map_packages.extend(self.map_packages.iter().cloned());
        if self.in_memory {
            options.bundle_path = None;
            options.out_config_path = None;
        }
        Ok(options)
    }
}

#[derive(Serialize)]
struct BuildResultJson {
    ok: bool,
    base_dir: String,
    modules: Vec<String>,
    packages: BTreeMap<String, String>,
    fixes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bundle_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<Branch>,
    duration_ms: u64,
}

#[derive(Serialize)]
pub(crate) struct ErrorJson {
    code: String,
    message: String,
}

#[derive(Serialize)]
pub(crate) struct ErrorResult {
    ok: bool,
    error: ErrorJson,
}

impl ErrorResult {
    pub(crate) fn new(code: &str, message: String) -> Self {
        Self {
            ok: false,
            error: ErrorJson {
                code: code.to_string(),
                message,
            },
        }
    }
}

/// Print `error` in the requested format and exit non-zero.
pub(crate) fn fail(error: &Error, json: bool) -> ! {
    if json {
        let result = ErrorResult::new(error.code(), error.to_string());
        println!("{}", serde_json::to_string(&result).unwrap_or_default());
    } else {
        eprintln!("error: {error}");
    }
    std::process::exit(1);
}

/// Split `FROM=TO` aliases.
fn parse_aliases(aliases: &[String]) -> Result<BTreeMap<String, String>, Error> {
    aliases
        .iter()
        .map(|alias| match alias.split_once('=') {
            Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
                Ok((from.trim().to_string(), to.trim().to_string()))
            }
            _ => Err(Error::invalid_argument(format!(
                "invalid alias '{alias}', expected FROM=TO"
            ))),
        })
        .collect()
}

/// Run a build for the project at `cwd` on a single-threaded runtime.
pub(crate) fn execute(
    cwd: &Path,
    action: &BuildAction,
) -> Result<(BuildOptions, BuildOutcome), Error> {
    let base_dir = dunce::canonicalize(cwd)?;
    let options = action.options(&base_dir)?;
    let aliases = parse_aliases(&action.aliases)?;

    let engine = ScanEngine::new(&base_dir).with_aliases(aliases);
    let resolver = NodeModulesResolver::new(&options.platform_field)
        .with_container(options.container_dir.clone());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(build(&engine, resolver, &options))?;
    Ok((options, outcome))
}

/// Run the build command.
pub fn run(config: &Config, action: BuildAction) -> Result<()> {
    let start = Instant::now();
    let (options, outcome) = match execute(&config.cwd, &action) {
        Ok(done) => done,
        Err(e) => fail(&e, config.json_logs),
    };
    let duration_ms = start.elapsed().as_millis() as u64;
    let tree = action.tree.then(|| build_tree(&outcome.result));

    let bundle_path = options
        .bundle_path
        .as_ref()
        .map(|p| options.resolve_path(p));
    let config_path = options
        .out_config_path
        .as_ref()
        .map(|p| options.resolve_path(p));

    if config.json_logs {
        let result = BuildResultJson {
            ok: true,
            base_dir: options.base_dir.display().to_string(),
            modules: outcome.result.modules,
            packages: outcome
                .tables
                .packages
                .into_iter()
                .map(|(name, spec)| (name, spec.root_path))
                .collect(),
            fixes: outcome.tables.fixes,
            bundle_path: bundle_path.map(|p| p.display().to_string()),
            config_path: config_path.map(|p| p.display().to_string()),
            tree,
            duration_ms,
        };
        println!("{}", serde_json::to_string(&result).into_diagnostic()?);
        return Ok(());
    }

    if let Some(tree) = tree {
        print!("{}", tree.render());
    } else if bundle_path.is_none() {
        print!("{}", outcome.result.source);
    }

    eprintln!(
        "  {} modules, {} packages, {} fixes ({}ms)",
        outcome.result.modules.len(),
        outcome.tables.packages.len(),
        outcome.tables.fixes.len(),
        duration_ms
    );
    if let Some(path) = bundle_path {
        eprintln!("  bundle -> {}", path.display());
    }
    if let Some(path) = config_path {
        eprintln!("  config -> {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        let aliases = parse_aliases(&["react = preact".to_string()]).unwrap();
        assert_eq!(aliases["react"], "preact");
    }

    #[test]
    fn test_parse_aliases_rejects_missing_target() {
        let err = parse_aliases(&["react=".to_string()]).unwrap_err();
        assert!(err.to_string().contains("FROM=TO"));
    }

    #[test]
    fn test_flags_extend_file_options() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pkgbridge.json"),
            r#"{"mapPackages": ["react"], "outConfigPath": "a.js"}"#,
        )
        .unwrap();
        let action = BuildAction {
            out_config: Some(PathBuf::from("b.js")),
            map_packages: vec!["lodash".to_string()],
            ..BuildAction::default()
        };

        let options = action.options(dir.path()).unwrap();
        assert_eq!(options.out_config_path, Some(PathBuf::from("b.js")));
        assert_eq!(options.map_packages, vec!["react", "lodash"]);
    }
}
