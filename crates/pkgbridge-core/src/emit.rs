//! Loader config emission.
//!
//! Turns the resolution tables into `SystemJS.config(...)` directives. Output
//! depends only on table contents: every map is sorted and the directive
//! sections always appear as `map`, `meta`, `packages`.

use crate::config::BuildOptions;
use crate::error::Error;
use crate::tables::{FixTable, PackageTable, RepositoryTable, ResolutionTables};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Serialize)]
struct Directives<'a> {
    map: BTreeMap<&'a str, &'a str>,
    meta: BTreeMap<String, Meta<'a>>,
    packages: BTreeMap<&'a str, PackageMain<'a>>,
}

#[derive(Serialize)]
struct Meta<'a> {
    globals: BTreeMap<&'a str, &'a str>,
}

#[derive(Serialize)]
struct PackageMain<'a> {
    main: &'a str,
}

#[derive(Serialize)]
struct Fixes<'a> {
    map: &'a FixTable,
}

/// Render loader directives for the given tables.
///
/// Every repository group gets a `meta` entry binding `global` to
/// `shim_path` for the modules under it. A second directive carrying the fix
/// table follows only when there are fixes.
pub fn render_config(
    packages: &PackageTable,
    repositories: &RepositoryTable,
    fixes: &FixTable,
    shim_path: &str,
    global: &str,
) -> Result<String, serde_json::Error> {
    let directives = Directives {
        map: packages
            .iter()
            .map(|(name, spec)| (name.as_str(), spec.root_path.as_str()))
            .collect(),
        meta: repositories
            .keys()
            .map(|group| {
                let globals = BTreeMap::from([(global, shim_path)]);
                (format!("{group}/*"), Meta { globals })
            })
            .collect(),
        packages: packages
            .iter()
            .filter_map(|(name, spec)| {
                let main = spec.entry_path.as_deref()?;
                Some((name.as_str(), PackageMain { main }))
            })
            .collect(),
    };

    let mut out = format!("SystemJS.config({});\n", serde_json::to_string_pretty(&directives)?);
    if !fixes.is_empty() {
        let body = serde_json::to_string_pretty(&Fixes { map: fixes })?;
        out.push_str(&format!("SystemJS.config({body});\n"));
    }
    Ok(out)
}

/// Full config text: included fragments followed by the rendered directives.
///
/// Fragment bytes are copied unchanged, except that a `\n` is inserted after a
/// non-empty fragment that does not end with one, so a trailing line comment
/// cannot swallow the next directive.
pub async fn emit(
    options: &BuildOptions,
    tables: &ResolutionTables,
    shim_path: &str,
) -> Result<String, Error> {
    let mut out = String::new();
    for fragment in &options.include_config_list {
        let path = options.resolve_path(fragment);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| Error::FragmentRead {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), bytes = text.len(), "included config fragment");
        out.push_str(&text);
        if !text.is_empty() && !text.ends_with('\n') {
            out.push('\n');
        }
    }

    out.push_str(&render_config(
        &tables.packages,
        &tables.repositories,
        &tables.fixes,
        shim_path,
        &options.global_name,
    )?);
    Ok(out)
}

/// Write config text to `path`, replacing any previous file.
pub fn write_config(path: &Path, text: &str) -> Result<(), Error> {
    pkgbridge_util::fs::write_text_atomic(path, text).map_err(|source| Error::ConfigWrite {
        path: path.to_path_buf(),
        source,
    })
}
