//! `pkgbridge tree` command implementation.
//!
//! Bundles in memory and reports the shortest-import-chain tree. Nothing is
//! written to disk.

use super::build::{execute, fail, BuildAction, ErrorResult};
use miette::{IntoDiagnostic, Result};
use pkgbridge_core::{build_tree, Branch, Config};
use serde::Serialize;
use std::path::PathBuf;

/// Tree command action.
#[derive(Debug, Clone)]
pub struct TreeAction {
    pub entry: PathBuf,
    /// Report only the chain leading to this module.
    pub why: Option<String>,
    pub aliases: Vec<String>,
}

#[derive(Serialize)]
struct TreeJson {
    ok: bool,
    tree: Branch,
}

#[derive(Serialize)]
struct WhyJson {
    ok: bool,
    module: String,
    chain: Vec<String>,
}

/// Run the tree command.
pub fn run(config: &Config, action: TreeAction) -> Result<()> {
    let build_action = BuildAction {
        source: Some(action.entry.clone()),
        aliases: action.aliases.clone(),
        in_memory: true,
        ..BuildAction::default()
    };
    let (_, outcome) = match execute(&config.cwd, &build_action) {
        Ok(done) => done,
        Err(e) => fail(&e, config.json_logs),
    };
    let tree = build_tree(&outcome.result);

    let Some(module) = action.why else {
        if config.json_logs {
            let out = TreeJson { ok: true, tree };
            println!("{}", serde_json::to_string(&out).into_diagnostic()?);
        } else {
            print!("{}", tree.render());
        }
        return Ok(());
    };

    match tree.chain_to(&module) {
        Some(chain) => {
            if config.json_logs {
                let out = WhyJson {
                    ok: true,
                    module,
                    chain,
                };
                println!("{}", serde_json::to_string(&out).into_diagnostic()?);
            } else {
                for (depth, name) in chain.iter().enumerate() {
                    println!("{}{name}", "  ".repeat(depth));
                }
            }
            Ok(())
        }
        None => {
            let message = format!("'{module}' is not part of the bundle");
            if config.json_logs {
                let out = ErrorResult::new("MODULE_NOT_IN_BUNDLE", message);
                println!("{}", serde_json::to_string(&out).into_diagnostic()?);
            } else {
                eprintln!("error: {message}");
            }
            std::process::exit(1);
        }
    }
}
