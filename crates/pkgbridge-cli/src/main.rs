#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use pkgbridge_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pkgbridge")]
#[command(author, version, about = "Bundle through node_modules and emit loader config", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory (the project base directory)
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Bundle the project and emit loader config
    Build {
        /// Development build (uses the debug runtime shim)
        #[arg(long)]
        debug: bool,

        /// Produce a self-executing static bundle
        #[arg(long)]
        sfx: bool,

        /// Write the bundle to this file (prints to stdout otherwise)
        #[arg(long, value_name = "PATH")]
        bundle: Option<PathBuf>,

        /// Entry module (defaults to the package descriptor's entry)
        #[arg(long, value_name = "PATH")]
        source: Option<PathBuf>,

        /// Write loader config to this file
        #[arg(long, value_name = "PATH")]
        out_config: Option<PathBuf>,

        /// Config fragment to prepend verbatim (repeatable)
        #[arg(long = "include-config", value_name = "PATH")]
        include_config: Vec<PathBuf>,

        /// Package to map even if nothing imports it (repeatable)
        #[arg(long = "map-package", value_name = "NAME")]
        map_package: Vec<String>,

        /// Module alias consulted before package resolution (repeatable)
        #[arg(long, value_name = "FROM=TO")]
        alias: Vec<String>,

        /// Print the dependency tree
        #[arg(long)]
        tree: bool,
    },

    /// Show the shortest-import-chain tree of a bundle
    Tree {
        /// Entry module
        entry: PathBuf,

        /// Show only the chain that pulls in this module
        #[arg(long, value_name = "MODULE")]
        why: Option<String>,

        /// Module alias consulted before package resolution (repeatable)
        #[arg(long, value_name = "FROM=TO")]
        alias: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Build {
            debug,
            sfx,
            bundle,
            source,
            out_config,
            include_config,
            map_package,
            alias,
            tree,
        }) => {
            logging::init(config.verbosity, config.json_logs);
            let span = tracing::info_span!("build", cmd = "build", cwd = %cwd.display());
            let _guard = span.enter();

            let action = commands::build::BuildAction {
                debug,
                sfx,
                bundle,
                source,
                out_config,
                include_config,
                map_packages: map_package,
                aliases: alias,
                tree,
                in_memory: false,
            };
            commands::build::run(&config, action)
        }
        Some(Commands::Tree { entry, why, alias }) => {
            logging::init(config.verbosity, config.json_logs);
            let span = tracing::info_span!("tree", cmd = "tree", cwd = %cwd.display());
            let _guard = span.enter();

            let action = commands::tree::TreeAction {
                entry,
                why,
                aliases: alias,
            };
            commands::tree::run(&config, action)
        }
    }
}
