#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Resolution layer for a module bundler.
//!
//! Lets a bundler follow imports into installed dependency packages, records
//! what it learned in [`ResolutionTables`], and turns those tables into
//! loader config.

pub mod adapter;
pub mod build;
pub mod config;
pub mod descriptor;
pub mod emit;
pub mod engine;
pub mod error;
pub mod file_url;
pub mod normalize;
pub mod resolve;
pub mod tables;
pub mod tree;
pub mod version;

pub use adapter::ResolutionSession;
pub use build::{build, BuildOutcome};
pub use config::{BuildOptions, Config};
pub use engine::{BundleEngine, BundleResult, EngineError, EngineOptions, ScanEngine};
pub use error::Error;
pub use normalize::{Interceptor, Loader, Normalize, NormalizeError};
pub use resolve::{NodeModulesResolver, PackageResolver, ResolveError};
pub use tables::{PackageSpec, ResolutionTables};
pub use tree::{build_tree, Branch};
pub use version::VERSION;
