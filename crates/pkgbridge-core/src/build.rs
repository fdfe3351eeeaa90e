//! Build orchestration.
//!
//! One [`build`] call is one resolution session: the engine bundles through
//! the interceptor, explicitly requested packages are mapped, and the tables
//! are emitted as loader config.

use crate::adapter::ResolutionSession;
use crate::config::BuildOptions;
use crate::descriptor::{PackageDescriptor, DESCRIPTOR_FILE};
use crate::emit::{emit, write_config};
use crate::engine::{BundleEngine, BundleResult, EngineOptions};
use crate::error::Error;
use crate::file_url::{relative_url, to_url};
use crate::normalize::Interceptor;
use crate::resolve::PackageResolver;
use crate::tables::ResolutionTables;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use sugar_path::SugarPath;
use tracing::{debug, info};

/// Entry module used when neither options nor descriptor name one.
pub const DEFAULT_SOURCE: &str = "index.js";

/// Everything a build produced.
#[derive(Debug)]
pub struct BuildOutcome {
    pub result: BundleResult,
    pub tables: ResolutionTables,
    /// Emitted config text, when a config path was requested.
    pub config: Option<String>,
}

/// Run one build.
pub async fn build<E, R>(engine: &E, resolver: R, options: &BuildOptions) -> Result<BuildOutcome, Error>
where
    E: BundleEngine,
    R: PackageResolver,
{
    let base_dir = &options.base_dir;
    let descriptor = load_base_descriptor(base_dir).await?;
    let source = source_path(options, descriptor.as_ref());
    let source_url = to_url(&source.to_string_lossy());
    info!(source = %source.display(), sfx = options.sfx, debug = options.debug, "bundling");

    let session =
        ResolutionSession::new(base_dir.clone(), resolver).with_container(&options.container_dir);
    let result = {
        let interceptor = Interceptor::new(engine.loader(), &session);
        let engine_options = EngineOptions {
            debug: options.debug,
        };
        if options.sfx {
            engine
                .build_static(&source_url, &interceptor, &engine_options)
                .await?
        } else {
            engine
                .bundle(&source_url, &interceptor, &engine_options)
                .await?
        }
    };
    info!(modules = result.modules.len(), "bundled");

    if let Some(bundle_path) = &options.bundle_path {
        let path = options.resolve_path(bundle_path);
        pkgbridge_util::fs::write_text_atomic(&path, &result.source)
            .map_err(|source| Error::BundleWrite { path, source })?;
    }

    map_packages(&session, options).await?;
    let tables = session.into_tables();

    let config = match &options.out_config_path {
        Some(out) => {
            let shim = shim_url(options, descriptor.as_ref());
            let text = emit(options, &tables, &shim).await?;
            let path = options.resolve_path(out);
            write_config(&path, &text)?;
            info!(
                path = %path.display(),
                packages = tables.packages.len(),
                fixes = tables.fixes.len(),
                "wrote loader config"
            );
            Some(text)
        }
        None => None,
    };

    Ok(BuildOutcome {
        result,
        tables,
        config,
    })
}

/// Resolve every explicitly requested package on behalf of the base package.
async fn map_packages<R: PackageResolver>(
    session: &ResolutionSession<R>,
    options: &BuildOptions,
) -> Result<(), Error> {
    if options.map_packages.is_empty() {
        return Ok(());
    }

    let requester = options.base_dir.join(DESCRIPTOR_FILE);
    let requester = requester.as_path();
    let mapped: Vec<(&String, String)> = stream::iter(&options.map_packages)
        .map(|name| async move {
            session
                .resolve_package(name, requester)
                .await
                .map(|resolved| (name, resolved))
                .map_err(|source| Error::MapPackage {
                    name: name.clone(),
                    source,
                })
        })
        .buffer_unordered(options.concurrency.max(1))
        .try_collect()
        .await?;

    for (name, resolved) in mapped {
        debug!(package = %name, resolved = %resolved, "mapped package");
    }
    Ok(())
}

/// The base descriptor; a missing file means defaults apply.
async fn load_base_descriptor(base_dir: &Path) -> Result<Option<PackageDescriptor>, Error> {
    let path = base_dir.join(DESCRIPTOR_FILE);
    if !crate::resolve::file_exists(&path).await {
        return Ok(None);
    }
    PackageDescriptor::load(&path).await.map(Some)
}

/// Absolute path of the entry module.
fn source_path(options: &BuildOptions, descriptor: Option<&PackageDescriptor>) -> PathBuf {
    let relative = options.source_path.clone().unwrap_or_else(|| {
        let fields = [options.platform_field.as_str(), "main"];
        let entry = descriptor.and_then(|d| d.entry(&fields)).unwrap_or(DEFAULT_SOURCE);
        PathBuf::from(entry)
    });
    options.resolve_path(&relative).normalize()
}

/// Runtime shim module, relative to the base directory and URL-encoded.
fn shim_url(options: &BuildOptions, descriptor: Option<&PackageDescriptor>) -> String {
    let fallback = PackageDescriptor::default();
    let shim = descriptor.unwrap_or(&fallback).shim_path(options.debug);
    let path = options.resolve_path(Path::new(shim)).normalize();
    relative_url(&options.base_dir, &path)
}
