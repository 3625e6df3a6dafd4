//! Generation pipeline entry point

use std::path::PathBuf;

use serde::Serialize;

use crate::{
    aggregate::{AggregateOptions, RouteTable},
    builders::{builders_for, PackageIndex},
    config::GenConfig,
    error::Result,
    handlers::HandlerIndex,
    openapi::OpenApiContext,
    resolver::PackageResolver,
    templates::TemplateManager,
    writer::{write_generated, WriteOutcome},
};

/// Files touched by one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub written: Vec<PathBuf>,
    /// Existing files left alone because overwriting was off
    pub skipped: Vec<PathBuf>,
}

impl GenerationReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len()
    }
}

/// Aggregate the spec's routes according to `config`
pub fn route_table(
    spec: &OpenApiContext,
    handlers: &HandlerIndex,
    config: &GenConfig,
) -> Result<RouteTable> {
    let base_path = match &config.base_path {
        Some(base) => Some(base.clone()),
        None if config.use_spec_base_path => spec.base_path(),
        None => None,
    };
    let options = AggregateOptions {
        group_by: config.group_by,
        base_path,
    };
    RouteTable::build(spec, handlers, &config.security, &options)
}

/// Main entry point for code generation.
///
/// Every route is resolved and every file rendered before the first write,
/// so a malformed security chain or an unresolvable package leaves the
/// output directory untouched.
pub async fn generate<R: PackageResolver + ?Sized>(
    spec: &OpenApiContext,
    handlers: &HandlerIndex,
    config: &GenConfig,
    resolver: &R,
) -> Result<GenerationReport> {
    // 1. Extract and group routes
    let table = route_table(spec, handlers, config)?;
    log::info!(
        "Collected {} routes into {} destinations",
        table.routes().len(),
        table.groups().len()
    );

    // 2. Resolve import paths, once per directory
    let packages = PackageIndex::resolve(&table, resolver)?;

    // 3. Render everything
    let templates = TemplateManager::new(config.template_dir.as_ref().map(PathBuf::from)).await?;
    let mut rendered = Vec::new();
    for builder in builders_for(config) {
        for artifact in builder.build(&table, &packages)? {
            let contents = templates.render(artifact.kind, &artifact.context)?;
            rendered.push((artifact.path, contents));
        }
    }

    // 4. Write
    let mut report = GenerationReport::default();
    for (path, contents) in rendered {
        match write_generated(&path, &contents, config.auto_overwrite).await? {
            WriteOutcome::Written => report.written.push(path),
            WriteOutcome::Skipped => report.skipped.push(path),
        }
    }

    log::info!(
        "Wrote {} files, skipped {} existing",
        report.written.len(),
        report.skipped.len()
    );
    Ok(report)
}
