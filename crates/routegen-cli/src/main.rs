//! routegen CLI entrypoint
//! Parses command-line arguments and dispatches to the core generator.

// Internal imports (std, crate)
use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use notify::{RecursiveMode, Watcher};
use routegen_core::{
    generate, openapi::is_remote, route_table, GenConfig, GoListResolver, GroupingKey,
    HandlerIndex, ModuleRootResolver, OpenApiContext, PackageResolver,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "routegen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate gin route registration files from an OpenAPI spec
    Generate(GenerateArgs),
    /// Print the routes that would be registered, without writing files
    Routes {
        #[command(flatten)]
        source: SourceArgs,
        /// Configuration file, for presets, grouping and base path
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Write a configuration file with default values
    InitConfig {
        /// Destination (.yaml, .yml, .toml or .json)
        path: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// Path or URL to the OpenAPI spec (YAML or JSON)
    ///
    /// Example: --spec docs/swagger.yaml
    /// Example: --spec https://example.com/openapi.json
    #[arg(long)]
    spec: String,
    /// Handler index file mapping paths to handler locations.
    /// Entries override x-handler extensions found in the spec.
    #[arg(long)]
    handlers: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Configuration file (.yaml, .yml, .toml or .json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory of the route manifest (resource.go)
    #[arg(long)]
    output_dir: Option<String>,
    /// Package name of the route manifest
    #[arg(long)]
    output_pkg: Option<String>,
    /// Rewrite generated files that already exist
    #[arg(long)]
    overwrite: bool,
    /// Skip the overwrite confirmation
    #[arg(long, short = 'y')]
    yes: bool,
    /// One registration file per directory or per (directory, module)
    #[arg(long, value_enum)]
    group_by: Option<GroupingKey>,
    /// Prefix applied to every route path
    #[arg(long)]
    base_path: Option<String>,
    /// Also generate IntRouterPaths.go in this directory
    #[arg(long)]
    route_table_dir: Option<String>,
    /// Directory of templates overriding the built-in ones
    #[arg(long)]
    template_dir: Option<String>,
    /// Go module path; resolves packages without the go toolchain
    #[arg(long, requires = "module_root")]
    module: Option<String>,
    /// Directory containing go.mod, used with --module
    #[arg(long, requires = "module")]
    module_root: Option<PathBuf>,
    /// Regenerate whenever the spec, handler index or config changes
    #[arg(long)]
    watch: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Generate(args) => {
            let mut config = build_config(args).await?;
            if config.auto_overwrite && !args.yes && !confirm_overwrite()? {
                tracing::info!("Keeping existing files");
                config.auto_overwrite = false;
            }
            let resolver = build_resolver(args, &config);

            run_generate(&args.source, &config, resolver.as_ref()).await?;
            if args.watch {
                watch(args, &config, resolver.as_ref()).await?;
            }
        }
        Commands::Routes {
            source,
            config,
            format,
        } => {
            let config = load_config(config.as_deref()).await?;
            let (spec, handlers) = load_sources(source).await?;
            let table =
                route_table(&spec, &handlers, &config).context("Failed to collect routes")?;
            let out = match format {
                OutputFormat::Json => serde_json::to_string_pretty(table.routes())?,
                OutputFormat::Yaml => serde_yaml::to_string(table.routes())?,
            };
            println!("{}", out);
        }
        Commands::InitConfig { path, force } => {
            if !force && tokio::fs::try_exists(path).await? {
                anyhow::bail!("{} already exists, pass --force to replace it", path.display());
            }
            GenConfig::default()
                .save(path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}

async fn load_config(path: Option<&Path>) -> anyhow::Result<GenConfig> {
    match path {
        Some(path) => GenConfig::from_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(GenConfig::default()),
    }
}

/// Load the configuration file, if any, and apply command-line overrides
async fn build_config(args: &GenerateArgs) -> anyhow::Result<GenConfig> {
    let mut config = load_config(args.config.as_deref()).await?;
    apply_overrides(&mut config, args);
    Ok(config)
}

fn apply_overrides(config: &mut GenConfig, args: &GenerateArgs) {
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if args.output_pkg.is_some() {
        config.output_pkg = args.output_pkg.clone();
    }
    if args.overwrite {
        config.auto_overwrite = true;
    }
    if let Some(group_by) = args.group_by {
        config.group_by = group_by;
    }
    if args.base_path.is_some() {
        config.base_path = args.base_path.clone();
    }
    if args.route_table_dir.is_some() {
        config.route_table_dir = args.route_table_dir.clone();
    }
    if args.template_dir.is_some() {
        config.template_dir = args.template_dir.clone();
    }
}

fn build_resolver(args: &GenerateArgs, config: &GenConfig) -> Box<dyn PackageResolver> {
    match (&args.module, &args.module_root) {
        (Some(module), Some(root)) => {
            tracing::debug!("Resolving packages under {} as {}", root.display(), module);
            Box::new(ModuleRootResolver::new(module.clone(), root.clone()))
        }
        _ => Box::new(GoListResolver::new(config.gopath.clone())),
    }
}

/// Ask before overwriting; non-interactive runs proceed
fn confirm_overwrite() -> anyhow::Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Overwrite existing generated files?")
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;
    Ok(confirmed)
}

async fn load_sources(source: &SourceArgs) -> anyhow::Result<(OpenApiContext, HandlerIndex)> {
    tracing::debug!("Loading OpenAPI spec from: {}", source.spec);
    let spec = OpenApiContext::from_file_or_url(&source.spec)
        .await
        .with_context(|| format!("Failed to load OpenAPI spec {}", source.spec))?;

    let mut handlers = HandlerIndex::from_spec_extensions(&spec)?;
    if let Some(path) = &source.handlers {
        let file = HandlerIndex::from_file(path)
            .await
            .with_context(|| format!("Failed to load handler index {}", path.display()))?;
        handlers = handlers.merge(file);
    }
    tracing::debug!("{} handler locations", handlers.len());
    Ok((spec, handlers))
}

async fn run_generate(
    source: &SourceArgs,
    config: &GenConfig,
    resolver: &dyn PackageResolver,
) -> anyhow::Result<()> {
    let (spec, handlers) = load_sources(source).await?;
    let report = generate(&spec, &handlers, config, resolver)
        .await
        .context("Route generation failed")?;

    for path in &report.skipped {
        tracing::info!("Skipped existing {}", path.display());
    }
    tracing::info!(
        "Done: {} written, {} skipped",
        report.written.len(),
        report.skipped.len()
    );
    Ok(())
}

/// Local input files a watch run reacts to
fn watched_inputs(args: &GenerateArgs) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    if !is_remote(&args.source.spec) {
        inputs.push(PathBuf::from(&args.source.spec));
    }
    inputs.extend(args.source.handlers.clone());
    inputs.extend(args.config.clone());
    inputs
}

async fn watch(
    args: &GenerateArgs,
    config: &GenConfig,
    resolver: &dyn PackageResolver,
) -> anyhow::Result<()> {
    let mut files = HashSet::new();
    for input in watched_inputs(args) {
        let canonical = tokio::fs::canonicalize(&input)
            .await
            .with_context(|| format!("Cannot watch {}", input.display()))?;
        files.insert(canonical);
    }
    if files.is_empty() {
        anyhow::bail!("--watch needs at least one local input file");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = tx.send(res);
    })?;
    // Editors often replace files, so watch the parent directories
    let dirs: HashSet<&Path> = files.iter().filter_map(|f| f.parent()).collect();
    for dir in dirs {
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
    }
    tracing::info!("Watching {} input files, Ctrl-C to stop", files.len());

    let mut config = config.clone();
    while let Some(res) = rx.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Watch error: {}", e);
                continue;
            }
        };
        let relevant = (event.kind.is_modify() || event.kind.is_create())
            && event.paths.iter().any(|p| files.contains(p));
        if !relevant {
            continue;
        }
        // Collapse the burst of events a single save produces
        while rx.try_recv().is_ok() {}

        if let Some(path) = &args.config {
            match GenConfig::from_file(path).await {
                Ok(mut reloaded) => {
                    apply_overrides(&mut reloaded, args);
                    reloaded.auto_overwrite = config.auto_overwrite;
                    config = reloaded;
                }
                Err(e) => tracing::warn!("Keeping previous config, reload failed: {}", e),
            }
        }

        tracing::info!("Change detected, regenerating");
        if let Err(e) = run_generate(&args.source, &config, resolver).await {
            tracing::error!("{:#}", e);
        }
    }
    Ok(())
}
