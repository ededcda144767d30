use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use cards_pk::backend::{Backend, CommandSync, JobId, JobOutcome};
use cards_pk::config::BackendConfig;
use cards_pk::console::{ConsoleSink, OutputFormat};
use cards_pk::filter::Filters;
use cards_pk::runtime::RealRuntime;

/// cards-pk - query the CARDS installed package database
///
/// Resolves package names against the local package database and lists
/// their installed files, the way a package-management front end would.
///
/// Examples:
///   cards-pk resolve bash     # Packages matching "bash"
///   cards-pk files 'bash;5.2.21-1;x86_64;base'
#[derive(Parser, Debug)]
#[command(author, version = env!("CARDS_PK_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Package database root (also via CARDS_DB_ROOT)
    #[arg(long = "db-root", env = "CARDS_DB_ROOT", value_name = "PATH", global = true)]
    pub db_root: Option<PathBuf>,

    /// File manifest root, defaults to the database root (also via CARDS_MANIFEST_ROOT)
    #[arg(
        long = "manifest-root",
        env = "CARDS_MANIFEST_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub manifest_root: Option<PathBuf>,

    /// Print one JSON object per line
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Find packages whose collection, name, description or version contains a token
    Resolve(ResolveArgs),

    /// List every installed package
    List(ListArgs),

    /// List the installed files of packages
    Files(FilesArgs),

    /// Refresh the package cache with the configured sync command
    Refresh(RefreshArgs),

    /// Check for updates with the configured sync command
    Updates,

    /// Show the capabilities of the backend
    Info,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Tokens to match, case-insensitively
    #[arg(value_name = "TOKEN", required = true)]
    pub tokens: Vec<String>,

    /// Filters such as installed, ~devel or gui
    #[arg(long = "filter", short = 'f', value_name = "FILTER")]
    pub filters: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filters such as installed, ~devel or gui
    #[arg(long = "filter", short = 'f', value_name = "FILTER")]
    pub filters: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct FilesArgs {
    /// Package identifiers in the form name;version;arch;collection
    #[arg(value_name = "PACKAGE_ID", required = true)]
    pub package_ids: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct RefreshArgs {
    /// Refresh even if the cache looks current
    #[arg(long)]
    pub force: bool,
}

const JOB: JobId = 1;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let runtime = RealRuntime;
    let mut config = BackendConfig::from_runtime(&runtime);
    if let Some(root) = cli.db_root {
        if cli.manifest_root.is_none() {
            config = config.with_manifest_root(root.clone());
        }
        config = config.with_db_root(root);
    }
    if let Some(root) = cli.manifest_root {
        config = config.with_manifest_root(root);
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let backend = Backend::new(
        &runtime,
        &config,
        Box::new(CommandSync::new(config.sync_command.clone())),
    );

    let outcome = match cli.command {
        Commands::Resolve(args) => {
            let filters = Filters::parse(args.filters.as_slice())?;
            run_job(&backend, format, |b| {
                b.resolve(JOB, &filters, args.tokens.as_slice())
            })
        }
        Commands::List(args) => {
            let filters = Filters::parse(args.filters.as_slice())?;
            run_job(&backend, format, |b| b.get_packages(JOB, &filters))
        }
        Commands::Files(args) => run_job(&backend, format, |b| {
            b.get_files(JOB, args.package_ids.as_slice())
        }),
        Commands::Refresh(args) => run_job(&backend, format, |b| b.refresh_cache(JOB, args.force)),
        Commands::Updates => run_job(&backend, format, |b| b.get_updates(JOB, &Filters::none())),
        Commands::Info => return print_info(&backend, format),
    };

    match outcome {
        JobOutcome::InitFailed => bail!(
            "Package database at {} is empty or unreadable",
            config.db_root.display()
        ),
        JobOutcome::UnknownJob => bail!("Job {} is not running", JOB),
        JobOutcome::Completed | JobOutcome::Cancelled => Ok(()),
    }
}

/// Run one role on a fresh job printing to stdout.
fn run_job<'a, F>(backend: &Backend<'a, RealRuntime>, format: OutputFormat, role: F) -> JobOutcome
where
    F: FnOnce(&Backend<'a, RealRuntime>) -> JobOutcome,
{
    backend.start_job(JOB, Arc::new(ConsoleSink::stdout(format)));
    let outcome = role(backend);
    backend.stop_job(JOB);
    outcome
}

fn print_info(backend: &Backend<'_, RealRuntime>, format: OutputFormat) -> Result<()> {
    let caps = backend.capabilities();
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&caps)?);
        return Ok(());
    }

    let join = |items: Vec<String>| items.join(", ");
    println!("{} ({})", backend.description(), backend.author());
    println!(
        "groups:     {}",
        join(caps.groups.iter().map(|g| enum_name(g)).collect::<Result<_>>()?)
    );
    println!(
        "filters:    {}",
        join(caps.filters.iter().map(|f| f.to_string()).collect())
    );
    println!(
        "roles:      {}",
        join(caps.roles.iter().map(|r| enum_name(r)).collect::<Result<_>>()?)
    );
    println!("mime types: {}", caps.mime_types.join(", "));
    Ok(())
}

/// Serialized name of a unit enum variant, e.g. `desktop-kde`.
fn enum_name<T: serde::Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => bail!("Unexpected value {}", other),
    }
}
