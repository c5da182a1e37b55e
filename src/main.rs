use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use latest_version::config::{self, ResolverConfig};
use latest_version::logging::{self, LogFormat};
use latest_version::source::Source;
use latest_version::source::settings::{SourceProvider, XmlSettingsLoader};
use latest_version::{LatestVersionResolver, evaluate_sources};

#[derive(Parser)]
#[command(name = "latest-version")]
#[command(version, about = "Find the latest version of a package across package feeds")]
struct Cli {
    /// Package identifier to look up
    package_id: String,

    /// Feed URL or local folder to query; repeatable. Defaults to all configured sources
    #[arg(short = 's', long = "source")]
    sources: Vec<String>,

    /// Consider prerelease versions
    #[arg(long)]
    prerelease: bool,

    /// NuGet.Config file to read sources from; repeatable, later files win
    #[arg(long = "configfile")]
    config_files: Vec<PathBuf>,

    /// JSON file with resolver settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Maximum number of sources queried at once
    #[arg(long)]
    max_parallelism: Option<usize>,

    /// Write logs to a file instead of stderr (default location when no path is given)
    #[arg(long, value_name = "PATH")]
    log_file: Option<Option<PathBuf>>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn load_config(cli: &Cli) -> anyhow::Result<ResolverConfig> {
    let mut config = match &cli.settings {
        Some(path) => ResolverConfig::from_json_file(path)?,
        None => ResolverConfig::default(),
    };
    if let Some(max) = cli.max_parallelism {
        config.max_parallelism = max;
    }
    Ok(config)
}

fn load_sources(cli: &Cli) -> anyhow::Result<Vec<Source>> {
    let config_paths = if cli.config_files.is_empty() {
        config::default_config_paths()
    } else {
        cli.config_files.clone()
    };
    debug!("Reading sources from {:?}", config_paths);

    let sources = if cli.sources.is_empty() {
        XmlSettingsLoader.load_sources(&config_paths)?
    } else {
        let requested: Vec<Source> = cli.sources.iter().map(Source::new).collect();
        evaluate_sources(&requested, &config_paths)?
    };

    if sources.is_empty() {
        anyhow::bail!("No package sources configured; pass --source or --configfile");
    }
    Ok(sources)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let sources = load_sources(&cli)?;
    let resolver = LatestVersionResolver::from_config(load_config(&cli)?);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        })
    };

    let result = resolver
        .resolve_latest_version_with_cancel(&sources, &cli.package_id, cli.prerelease, &cancel)
        .await;
    interrupt.abort();

    let version = result.with_context(|| format!("Failed to resolve {}", cli.package_id))?;
    println!("{}", version);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .clone()
        .map(|path| path.unwrap_or_else(config::log_path));
    let _guard = logging::init(cli.log_format, log_file.as_deref())
        .context("Failed to initialize logging")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}
