use clap::{Args, Parser, Subcommand};
use devcamper::config::{AppConfig, ConfigLayer, LoadedConfig};
use devcamper::{AppState, logger, seeder};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "devcamper", version, about = "DevCamper bootcamp directory API", long_about = None)]
struct Cli {
    #[arg(long, global = true, help = "Path to a config file (TOML). Takes precedence over the default locations.")]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    command: Commands,
}

/// Flags that override config files and environment variables.
#[derive(Args, Debug, Default)]
struct Overrides {
    #[arg(long, global = true, help = "Interface to bind")]
    host: Option<String>,
    #[arg(long, global = true, help = "Port to listen on")]
    port: Option<u16>,
    #[arg(long, global = true, help = "Directory holding the store journal")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Directory for app.log and access.log (default ./logs)")]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level: error|warn|info|debug|trace")]
    log_level: Option<String>,
}

impl From<Overrides> for ConfigLayer {
    fn from(o: Overrides) -> Self {
        Self {
            host: o.host,
            port: o.port,
            data_dir: o.data_dir,
            log_dir: o.log_dir,
            log_level: o.log_level,
            ..Self::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run the HTTP API until Ctrl+C or SIGTERM")]
    Serve,
    #[command(about = "Import or remove fixture data")]
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
}

#[derive(Subcommand, Debug)]
enum SeedAction {
    #[command(about = "Import users, bootcamps, courses and reviews JSON files from a directory")]
    Import {
        #[arg(long, default_value = "_data", help = "Directory containing the *.json fixtures")]
        data: PathBuf,
    },
    #[command(about = "Delete every bootcamp, course, review and user")]
    Destroy,
}

fn init_logging(config: &AppConfig) {
    let result = if std::path::Path::new("log4rs.yaml").exists() {
        logger::init()
    } else {
        logger::configure_logging(config.log_dir.as_deref(), &config.log_level, config.log_retention)
    };
    if let Err(e) = result {
        eprintln!("warning: logging not initialized: {e}");
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let vars: HashMap<String, String> = std::env::vars().collect();
    let LoadedConfig { config, warnings } =
        AppConfig::load(cli.overrides.into(), cli.config.as_deref(), &vars)?;
    init_logging(&config);
    for warning in &warnings {
        log::warn!("{warning}");
    }
    log::debug!("config: data_dir={} bind={}", config.data_dir.display(), config.bind_addr());

    let state = AppState::open(config)?;
    match cli.command {
        Commands::Serve => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(devcamper::serve(Arc::new(state)))?;
        }
        Commands::Seed { action: SeedAction::Import { data } } => {
            let report = seeder::import(&state, &data)?;
            state.engine.flush()?;
            println!("Data imported: {report}");
        }
        Commands::Seed { action: SeedAction::Destroy } => {
            let removed = seeder::destroy(&state)?;
            state.engine.flush()?;
            println!("Data destroyed: {removed} documents");
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
