//! Campaign Foundry - gateway server and config tooling

use foundry_core::{Credentials, FoundryConfig};
use foundry_gateway::start_gateway;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "foundry", about = "Campaign Foundry - agentic marketing campaign pipeline")]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = "foundry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(short, long)]
        bind: Option<String>,
        /// Also write daily-rotated logs to this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Write a config file with every default spelled out
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show version
    Version,
}

fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "foundry=info,tower_http=info".into());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "foundry.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, bind, log_dir }) => {
            let _guard = init_tracing(log_dir.as_deref());
            let mut config = FoundryConfig::load(&cli.config);
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            start_gateway(config, Credentials::from_env()).await?;
        }

        Some(Commands::InitConfig { force }) => {
            if cli.config.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", cli.config.display());
            }
            FoundryConfig::default().save(&cli.config)?;
            println!("Wrote {}", cli.config.display());
        }

        Some(Commands::Version) => {
            println!("foundry v{}", env!("CARGO_PKG_VERSION"));
        }

        // No subcommand = serve with defaults
        None => {
            let _guard = init_tracing(None);
            start_gateway(FoundryConfig::load(&cli.config), Credentials::from_env()).await?;
        }
    }

    Ok(())
}
