mod app_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    ipe_config::config_path,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "ipe", about = "Ipe, multi-tenant realtime messaging gateway", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server.
    Gateway {
        /// Config file (.yml, .yaml, .toml or .json).
        #[arg(long, env = "IPE_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Validate the config file and list the registered applications.
    Check {
        #[arg(long, env = "IPE_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Sign a REST request as one of the configured applications.
    Sign {
        /// Application id to sign as.
        #[arg(long)]
        app_id: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// Request path, e.g. /apps/1/channels.
        #[arg(long)]
        path: String,
        /// Extra query parameters, e.g. "filter_by_prefix=presence-".
        #[arg(long)]
        query: Option<String>,
        #[arg(long, env = "IPE_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command {
        Commands::Gateway { config } => {
            let path = config_path(config);
            info!(version = env!("CARGO_PKG_VERSION"), config = %path.display(), "ipe starting");
            ipe_gateway::run(&path).await
        },
        Commands::Check { config } => app_commands::check(&config_path(config)),
        Commands::Sign {
            app_id,
            method,
            path,
            query,
            config,
        } => app_commands::sign(
            &config_path(config),
            &app_id,
            &method,
            &path,
            query.as_deref(),
        ),
    }
}
