//! Command-line entry point for the IEC 104 station runtimes.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use voltage_iec104_station::config::{DEFAULT_T3_TIMEOUT, DEFAULT_TICK_MS};
use voltage_iec104_station::{
    ClientRuntime, MemoryTransport, Result, ServerRuntime, StationConfig, StationError,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll a remote station
    Client {
        #[command(flatten)]
        station: StationArgs,

        /// Group interrogation to request after connecting (1-16), repeatable
        #[arg(short, long = "group", value_name = "GROUP")]
        groups: Vec<u8>,

        /// Command to send after connecting, repeatable
        #[arg(long = "command", value_name = "NAME=VALUE", value_parser = parse_command)]
        commands: Vec<(String, String)>,
    },

    /// Serve a simulated station
    Server {
        #[command(flatten)]
        station: StationArgs,

        /// Seed of the process simulation
        #[arg(long, env = "IEC104_SEED")]
        seed: Option<u64>,
    },
}

#[derive(Debug, Args)]
struct StationArgs {
    /// Peer address (client) or bind address (server), host:port
    #[arg(short, long, env = "IEC104_ADDRESS")]
    address: Option<String>,

    /// Common address of the station
    #[arg(short, long, env = "IEC104_COMMON_ADDRESS")]
    common_address: Option<u16>,

    /// Tick period in milliseconds
    #[arg(long, env = "IEC104_TICK_MS", default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,

    /// T3 timeout in seconds
    #[arg(long, env = "IEC104_T3_SECS", default_value_t = DEFAULT_T3_TIMEOUT)]
    t3_secs: u64,
}

impl StationArgs {
    fn apply(self, mut config: StationConfig) -> StationConfig {
        if let Some(address) = self.address {
            config = config.address(address);
        }
        if let Some(common_address) = self.common_address {
            config = config.common_address(common_address);
        }
        config
            .tick_interval(Duration::from_millis(self.tick_ms))
            .t3_timeout(Duration::from_secs(self.t3_secs))
    }
}

fn parse_command(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_owned(), value.to_owned())),
        _ => Err(format!("expected NAME=VALUE, got {:?}", s)),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn report_fatal(e: StationError) -> StationError {
    if e.is_fatal() {
        error!(error = %e, "Invalid station configuration");
    }
    e
}

/// Connect, then issue the requested interrogations and commands once.
async fn client_startup(
    runtime: &mut ClientRuntime<MemoryTransport>,
    groups: &[u8],
    commands: &[(String, String)],
) {
    if runtime.start().await.is_err() {
        return;
    }
    let dispatcher = runtime.dispatcher().clone();
    for &group in groups {
        dispatcher.group_interrogation(group).await.ok();
    }
    for (name, value) in commands {
        dispatcher.send_command(name, value.as_str()).await.ok();
    }
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    shutdown
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Client {
            station,
            groups,
            commands,
        } => {
            let config = station.apply(StationConfig::client());
            let transport = Arc::new(MemoryTransport::new(config.address.clone()));
            warn!("No wire transport linked, running on the in-process loopback");

            let shutdown = shutdown_on_ctrl_c();
            let mut runtime = ClientRuntime::new(config, transport).map_err(report_fatal)?;
            tokio::select! {
                _ = shutdown.cancelled() => info!("Startup interrupted"),
                _ = client_startup(&mut runtime, &groups, &commands) => {}
            }
            runtime.run(shutdown).await?;
        }
        Commands::Server { station, seed } => {
            let config = station.apply(StationConfig::server());
            let transport = Arc::new(MemoryTransport::new(config.address.clone()));
            warn!("No wire transport linked, running on the in-process loopback");

            let shutdown = shutdown_on_ctrl_c();
            let mut runtime = match seed {
                Some(seed) => ServerRuntime::with_seed(config, transport, seed),
                None => ServerRuntime::new(config, transport),
            }
            .map_err(report_fatal)?;
            runtime.run(shutdown).await?;
        }
    }

    info!("Exited");
    Ok(())
}
