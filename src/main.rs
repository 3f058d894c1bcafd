use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use virtual_gpio::config::{self, Config};
use virtual_gpio::host::MemoryHost;
use virtual_gpio::registry::Registry;
use virtual_gpio::server::Server;

/// Simulated LED/button GPIO daemon.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Socket to serve the pseudo-files on
    #[arg(long, env = "GPIO_SOCKET_PATH")]
    socket: Option<PathBuf>,

    /// Permission bits for the socket file, in octal
    #[arg(long, value_parser = parse_octal)]
    socket_mode: Option<u32>,

    /// Permission bits for each pseudo-file, in octal
    #[arg(long, value_parser = parse_octal)]
    entry_mode: Option<u32>,
}

fn parse_octal(raw: &str) -> Result<u32, String> {
    config::parse_mode(raw).ok_or_else(|| format!("invalid octal mode: {raw}"))
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // Mutates the environment: must run before the runtime starts its workers
    config::load_dotenv();
    init_logger();
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build async runtime: {}", e);
            std::process::exit(1);
        }
    };
    runtime.block_on(run(args));
}

async fn run(args: Args) {
    let mut config = Config::from_env();
    if let Some(socket) = args.socket {
        config.server.socket_path = socket;
    }
    if let Some(mode) = args.socket_mode {
        config.server.socket_mode = mode;
    }
    if let Some(mode) = args.entry_mode {
        config.gpio.entry_mode = mode;
    }
    info!("Configuration loaded:");
    info!("  Socket: {}", config.server.socket_path.display());
    info!("  Socket mode: {:o}", config.server.socket_mode);
    info!("  Entry mode: {:o}", config.gpio.entry_mode);

    let registry = Arc::new(Registry::with_mode(MemoryHost::new(), config.gpio.entry_mode));
    if let Err(e) = registry.start() {
        error!("Failed to start registry: {}", e);
        std::process::exit(1);
    }

    let server = match Server::bind(
        &config.server.socket_path,
        config.server.socket_mode,
        Arc::clone(&registry),
    ) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", config.server.socket_path.display(), e);
            registry.stop();
            std::process::exit(1);
        }
    };

    info!("Press Ctrl+C to exit");
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal");
    };

    if let Err(e) = server.serve(shutdown).await {
        error!("Server error: {}", e);
    }

    registry.stop();
}
