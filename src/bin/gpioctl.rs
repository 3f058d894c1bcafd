//! Command-line client for the virtual GPIO daemon.
//!
//! Usage:
//!   gpioctl write led 1
//!   gpioctl cat led
//!   gpioctl list

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use virtual_gpio::GpioError;
use virtual_gpio::client::GpioClient;
use virtual_gpio::config::{self, Config};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Daemon socket
    #[arg(long, env = "GPIO_SOCKET_PATH")]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Issue a single read at a given cursor
    Read {
        path: String,
        #[arg(long, default_value_t = 0)]
        position: u64,
        #[arg(long, default_value_t = 1)]
        capacity: usize,
    },
    /// Read from the start until end of stream
    Cat { path: String },
    /// Write a payload; only a leading '1' turns the line on
    Write {
        path: String,
        data: String,
        /// Claimed length, if different from the payload
        #[arg(long)]
        length: Option<usize>,
    },
    /// Show every line and its state
    List,
}

async fn run(cli: Cli) -> Result<(), GpioError> {
    let socket = cli
        .socket
        .unwrap_or_else(|| Config::from_env().server.socket_path);
    let mut client = GpioClient::connect(&socket).await?;

    match cli.command {
        Command::Read {
            path,
            position,
            capacity,
        } => {
            let chunk = client.read(&path, position, capacity).await?;
            println!("{} (position {})", String::from_utf8_lossy(&chunk.data), chunk.position);
        }
        Command::Cat { path } => {
            println!("{}", String::from_utf8_lossy(&client.read_to_end(&path).await?));
        }
        Command::Write { path, data, length } => {
            let count = match length {
                Some(length) => client.write_claimed(&path, data.as_bytes(), length).await?,
                None => client.write(&path, data.as_bytes()).await?,
            };
            println!("{count}");
        }
        Command::List => {
            for entry in client.list().await? {
                println!(
                    "{:<8} {} {:<16} v{}",
                    entry.path, entry.value, entry.state, entry.version
                );
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Mutates the environment: must run before the runtime starts its workers
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("gpioctl: failed to build async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gpioctl: {:?}: {}", e.errno(), e);
            ExitCode::FAILURE
        }
    }
}
