//! Aquanode CLI - operator tool for aquanode devices.
//!
//! This is the entry point for the `aquactl` binary.

mod client;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aquanode_core::ResourcePath;
use aquanode_device::{Snapshot, WriteRequest};
use aquanode_gateway::{create_registry_router, Registry};

use client::DeviceClient;
use ws::WatchEvent;

/// Aquanode CLI - read and drive consumable-resource devices.
#[derive(Parser, Debug)]
#[command(name = "aquactl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Device URL.
    #[arg(long, env = "AQUANODE_DEVICE", default_value = "http://localhost:5683")]
    device: String,

    /// Resource path served by the device.
    #[arg(long, default_value = "co2Dispenser/tank")]
    resource: ResourcePath,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the device record and the current resource state.
    Status,
    /// Switch the flow on or off.
    Flow {
        /// Target mode.
        mode: FlowArg,
    },
    /// Set the depletion per tick.
    Rate {
        /// Decimal quantity, e.g. `12.5`.
        value: String,
    },
    /// Force the shutoff state (variants with a forced stop only).
    Stop,
    /// Simulate holding the refill button.
    Press {
        /// How long the button is held, in seconds.
        seconds: u64,
    },
    /// Print every notification from the device.
    Watch {
        /// Stop after this many notifications.
        #[arg(long)]
        count: Option<usize>,
    },
    /// Run a controller registry that devices can register with.
    Registry {
        /// Listen address.
        #[arg(long, default_value = "0.0.0.0:5683")]
        listen: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FlowArg {
    On,
    Off,
}

impl FlowArg {
    const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

fn print_snapshot(snapshot: &Snapshot) {
    println!("level {}  mode {}", snapshot.level, snapshot.mode);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = match (&args.command, args.debug) {
        (_, true) => "aquanode=debug,info",
        (Command::Registry { .. }, false) => "info",
        _ => "warn",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = DeviceClient::new(&args.device, args.resource.clone());

    match args.command {
        Command::Status => {
            let status = client.status().await?;
            println!("device      {}", status.device);
            println!("phase       {}", status.phase);
            if let Some(at) = status.connected_at {
                println!("connected   {at}");
            }
            if let Some(at) = status.registered_at {
                println!("registered  {at}");
            }
            println!("resource    {} (stop: {})", status.resource, status.supports_stop);
            print_snapshot(&client.read().await?);
        }
        Command::Flow { mode } => {
            client.write(&WriteRequest::mode(mode.as_str())).await?;
            print_snapshot(&client.read().await?);
        }
        Command::Rate { value } => {
            client.write(&WriteRequest::rate(value)).await?;
            println!("rate updated");
        }
        Command::Stop => {
            client.stop().await?;
            print_snapshot(&client.read().await?);
        }
        Command::Press { seconds } => {
            let result = client.press(seconds).await?;
            match (result.refilled, result.snapshot) {
                (true, Some(snapshot)) => {
                    print!("refilled: ");
                    print_snapshot(&snapshot);
                }
                _ if !result.refill_needed => println!("no refill needed, press ignored"),
                _ => println!(
                    "press too short, hold for at least {}s",
                    result.required_seconds.unwrap_or_default()
                ),
            }
        }
        Command::Watch { count } => {
            let url = client.observe_url();
            tracing::info!(url = %url, "Connecting to observe stream");
            let mut events = ws::connect(&url).await?;

            let mut seen = 0;
            while let Some(event) = events.recv().await {
                match event {
                    WatchEvent::Snapshot(snapshot) => {
                        print_snapshot(&snapshot);
                        seen += 1;
                        if count.is_some_and(|limit| seen >= limit) {
                            break;
                        }
                    }
                    WatchEvent::Unparsed(text) => println!("? {text}"),
                    WatchEvent::Disconnected => {
                        println!("stream closed");
                        break;
                    }
                }
            }
        }
        Command::Registry { listen } => {
            let registry = Arc::new(Registry::new());
            let app = create_registry_router(registry);

            tracing::info!(listen_addr = %listen, "Starting registration registry");
            let listener = tokio::net::TcpListener::bind(&listen).await?;
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let args = Args::try_parse_from(["aquactl", "flow", "on"]).unwrap();
        assert!(matches!(args.command, Command::Flow { mode: FlowArg::On }));
        assert_eq!(args.resource.as_str(), "co2Dispenser/tank");

        let args = Args::try_parse_from([
            "aquactl",
            "--resource",
            "osmoticWaterTank/tank",
            "watch",
            "--count",
            "3",
        ])
        .unwrap();
        assert_eq!(args.resource, ResourcePath::osmotic_water_tank());
        assert!(matches!(args.command, Command::Watch { count: Some(3) }));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Args::try_parse_from(["aquactl", "flow", "sideways"]).is_err());
    }
}
