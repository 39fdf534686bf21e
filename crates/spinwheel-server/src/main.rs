//! Spinwheel server binary.
//!
//! # Usage
//!
//! ```bash
//! # Start with self-signed certificate (development)
//! spinwheel-server --bind 0.0.0.0:3000
//!
//! # Start with TLS certificate and a custom admin name (production)
//! spinwheel-server --bind 0.0.0.0:3000 --cert cert.pem --key key.pem --admin-name host
//! ```

use std::time::Duration;

use clap::Parser;
use spinwheel_core::EngineConfig;
use spinwheel_server::{DriverConfig, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Spinwheel lottery session server
#[derive(Parser, Debug)]
#[command(name = "spinwheel-server")]
#[command(about = "Spin-the-wheel lottery session server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    bind: String,

    /// Path to TLS certificate (PEM format)
    #[arg(short, long)]
    cert: Option<String>,

    /// Path to TLS private key (PEM format)
    #[arg(short, long)]
    key: Option<String>,

    /// Reserved display name with admin rights
    #[arg(long, default_value = "backy")]
    admin_name: String,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Longest accepted display name, in characters
    #[arg(long, default_value = "64")]
    max_username_len: usize,

    /// Seconds of silence before a connection is dropped
    #[arg(long, default_value = "30")]
    idle_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Spinwheel server starting");
    tracing::info!("Binding to {}, admin name '{}'", args.bind, args.admin_name);

    if args.cert.is_none() || args.key.is_none() {
        tracing::warn!("No TLS certificate provided - using self-signed certificate");
        tracing::warn!("This is NOT suitable for production use!");
    }

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        cert_path: args.cert,
        key_path: args.key,
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
        driver: DriverConfig {
            engine: EngineConfig {
                admin_name: args.admin_name,
                max_username_len: args.max_username_len,
            },
            max_connections: args.max_connections,
        },
    };

    let server = Server::bind(config)?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
