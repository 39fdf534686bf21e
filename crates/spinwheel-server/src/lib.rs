//! Spinwheel production server.
//!
//! Production server implementation using Quinn for QUIC transport, Tokio for
//! async runtime, and system time with cryptographic RNG.
//!
//! # Architecture
//!
//! This crate provides production "glue" that wraps [`spinwheel_core`]'s
//! action-based logic with real I/O. The [`ServerDriver`] follows the Sans-IO
//! pattern, the [`Executor`] runs it on a single task, and [`Server`] feeds
//! it from Quinn connections.
//!
//! # Components
//!
//! - [`ServerDriver`]: Action-based orchestrator (pure logic, no I/O)
//! - [`Executor`]: Single-task owner of the driver and outbound queues
//! - [`Broadcaster`]: Subscriber set for unicast and broadcast delivery
//! - [`Server`]: Production runtime that accepts connections
//! - [`QuinnTransport`]: QUIC transport via Quinn library
//! - [`SystemEnv`]: Production environment (real time, crypto RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod broadcaster;
pub mod codec;
mod driver;
mod error;
mod executor;
mod registry;
mod server_error;
mod system_env;
mod transport;

use std::time::Duration;

pub use broadcaster::{Broadcaster, Outbound, OutboundReceiver, OutboundSender};
pub use driver::{ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent};
pub use error::ServerError;
pub use executor::{Executor, Inbound, InboundSender, drain_outbound};
pub use registry::{ConnectionInfo, ConnectionRegistry};
pub use server_error::{ExecutorError, ServerError as DriverError};
pub use spinwheel_core::LogLevel;
pub use system_env::SystemEnv;
use tokio::sync::{mpsc, oneshot};
pub use transport::{QuinnConnection, QuinnTransport};

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:3000")
    pub bind_address: String,
    /// Path to TLS certificate (PEM format)
    pub cert_path: Option<String>,
    /// Path to TLS private key (PEM format)
    pub key_path: Option<String>,
    /// Silence after which a connection is considered gone
    pub idle_timeout: Duration,
    /// Driver configuration (engine, limits)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            cert_path: None,
            key_path: None,
            idle_timeout: Duration::from_secs(30),
            driver: DriverConfig::default(),
        }
    }
}

/// Production spinwheel server.
///
/// Wraps the executor with Quinn QUIC transport and system environment.
pub struct Server {
    /// Driver, moved into the executor on `run`
    driver: ServerDriver<SystemEnv>,
    /// QUIC endpoint
    transport: QuinnTransport,
}

impl Server {
    /// Create and bind a new server.
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let driver = ServerDriver::new(SystemEnv::new(), config.driver);

        let transport = QuinnTransport::bind(
            &config.bind_address,
            config.cert_path,
            config.key_path,
            config.idle_timeout,
        )?;

        Ok(Self { driver, transport })
    }

    /// Run the server, accepting connections and processing frames.
    ///
    /// This method runs until the endpoint is closed.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        let inbox = Executor::new(self.driver).spawn();

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let inbox = inbox.clone();

                    tokio::spawn(async move {
                        let remote = conn.remote_addr();
                        if let Err(e) = handle_connection(conn, inbox).await {
                            tracing::debug!(%remote, error = %e, "Connection error");
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Handle a single QUIC connection.
///
/// Opens the outbound stream, registers with the executor, then reads client
/// streams one after another so frames reach the executor in send order.
/// Always reports the close, whatever ended the connection.
async fn handle_connection(conn: QuinnConnection, inbox: InboundSender) -> Result<(), ServerError> {
    let mut outbound_stream = conn.open_uni().await?;
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (assigned_tx, assigned_rx) = oneshot::channel();

    send_inbound(&inbox, Inbound::Opened { outbound: outbound_tx, assigned: assigned_tx })?;
    let session_id = assigned_rx.await.map_err(|_| executor_stopped())?;
    tracing::debug!(session_id, remote = %conn.remote_addr(), "New connection");

    let writer_conn = conn.clone();
    tokio::spawn(async move {
        match drain_outbound(&mut outbound_stream, outbound_rx).await {
            Ok(Some(reason)) => {
                let _ = outbound_stream.finish();
                writer_conn.close(0u32.into(), reason.as_bytes());
            },
            Ok(None) => {},
            Err(e) => tracing::debug!(session_id, error = %e, "Outbound write failed"),
        }
    });

    let reason = read_streams(session_id, &conn, &inbox).await;
    send_inbound(&inbox, Inbound::Closed { session_id, reason })
}

/// Read client streams until the connection ends. Returns the close reason.
async fn read_streams(session_id: u64, conn: &QuinnConnection, inbox: &InboundSender) -> String {
    loop {
        let (send, mut recv) = match conn.accept_bi().await {
            Ok(streams) => streams,
            Err(e) => return e.to_string(),
        };
        drop(send);

        loop {
            match codec::read_frame(&mut recv).await {
                Ok(Some(frame)) => {
                    if send_inbound(inbox, Inbound::Received { session_id, frame }).is_err() {
                        return "executor stopped".to_string();
                    }
                },
                Ok(None) => break,
                Err(ServerError::Protocol(msg)) => {
                    tracing::warn!(session_id, "Invalid frame, dropping stream: {}", msg);
                    break;
                },
                Err(e) => {
                    tracing::debug!(session_id, error = %e, "Stream read failed");
                    break;
                },
            }
        }
    }
}

fn send_inbound(inbox: &InboundSender, inbound: Inbound) -> Result<(), ServerError> {
    inbox.send(inbound).map_err(|_| executor_stopped())
}

fn executor_stopped() -> ServerError {
    ServerError::Internal("executor stopped".to_string())
}
