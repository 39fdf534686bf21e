//! Simulation server for testing with turmoil.
//!
//! `SimServer` runs the production [`Executor`] unchanged, fed by turmoil's
//! deterministic TCP instead of QUIC. Only the byte transport differs: each
//! accepted stream gets a reader loop and a writer task, exactly like a QUIC
//! connection's bidirectional and outbound streams.

use std::io;

use spinwheel_server::{
    DriverConfig, Executor, Inbound, InboundSender, ServerDriver, codec, drain_outbound,
};
use tokio::{
    io::AsyncWriteExt,
    sync::{mpsc, oneshot},
};
use turmoil::net::{TcpListener, TcpStream};

use crate::SimEnv;

/// Simulation server for testing with turmoil.
///
/// Designed to be the body of a turmoil host; [`SimServer::run`] only returns
/// on a listener error.
pub struct SimServer;

impl SimServer {
    /// Bind and serve with the default config and seed.
    pub async fn run(address: &str) -> io::Result<()> {
        Self::run_with_config(address, DriverConfig::default(), SimEnv::new()).await
    }

    /// Bind and serve with a custom config and environment.
    pub async fn run_with_config(
        address: &str,
        config: DriverConfig,
        env: SimEnv,
    ) -> io::Result<()> {
        let listener = TcpListener::bind(address).await?;
        let inbox = Executor::new(ServerDriver::new(env, config)).spawn();

        loop {
            let (stream, addr) = listener.accept().await?;
            let inbox = inbox.clone();

            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, inbox).await {
                    tracing::debug!(%addr, error = %e, "sim connection ended with error");
                }
            });
        }
    }
}

/// Pump one TCP stream through the executor.
async fn serve_connection(stream: TcpStream, inbox: InboundSender) -> io::Result<()> {
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (assigned_tx, assigned_rx) = oneshot::channel();

    send(&inbox, Inbound::Opened { outbound: outbound_tx, assigned: assigned_tx })?;
    let session_id = assigned_rx.await.map_err(|_| executor_stopped())?;
    tracing::debug!(session_id, "sim connection accepted");

    tokio::spawn(async move {
        match drain_outbound(&mut writer, outbound_rx).await {
            Ok(Some(reason)) => {
                tracing::debug!(session_id, %reason, "sim server closing connection");
                let _ = writer.shutdown().await;
            },
            Ok(None) => {},
            Err(e) => tracing::debug!(session_id, error = %e, "sim outbound write failed"),
        }
    });

    let reason = loop {
        match codec::read_frame(&mut reader).await {
            Ok(Some(frame)) => send(&inbox, Inbound::Received { session_id, frame })?,
            Ok(None) => break "peer closed".to_string(),
            Err(e) => break e.to_string(),
        }
    };

    send(&inbox, Inbound::Closed { session_id, reason })
}

fn send(inbox: &InboundSender, inbound: Inbound) -> io::Result<()> {
    inbox.send(inbound).map_err(|_| executor_stopped())
}

fn executor_stopped() -> io::Error {
    io::Error::other("executor stopped")
}
