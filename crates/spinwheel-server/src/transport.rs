//! Quinn-based QUIC transport implementation.
//!
//! Encrypted, multiplexed streams over UDP with TLS 1.3. Supports production
//! certificates from PEM files and self-signed certificates for local use.
//!
//! # Idle timeout
//!
//! The endpoint enforces a QUIC idle timeout. A peer that vanishes without
//! closing stops acknowledging, the connection times out, and the runtime
//! reports it closed like any other disconnect. This is what eventually
//! releases the name and roster entry of a dead client.
//!
//! # Security
//!
//! ALPN is set to "spinwheel". Self-signed certificates are only suitable for
//! local testing.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use quinn::{Endpoint, IdleTimeout, RecvStream, SendStream, ServerConfig, TransportConfig};
use spinwheel_proto::ALPN_PROTOCOL;

use crate::error::ServerError;

/// QUIC transport using Quinn.
pub struct QuinnTransport {
    /// Quinn endpoint
    endpoint: Endpoint,
}

impl QuinnTransport {
    /// Create and bind a new QUIC transport.
    ///
    /// If `cert_path` and `key_path` are provided, they will be used for TLS.
    /// Otherwise, a self-signed certificate will be generated for testing.
    pub fn bind(
        address: &str,
        cert_path: Option<String>,
        key_path: Option<String>,
        idle_timeout: Duration,
    ) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let mut server_config = match (cert_path, key_path) {
            (Some(cert), Some(key)) => load_tls_config(&cert, &key)?,
            _ => generate_self_signed_config()?,
        };
        server_config.transport_config(Arc::new(transport_config(idle_timeout)?));

        let endpoint = Endpoint::server(server_config, addr)
            .map_err(|e| ServerError::Transport(format!("failed to create endpoint: {e}")))?;

        tracing::info!("QUIC transport bound to {} (idle timeout {:?})", addr, idle_timeout);

        Ok(Self { endpoint })
    }

    /// Accept a new QUIC connection.
    ///
    /// This method blocks until a connection is available.
    pub async fn accept(&self) -> Result<QuinnConnection, ServerError> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or_else(|| ServerError::Transport("endpoint closed".to_string()))?;

        let conn = incoming
            .await
            .map_err(|e| ServerError::Transport(format!("connection failed: {e}")))?;

        Ok(QuinnConnection { connection: conn })
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.endpoint
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}

/// A QUIC connection wrapper.
///
/// Clones are cheap and share the same underlying connection, so the reader
/// loop and the writer task can each hold one.
#[derive(Clone)]
pub struct QuinnConnection {
    connection: quinn::Connection,
}

impl QuinnConnection {
    /// Accept a client-opened bidirectional stream.
    pub async fn accept_bi(&self) -> Result<(SendStream, RecvStream), ServerError> {
        self.connection
            .accept_bi()
            .await
            .map_err(|e| ServerError::Transport(format!("accept_bi failed: {e}")))
    }

    /// Open a unidirectional stream for sending.
    pub async fn open_uni(&self) -> Result<SendStream, ServerError> {
        self.connection
            .open_uni()
            .await
            .map_err(|e| ServerError::Transport(format!("open_uni failed: {e}")))
    }

    /// Remote peer address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.connection.remote_address()
    }

    /// Close the connection with an error code and reason.
    pub fn close(&self, error_code: quinn::VarInt, reason: &[u8]) {
        self.connection.close(error_code, reason);
    }
}

/// Transport parameters shared by every connection.
fn transport_config(idle_timeout: Duration) -> Result<TransportConfig, ServerError> {
    let idle = IdleTimeout::try_from(idle_timeout)
        .map_err(|e| ServerError::Config(format!("invalid idle timeout {idle_timeout:?}: {e}")))?;

    let mut transport = TransportConfig::default();
    transport.max_idle_timeout(Some(idle));
    Ok(transport)
}

/// Load TLS configuration from certificate and key files.
fn load_tls_config(cert_path: &str, key_path: &str) -> Result<ServerConfig, ServerError> {
    use std::fs;

    let cert_pem = fs::read(cert_path)
        .map_err(|e| ServerError::Config(format!("failed to read cert '{cert_path}': {e}")))?;

    let key_pem = fs::read(key_path)
        .map_err(|e| ServerError::Config(format!("failed to read key '{key_path}': {e}")))?;

    let certs = rustls_pemfile::certs(&mut &cert_pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Config(format!("failed to parse certificates: {e}")))?;

    if certs.is_empty() {
        return Err(ServerError::Config(format!("no certificates in '{cert_path}'")));
    }

    let key = rustls_pemfile::private_key(&mut &key_pem[..])
        .map_err(|e| ServerError::Config(format!("failed to parse private key: {e}")))?
        .ok_or_else(|| ServerError::Config("no private key found".to_string()))?;

    let mut tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Config(format!("invalid TLS config: {e}")))?;

    tls_config.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    quic_server_config(tls_config)
}

/// Generate a self-signed certificate for testing.
fn generate_self_signed_config() -> Result<ServerConfig, ServerError> {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .map_err(|e| ServerError::Config(format!("failed to generate self-signed cert: {e}")))?;

    let cert_der = cert.cert.der().clone();
    let key = rustls::pki_types::PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

    let mut tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert_der], key.into())
        .map_err(|e| ServerError::Config(format!("invalid TLS config: {e}")))?;

    tls_config.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    tracing::warn!("Using self-signed certificate - not for production use!");

    quic_server_config(tls_config)
}

fn quic_server_config(tls_config: rustls::ServerConfig) -> Result<ServerConfig, ServerError> {
    let crypto = quinn::crypto::rustls::QuicServerConfig::try_from(tls_config)
        .map_err(|e| ServerError::Config(format!("QUIC config error: {e}")))?;

    Ok(ServerConfig::with_crypto(Arc::new(crypto)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const IDLE: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn transport_binds_with_self_signed() {
        let transport = QuinnTransport::bind("127.0.0.1:0", None, None, IDLE);
        assert!(transport.is_ok(), "Transport should bind with self-signed cert");

        let addr = transport.unwrap().local_addr().unwrap();
        assert_ne!(addr.port(), 0, "Should have assigned a port");
    }

    #[tokio::test]
    async fn transport_rejects_invalid_address() {
        let result = QuinnTransport::bind("invalid:address:format", None, None, IDLE);
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn transport_loads_pem_files() {
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        let mut key = tempfile::NamedTempFile::new().unwrap();
        cert.write_all(generated.cert.pem().as_bytes()).unwrap();
        key.write_all(generated.key_pair.serialize_pem().as_bytes()).unwrap();

        let result = QuinnTransport::bind(
            "127.0.0.1:0",
            Some(cert.path().display().to_string()),
            Some(key.path().display().to_string()),
            IDLE,
        );
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn transport_rejects_missing_cert_file() {
        let result = QuinnTransport::bind(
            "127.0.0.1:0",
            Some("/nonexistent/cert.pem".to_string()),
            Some("/nonexistent/key.pem".to_string()),
            IDLE,
        );
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn transport_rejects_empty_pem() {
        let cert = tempfile::NamedTempFile::new().unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();

        let result = QuinnTransport::bind(
            "127.0.0.1:0",
            Some(cert.path().display().to_string()),
            Some(key.path().display().to_string()),
            IDLE,
        );
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[test]
    fn idle_timeout_out_of_range_is_config_error() {
        let result = transport_config(Duration::from_secs(u64::MAX));
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
