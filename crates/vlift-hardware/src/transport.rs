/*!
 * Stream transport for vlift hardware.
 *
 * This module opens the byte-stream connection to a device (plain TCP or
 * TLS-wrapped) and exposes the send/receive/release primitives the protocol
 * drivers compose. The response termination rule is protocol-defined, not
 * transport-defined: [`Connection::receive_until`] accumulates bytes until
 * the driver-supplied predicate reports the response complete, or until the
 * peer closes the connection.
 */
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, trace};

use vlift_core::config::{DeviceConfig, HardwareDefaults};
use vlift_core::utils::{duration_from_millis, with_timeout};

use crate::error::{HardwareError, Result};

/// Size of one read from the stream while accumulating a response
const RECV_CHUNK_SIZE: usize = 1024;

/// Network endpoint of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Hostname or IP address of the server
    pub host: String,
    /// Network port of the server
    pub port: u16,
    /// Whether the server expects TLS wrapped communication
    pub use_tls: bool,
}

impl Endpoint {
    /// Create an endpoint from a device configuration entry
    pub fn from_device(device: &DeviceConfig) -> Self {
        Self {
            host: device.host.clone(),
            port: device.port,
            use_tls: device.use_tls,
        }
    }

    /// The `host:port` authority string
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Hook for customizing the TLS client configuration before the handshake
///
/// A vendor driver can use this to attach a client certificate or an
/// alternate trust root.
pub type TlsCustomizer = Arc<dyn Fn(&mut rustls::ClientConfig) + Send + Sync>;

/// Options governing connection establishment and response reads
#[derive(Clone, Default)]
pub struct ConnectOptions {
    /// Timeout for establishing the connection (socket + TLS handshake)
    pub connect_timeout: Option<Duration>,
    /// Timeout bounding each read while waiting for the response
    pub read_timeout: Option<Duration>,
    /// TLS configuration hook installed by the protocol driver
    pub tls: Option<TlsCustomizer>,
}

impl ConnectOptions {
    /// Derive connection options from the configured hardware defaults
    pub fn from_defaults(defaults: &HardwareDefaults) -> Self {
        Self {
            connect_timeout: duration_from_millis(defaults.connect_timeout_ms),
            read_timeout: duration_from_millis(defaults.read_timeout_ms),
            tls: None,
        }
    }

    /// Install a TLS customization hook
    pub fn with_tls_customizer(mut self, customizer: TlsCustomizer) -> Self {
        self.tls = Some(customizer);
        self
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("tls", &self.tls.as_ref().map(|_| "customizer"))
            .finish()
    }
}

/// An established connection to a device
#[derive(Debug)]
pub enum Connection {
    /// Plain TCP stream
    Plain(TcpStream),
    /// TLS-wrapped TCP stream
    Tls(Box<TlsStream<TcpStream>>),
}

/// Open a connection to the endpoint, negotiating TLS when requested
///
/// Fails with [`HardwareError::Connect`] when the socket cannot be
/// established or the TLS handshake fails (certificate or hostname
/// mismatch included), and with [`HardwareError::Timeout`] when the
/// configured connect timeout elapses first.
pub async fn connect(endpoint: &Endpoint, options: &ConnectOptions) -> Result<Connection> {
    let addr = endpoint.authority();
    let stream = with_timeout(options.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| HardwareError::timeout(format!("connecting to {}", addr)))?
        .map_err(|e| HardwareError::connect(format!("{}: {}", addr, e)))?;
    debug!(addr = %addr, tls = endpoint.use_tls, "connected");

    if !endpoint.use_tls {
        return Ok(Connection::Plain(stream));
    }

    let mut config = rustls::ClientConfig::builder()
        .with_root_certificates(system_roots())
        .with_no_client_auth();
    if let Some(customize) = &options.tls {
        customize(&mut config);
    }
    let connector = TlsConnector::from(Arc::new(config));
    let server_name = rustls::pki_types::ServerName::try_from(endpoint.host.clone())
        .map_err(|e| HardwareError::connect(format!("invalid server name {}: {}", endpoint.host, e)))?;
    let tls = with_timeout(options.connect_timeout, connector.connect(server_name, stream))
        .await
        .map_err(|_| HardwareError::timeout(format!("TLS handshake with {}", addr)))?
        .map_err(|e| HardwareError::connect(format!("TLS handshake with {}: {}", addr, e)))?;

    Ok(Connection::Tls(Box::new(tls)))
}

fn system_roots() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

impl Connection {
    /// Send the whole payload, retrying partial writes
    pub async fn send_all(&mut self, payload: &[u8]) -> Result<()> {
        match self {
            Connection::Plain(stream) => send_all(stream, payload).await,
            Connection::Tls(stream) => send_all(stream, payload).await,
        }
    }

    /// Accumulate response bytes until `is_complete` reports the response
    /// finished or the peer closes the connection
    pub async fn receive_until<F>(&mut self, read_timeout: Option<Duration>, is_complete: F) -> Result<Bytes>
    where
        F: Fn(&[u8]) -> bool,
    {
        match self {
            Connection::Plain(stream) => receive_until(stream, read_timeout, is_complete).await,
            Connection::Tls(stream) => receive_until(stream, read_timeout, is_complete).await,
        }
    }

    /// Close the connection
    ///
    /// Callers must invoke this on every exit path; `send_command` in the
    /// driver layer does so even when the exchange failed.
    pub async fn release(mut self) -> Result<()> {
        match &mut self {
            Connection::Plain(stream) => stream.shutdown().await?,
            Connection::Tls(stream) => stream.shutdown().await?,
        }
        Ok(())
    }
}

/// Write the whole payload to the stream, looping over partial writes
///
/// Partial writes are normal and retried; a write of zero bytes means the
/// stream closed mid-transfer and fails with an I/O error.
pub async fn send_all<S>(stream: &mut S, payload: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut offset = 0;
    while offset < payload.len() {
        let written = stream.write(&payload[offset..]).await?;
        if written == 0 {
            return Err(HardwareError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "stream closed mid-write",
            )));
        }
        trace!(written, offset, "partial write");
        offset += written;
    }
    stream.flush().await?;
    Ok(())
}

/// Read from the stream until the response is complete
///
/// The default driver policy never reports completion, so accumulation
/// ends when the peer closes the connection (EOF). That is adequate only
/// for hardware that closes after one reply. Each read is bounded by
/// `read_timeout` when one is configured.
pub async fn receive_until<S, F>(stream: &mut S, read_timeout: Option<Duration>, is_complete: F) -> Result<Bytes>
where
    S: AsyncRead + Unpin,
    F: Fn(&[u8]) -> bool,
{
    let mut response = BytesMut::with_capacity(RECV_CHUNK_SIZE);
    let mut chunk = [0u8; RECV_CHUNK_SIZE];
    loop {
        let read = with_timeout(read_timeout, stream.read(&mut chunk))
            .await
            .map_err(|_| HardwareError::timeout("waiting for hardware response"))??;
        if read == 0 {
            break;
        }
        response.extend_from_slice(&chunk[..read]);
        if is_complete(&response) {
            break;
        }
    }
    Ok(response.freeze())
}
