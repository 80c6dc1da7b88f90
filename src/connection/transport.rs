//! Byte-stream transport to the IRC server.
//!
//! Provides a unified stream type for plaintext and TLS connections so the
//! pumps are agnostic to transport security.

use std::io::{self, BufReader, Cursor};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls_pemfile::certs;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{debug, warn};

use crate::error::ClientError;

/// A connected stream to the server.
pub enum TransportStream {
    /// Plaintext TCP connection.
    Plain(TcpStream),
    /// TLS-encrypted connection.
    Tls(Box<TlsStream<TcpStream>>),
}

impl TransportStream {
    /// Returns true if this is a TLS-encrypted connection.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl AsyncRead for TransportStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for TransportStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Host part of a `host:port` address, with IPv6 brackets removed.
pub(crate) fn host_of(address: &str) -> &str {
    let host = match address.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() => host,
        _ => address,
    };
    host.trim_start_matches('[').trim_end_matches(']')
}

/// Open a connection to `address`, optionally wrapped in TLS.
///
/// TLS roots are the platform's native certificates plus, when given, every
/// certificate in the PEM file at `extra_ca`.
pub async fn dial(
    address: &str,
    tls: bool,
    extra_ca: Option<&Path>,
) -> Result<TransportStream, ClientError> {
    let tcp = TcpStream::connect(address)
        .await
        .map_err(|e| ClientError::Connect {
            address: address.to_string(),
            source: Arc::new(e),
        })?;
    if let Err(e) = tcp.set_nodelay(true) {
        debug!(error = %e, "Failed to set TCP_NODELAY");
    }

    if !tls {
        return Ok(TransportStream::Plain(tcp));
    }

    let tls_err = |reason: String| ClientError::Tls {
        address: address.to_string(),
        reason,
    };

    let roots = root_store(extra_ca).map_err(|e| tls_err(e.to_string()))?;
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let server_name =
        ServerName::try_from(host_of(address).to_string()).map_err(|e| tls_err(e.to_string()))?;

    let stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| tls_err(e.to_string()))?;

    Ok(TransportStream::Tls(Box::new(stream)))
}

fn root_store(extra_ca: Option<&Path>) -> io::Result<RootCertStore> {
    let mut roots = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for cert in native.certs {
        if let Err(e) = roots.add(cert) {
            warn!("Failed to add root cert: {}", e);
        }
    }
    for e in &native.errors {
        warn!("Error loading native certs: {}", e);
    }

    if let Some(path) = extra_ca {
        let pem = std::fs::read(path)?;
        let reader = &mut BufReader::new(Cursor::new(pem));
        let extra: Vec<CertificateDer<'static>> = certs(reader).collect::<Result<Vec<_>, _>>()?;
        if extra.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("no certificates found in {}", path.display()),
            ));
        }
        let (added, ignored) = roots.add_parsable_certificates(extra);
        debug!(added, ignored, path = %path.display(), "Loaded extra CA certificates");
    }

    Ok(roots)
}
