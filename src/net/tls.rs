//! TLS listener built on rustls.
//!
//! Each accepted connection is TLS-terminated and served by hyper's auto
//! (HTTP/1.1 + HTTP/2) connection builder, with upgrades enabled so
//! WebSocket traffic works over TLS too.

use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio_rustls::rustls::pki_types::PrivateKeyDer;
use tokio_rustls::rustls::ServerConfig as RustlsConfig;
use tokio_rustls::TlsAcceptor;
use tower::Service;

/// Error type for the TLS listener.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no private key found in key file")]
    MissingKey,
    #[error("TLS configuration error: {0}")]
    Config(#[from] tokio_rustls::rustls::Error),
}

/// Load certificates and key, then accept-and-serve until ctrl-c.
pub async fn serve(
    router: Router,
    listener: TcpListener,
    cert_path: &Path,
    key_path: &Path,
) -> Result<(), TlsError> {
    let certs = {
        let mut reader = BufReader::new(std::fs::File::open(cert_path)?);
        rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?
    };
    let key: PrivateKeyDer<'static> = {
        let mut reader = BufReader::new(std::fs::File::open(key_path)?);
        rustls_pemfile::private_key(&mut reader)?.ok_or(TlsError::MissingKey)?
    };

    // Make the provider choice explicit so builder() cannot observe two
    // compiled-in providers.
    let _ = tokio_rustls::rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut tls_config = RustlsConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    tls_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    let acceptor = TlsAcceptor::from(Arc::new(tls_config));

    let mut make_service = router.into_make_service_with_connect_info::<SocketAddr>();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let acceptor = acceptor.clone();
                let service = make_service
                    .call(peer)
                    .await
                    .unwrap_or_else(|infallible| match infallible {});

                tokio::spawn(async move {
                    let tls_stream = match acceptor.accept(stream).await {
                        Ok(stream) => stream,
                        Err(err) => {
                            tracing::debug!(peer = %peer, error = %err, "TLS handshake failed");
                            return;
                        }
                    };
                    if let Err(err) = Builder::new(TokioExecutor::new())
                        .serve_connection_with_upgrades(
                            TokioIo::new(tls_stream),
                            TowerToHyperService::new(service),
                        )
                        .await
                    {
                        tracing::debug!(peer = %peer, error = %err, "connection error");
                    }
                });
            }
        }
    }
}
