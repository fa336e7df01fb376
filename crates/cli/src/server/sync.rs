//! The TLS sync listener for peer sidecars.
//!
//! Every accepted connection requests a client certificate; when one is
//! presented its DER bytes ride into the handlers as an extension, where
//! CN and TLSA are checked against the membership. `/hello` works
//! without one.

use axum::Extension;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::service::TowerToHyperService;
use music_api::handlers::sync::ClientCertDer;
use music_api::{create_sync_routes, AppState};
use music_infrastructure::sync::tls::sync_server_config;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub async fn serve_sync(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let Some(api) = state.config.sidecar.api.clone() else {
        info!("No sidecar.api configured, sync listener disabled");
        return Ok(());
    };

    let tls_config = sync_server_config(&api.cert_file, &api.key_file)?;
    let acceptor = TlsAcceptor::from(Arc::new(tls_config));

    let bind_address = api
        .addresses
        .first()
        .cloned()
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let addr: SocketAddr = format!("{}:{}", bind_address, api.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Sync API listening (TLS)");

    let router = create_sync_routes(state);

    loop {
        let (stream, peer_addr) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Sync API stopped");
                return Ok(());
            }
            accepted = listener.accept() => accepted?,
        };

        let acceptor = acceptor.clone();
        let router = router.clone();
        let shutdown = shutdown.clone();

        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!(peer = %peer_addr, error = %e, "TLS handshake failed");
                    return;
                }
            };

            let client_cert = tls_stream
                .get_ref()
                .1
                .peer_certificates()
                .and_then(|certs| certs.first())
                .map(|cert| cert.as_ref().to_vec());

            let service = router.layer(Extension(ClientCertDer(client_cert)));
            let service = TowerToHyperService::new(service);

            let conn = ConnBuilder::new(TokioExecutor::new());
            tokio::select! {
                _ = shutdown.cancelled() => {}
                result = conn.serve_connection(TokioIo::new(tls_stream), service) => {
                    if let Err(e) = result {
                        warn!(peer = %peer_addr, error = %e, "Sync connection error");
                    }
                }
            }
        });
    }
}
