use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::service::TowerToHyperService;
use music_api::{create_management_routes, AppState};
use music_infrastructure::sync::tls::{load_certs, load_private_key};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The management API listener, guarded by the API key. Serves TLS when
/// `apiserver.cert_file`/`key_file` are configured, plain HTTP (bind it
/// to loopback or a management network) otherwise.
pub async fn serve_management(
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.apiserver.address, state.config.apiserver.port
    )
    .parse()?;

    let tls = match (
        &state.config.apiserver.cert_file,
        &state.config.apiserver.key_file,
    ) {
        (Some(cert_file), Some(key_file)) => {
            let config = rustls::ServerConfig::builder()
                .with_no_client_auth()
                .with_single_cert(load_certs(cert_file)?, load_private_key(key_file)?)?;
            Some(TlsAcceptor::from(Arc::new(config)))
        }
        _ => None,
    };

    let app = create_management_routes(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, tls = tls.is_some(), "Management API listening");

    let Some(acceptor) = tls else {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        info!("Management API stopped");
        return Ok(());
    };

    loop {
        let (stream, peer_addr) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Management API stopped");
                return Ok(());
            }
            accepted = listener.accept() => accepted?,
        };

        let acceptor = acceptor.clone();
        let app = app.clone();
        let shutdown = shutdown.clone();

        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!(peer = %peer_addr, error = %e, "TLS handshake failed");
                    return;
                }
            };

            let service = TowerToHyperService::new(app);
            let conn = ConnBuilder::new(TokioExecutor::new());
            tokio::select! {
                _ = shutdown.cancelled() => {}
                result = conn.serve_connection(TokioIo::new(tls_stream), service) => {
                    if let Err(e) = result {
                        warn!(peer = %peer_addr, error = %e, "Management connection error");
                    }
                }
            }
        });
    }
}
