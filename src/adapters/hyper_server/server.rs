use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ServerBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::adapter::HyperGatewayAdapter;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Accept connections until `shutdown` resolves, then drain in-flight requests.
///
/// Every connection is served on its own task; nothing is shared between
/// them except the adapter.
pub async fn serve<F>(listener: TcpListener, adapter: Arc<HyperGatewayAdapter>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let builder = ServerBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    info!("Listening on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let io = TokioIo::new(stream);
                let adapter = adapter.clone();
                let service = service_fn(move |req| {
                    let adapter = adapter.clone();
                    async move { Ok::<_, Infallible>(adapter.handle(req).await) }
                });

                let conn = graceful.watch(builder.serve_connection(io, service).into_owned());
                tokio::spawn(async move {
                    if let Err(err) = conn.await {
                        debug!("Connection from {} closed with error: {}", peer, err);
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);

    tokio::select! {
        _ = graceful.shutdown() => {
            info!("All connections closed");
        }
        _ = tokio::time::sleep(DRAIN_TIMEOUT) => {
            warn!("Timed out waiting for connections to close");
        }
    }

    Ok(())
}
