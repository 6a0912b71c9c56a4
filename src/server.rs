//! HTTP server lifecycle: serve until a shutdown signal, then drain.

use std::{io, net::SocketAddr, time::Duration};

use axum::Router;
use tokio::{net::TcpListener, sync::oneshot, task::JoinError};

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// After the signal the listener stops accepting, in-flight requests get up
/// to `grace` to finish, and whatever is still running after that is
/// abandoned. Peer addresses are attached to each request as
/// `ConnectInfo<SocketAddr>` for the rate limiter.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    grace: Duration,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut running = tokio::spawn(server.into_future());

    tokio::select! {
        finished = &mut running => return flatten(finished),
        () = shutdown => {}
    }

    tracing::info!(grace_secs = grace.as_secs(), "Shutting down the server gracefully");
    let _ = stop_tx.send(());

    match tokio::time::timeout(grace, &mut running).await {
        Ok(finished) => flatten(finished),
        Err(_) => {
            tracing::warn!("Grace period elapsed, closing remaining connections");
            running.abort();
            Ok(())
        }
    }
}

fn flatten(finished: Result<io::Result<()>, JoinError>) -> io::Result<()> {
    finished.map_err(io::Error::other)?
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
