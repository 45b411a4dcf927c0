//! HTTP/1.1 accept loop.
//!
//! Connections are driven by hyper directly so the header/idle deadline can be
//! set per connection; the axum router is plugged in as the tower service.

use std::future::Future;
use std::time::Duration;

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;

/// Serve `app` until `shutdown` resolves, then wait up to `drain` for open
/// connections.
///
/// A connection that does not deliver a complete request head within
/// `idle_timeout` (on a fresh connection or between keep-alive requests) is
/// closed.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    idle_timeout: Duration,
    drain: Duration,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(idle_timeout);

    let graceful = GracefulShutdown::new();
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        let stream = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _peer)) => stream,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
            () = &mut shutdown => break,
        };
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(error = %err, "failed to set TCP_NODELAY");
        }

        let service = TowerToHyperService::new(app.clone());
        let connection =
            graceful.watch(builder.serve_connection(TokioIo::new(stream), service));
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::debug!(error = %err, "connection closed with error");
            }
        });
    }

    drop(listener);
    if tokio::time::timeout(drain, graceful.shutdown()).await.is_err() {
        tracing::warn!("open connections did not close before the drain deadline");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::routing::get;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn start(
        idle_timeout: Duration,
    ) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/ping", get(|| async { "pong" }));
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(
            listener,
            app,
            idle_timeout,
            Duration::from_secs(2),
            async move {
                let _ = stopped.await;
            },
        ));
        (addr, stop, handle)
    }

    #[tokio::test]
    async fn serves_requests() {
        let (addr, _stop, _handle) = start(Duration::from_secs(5)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /ping HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();

        let response = String::from_utf8_lossy(&response);
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("pong"));
    }

    #[tokio::test]
    async fn silent_connection_is_closed_after_idle_timeout() {
        let (addr, _stop, _handle) = start(Duration::from_millis(200)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut buf = Vec::new();
        let closed = tokio::time::timeout(Duration::from_secs(3), stream.read_to_end(&mut buf)).await;

        assert!(closed.is_ok(), "server kept a silent connection open");
    }

    #[tokio::test]
    async fn stops_accepting_after_shutdown() {
        let (addr, stop, handle) = start(Duration::from_secs(5)).await;

        stop.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
    }
}
