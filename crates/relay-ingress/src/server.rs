//! The ingress HTTP server.
//!
//! A task-per-connection hyper server. `bind` and `serve` are split so
//! the daemon (and tests) can learn the bound address, and `serve`
//! demands the registry's [`Prewarmed`] token: a server with a cold
//! trigger cache would reject all legitimate traffic, so that ordering
//! is enforced at compile time.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};

use relay_registry::Prewarmed;

use crate::pipeline::Ingress;

/// Upper bound on one request end to end, dispatch included. A slow
/// subscriber must not pin a connection task forever.
const REQUEST_DEADLINE: Duration = Duration::from_secs(60);

/// The ingress server: accept loop plus per-connection tasks.
pub struct IngressServer {
    listener: TcpListener,
    ingress: Arc<Ingress>,
}

impl IngressServer {
    /// Bind the listening socket without accepting traffic yet.
    pub async fn bind(addr: SocketAddr, ingress: Arc<Ingress>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("failed to bind ingress listener")?;
        Ok(Self { listener, ingress })
    }

    /// The actual bound address (useful with port 0).
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read ingress local address")
    }

    /// Serve until the shutdown signal flips.
    ///
    /// New connections stop being accepted immediately on shutdown;
    /// in-flight requests finish within their deadline on their own
    /// tasks.
    pub async fn serve(
        self,
        _warm: Prewarmed,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        info!(addr = %self.local_addr()?, "ingress listening");

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    let (stream, peer_addr) = accept_result.context("accept failed")?;
                    let ingress = self.ingress.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(move |req| {
                            let ingress = ingress.clone();
                            async move {
                                let response =
                                    tokio::time::timeout(REQUEST_DEADLINE, ingress.handle(req))
                                        .await
                                        .unwrap_or_else(|_| {
                                            error!(%peer_addr, "request exceeded deadline");
                                            Response::builder()
                                                .status(http::StatusCode::INTERNAL_SERVER_ERROR)
                                                .body(Full::new(Bytes::new()))
                                                .unwrap()
                                        });
                                Ok::<_, hyper::Error>(response)
                            }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                            error!(%peer_addr, error = %e, "connection error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("ingress shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
