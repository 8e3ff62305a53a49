// Proxy HTTP server
//
// Every method and path lands on the dispatcher through the router fallback.

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ProxyConfig;
use crate::dispatcher::Dispatcher;
use crate::Result;

pub struct ProxyServer {
    config: ProxyConfig,
    dispatcher: Arc<Dispatcher>,
}

impl ProxyServer {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let dispatcher = Arc::new(Dispatcher::new(config.clone())?);
        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(Arc::clone(&self.dispatcher))
            .layer(middleware::from_fn(log_timing))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve_with_listener(listener).await
    }

    pub async fn serve_with_listener(self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves, letting in-flight requests finish
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        self.log_startup();
        let app = self.router();
        info!(target: "proxy", url = %format!("http://{}", addr), "Proxy server ready");

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;

        info!(target: "proxy", "Proxy server stopped");
        Ok(())
    }

    fn log_startup(&self) {
        info!(
            target: "proxy",
            environment = %self.config.environment,
            routes = self.config.routes.len(),
            timeout_ms = self.config.upstream_timeout.as_millis() as u64,
            "Starting proxy server"
        );
        for rule in self.config.routes.rules() {
            info!(
                target: "proxy",
                prefix = %rule.prefix,
                target_url = %rule.target,
                rewrite = ?rule.rewrite.as_ref().map(|r| format!("{} -> {}", r.strip, r.replace)),
                "Route"
            );
            if let Some(auth) = &rule.auth {
                if auth.is_configured() {
                    info!(target: "proxy", prefix = %rule.prefix, secret = auth.source(), "Secret configured");
                } else {
                    warn!(target: "proxy", prefix = %rule.prefix, secret = auth.source(), "Secret not configured");
                }
            }
        }
    }
}

async fn proxy_handler(State(dispatcher): State<Arc<Dispatcher>>, req: Request) -> Response {
    dispatcher.forward(req).await
}

async fn log_timing(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let ms = start.elapsed().as_millis();
    info!(
        target: "proxy",
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        ms
    );
    response
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(target: "proxy", "Shutdown signal received"),
        Err(e) => {
            error!(target: "proxy", error = %e, "Failed to listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
