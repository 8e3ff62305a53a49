// AI Chef Proxy
// Forwards API calls to the TTS provider and the backend, one upstream per request

pub mod config;
pub mod dispatcher;
pub mod route;
pub mod server;

pub use config::{Environment, ProxyConfig, Upstreams};
pub use dispatcher::Dispatcher;
pub use route::{BearerAuth, PathRewrite, RouteRule, RouteTable};
pub use server::ProxyServer;

use thiserror::Error;

/// Proxy errors. None of these reach an HTTP client verbatim.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ProxyError>;
