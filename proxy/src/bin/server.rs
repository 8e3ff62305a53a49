use chef_core::telemetry::init_tracing;
use chef_proxy::{ProxyConfig, ProxyServer};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();
    init_tracing("info,chef_proxy=info,tower_http=warn");
    if let Ok(path) = dotenv {
        info!(target: "proxy", path = %path.display(), "Loaded .env");
    }

    if let Err(e) = run().await {
        error!(target: "proxy", error = %e, "Proxy server failed");
        std::process::exit(1);
    }
}

async fn run() -> chef_proxy::Result<()> {
    let config = ProxyConfig::load()?;
    config.validate()?;
    ProxyServer::new(config)?.serve().await
}
