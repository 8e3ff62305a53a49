// Proxy configuration
//
// Built once at startup from env, with an optional TOML file on top.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::route::{BearerAuth, PathRewrite, RouteRule, RouteTable};
use crate::{ProxyError, Result};

pub const DEFAULT_PORT: u16 = 1031;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;
pub const ELEVENLABS_KEY_VAR: &str = "ELEVENLABS_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Backend port used when `CHEF_BACKEND_PORT` is unset
    pub fn default_backend_port(&self) -> u16 {
        match self {
            Environment::Development => 3001,
            Environment::Production => 1041,
        }
    }
}

impl FromStr for Environment {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ProxyError::Config(format!(
                "unknown environment {other:?} (expected development or production)"
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the built-in routes point
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub backend_host: String,
    pub backend_port: u16,
    pub elevenlabs_url: String,
    pub elevenlabs_api_key: Option<String>,
}

impl Upstreams {
    pub fn from_env(environment: Environment) -> Self {
        Self {
            backend_host: env_non_empty("CHEF_BACKEND_HOST").unwrap_or_else(|| "localhost".into()),
            backend_port: env_parse("CHEF_BACKEND_PORT")
                .unwrap_or_else(|| environment.default_backend_port()),
            elevenlabs_url: env_non_empty("ELEVENLABS_API_URL")
                .unwrap_or_else(|| "https://api.elevenlabs.io".into()),
            elevenlabs_api_key: env_non_empty(ELEVENLABS_KEY_VAR),
        }
    }

    pub fn backend_url(&self) -> String {
        format!("http://{}:{}", self.backend_host, self.backend_port)
    }
}

/// Built-in route table for `environment`.
///
/// Development sends `/api/elevenlabs` straight to the provider with the key
/// attached and everything the backend serves to the local backend. Production
/// sends every path to the backend untouched.
pub fn builtin_routes(environment: Environment, upstreams: &Upstreams) -> Result<RouteTable> {
    let backend = upstreams.backend_url();
    let rules = match environment {
        Environment::Development => vec![
            RouteRule::new("/api/elevenlabs", &upstreams.elevenlabs_url)?
                .with_rewrite(PathRewrite::new("/api/elevenlabs", "/v1"))
                .with_auth(BearerAuth::new(
                    ELEVENLABS_KEY_VAR,
                    upstreams.elevenlabs_api_key.as_deref(),
                )?),
            RouteRule::new("/api/openai", &backend)?,
            RouteRule::new("/health", &backend)?,
        ],
        Environment::Production => vec![RouteRule::new("/", &backend)?],
    };
    Ok(RouteTable::new(rules))
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,
    pub routes: RouteTable,
}

impl ProxyConfig {
    /// Defaults for everything except the route table
    pub fn with_routes(environment: Environment, routes: RouteTable) -> Self {
        Self {
            environment,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            upstream_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            routes,
        }
    }

    pub fn from_env() -> Result<Self> {
        let environment = match env_non_empty("CHEF_PROXY_ENV") {
            Some(v) => v.parse()?,
            None => Environment::default(),
        };
        let upstreams = Upstreams::from_env(environment);
        let mut cfg = Self::with_routes(environment, builtin_routes(environment, &upstreams)?);
        if let Some(host) = env_non_empty("CHEF_PROXY_HOST") {
            cfg.host = host;
        }
        if let Some(port) = env_parse("CHEF_PROXY_PORT") {
            cfg.port = port;
        }
        if let Some(ms) = env_parse::<u64>("CHEF_PROXY_TIMEOUT_MS") {
            cfg.upstream_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = env_parse("CHEF_PROXY_MAX_BODY_BYTES") {
            cfg.max_body_bytes = max;
        }
        Ok(cfg)
    }

    /// Env config, overlaid with the TOML file named by `CHEF_PROXY_CONFIG` if set
    pub fn load() -> Result<Self> {
        let cfg = Self::from_env()?;
        match env_non_empty("CHEF_PROXY_CONFIG") {
            Some(path) => cfg.overlay_file(Path::new(&path)),
            None => Ok(cfg),
        }
    }

    pub fn overlay_file(self, path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        info!(target: "proxy", path = %path.display(), "Loaded proxy config file");
        self.overlay_toml(&raw)
    }

    /// Apply a TOML document. `[[routes]]`, when present, replace the table;
    /// otherwise a file that sets `environment` gets that environment's built-in table.
    pub fn overlay_toml(mut self, raw: &str) -> Result<Self> {
        let file: ProxyToml = toml::from_str(raw)?;
        if let Some(env) = file.environment {
            self.environment = env.parse()?;
            if file.routes.is_none() {
                self.routes =
                    builtin_routes(self.environment, &Upstreams::from_env(self.environment))?;
            }
        }
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(ms) = file.timeout_ms {
            self.upstream_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = file.max_body_bytes {
            self.max_body_bytes = max;
        }
        if let Some(routes) = file.routes {
            let rules = routes
                .into_iter()
                .map(RouteToml::into_rule)
                .collect::<Result<Vec<_>>>()?;
            self.routes = RouteTable::new(rules);
        }
        Ok(self)
    }

    /// Reject configurations that must not serve traffic
    pub fn validate(&self) -> Result<()> {
        if self.routes.is_empty() {
            return Err(ProxyError::Config("route table is empty".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(ProxyError::Config("max body size must be positive".into()));
        }
        if self.environment == Environment::Production {
            for rule in self.routes.rules() {
                if let Some(auth) = rule.auth.as_ref().filter(|a| !a.is_configured()) {
                    return Err(ProxyError::Config(format!(
                        "route {} needs {} in production",
                        rule.prefix,
                        auth.source()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProxyToml {
    environment: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    timeout_ms: Option<u64>,
    max_body_bytes: Option<usize>,
    routes: Option<Vec<RouteToml>>,
}

#[derive(Debug, Deserialize)]
struct RouteToml {
    prefix: String,
    target: String,
    rewrite: Option<PathRewrite>,
    #[serde(default)]
    headers: HashMap<String, String>,
    /// Env var holding the bearer secret
    bearer_env: Option<String>,
}

impl RouteToml {
    fn into_rule(self) -> Result<RouteRule> {
        let mut rule = RouteRule::new(&self.prefix, &self.target)?;
        if let Some(rw) = self.rewrite {
            rule = rule.with_rewrite(rw);
        }
        for (name, value) in &self.headers {
            rule = rule.with_header(name, value)?;
        }
        if let Some(var) = self.bearer_env.as_deref() {
            rule = rule.with_auth(BearerAuth::from_env(var)?);
        }
        Ok(rule)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_non_empty(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstreams(key: Option<&str>) -> Upstreams {
        Upstreams {
            backend_host: "localhost".into(),
            backend_port: 3001,
            elevenlabs_url: "https://api.elevenlabs.io".into(),
            elevenlabs_api_key: key.map(str::to_string),
        }
    }

    #[test]
    fn environment_parses_short_names() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!(" Production ".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
        assert_eq!(Environment::default(), Environment::Production);
    }

    #[test]
    fn development_table_matches_documented_routes() {
        let table = builtin_routes(Environment::Development, &upstreams(Some("k"))).unwrap();
        let prefixes: Vec<_> = table.rules().iter().map(|r| r.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["/api/elevenlabs", "/api/openai", "/health"]);
        assert!(table.select("/recipes").is_none());
    }

    #[test]
    fn production_rejects_missing_secret_only_where_required() {
        let dev_routes = builtin_routes(Environment::Development, &upstreams(None)).unwrap();
        let dev = ProxyConfig::with_routes(Environment::Development, dev_routes.clone());
        assert!(dev.validate().is_ok());

        let prod = ProxyConfig::with_routes(Environment::Production, dev_routes);
        let err = prod.validate().unwrap_err().to_string();
        assert!(err.contains(ELEVENLABS_KEY_VAR));

        let prod_routes = builtin_routes(Environment::Production, &upstreams(None)).unwrap();
        assert!(ProxyConfig::with_routes(Environment::Production, prod_routes)
            .validate()
            .is_ok());
    }

    #[test]
    fn empty_table_is_invalid() {
        let cfg = ProxyConfig::with_routes(Environment::Development, RouteTable::default());
        assert!(cfg.validate().is_err());
    }
}
