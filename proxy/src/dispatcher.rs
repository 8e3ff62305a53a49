//! Request forwarding.
//!
//! One inbound request becomes at most one upstream request. Upstream status
//! codes pass through untouched; only transport failures are turned into the
//! generic `500 Proxy error` so upstream internals never leak to the caller.

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{self, HeaderMap};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::{redirect, Client, Url};
use tracing::{debug, error, info, warn};

use crate::config::{Environment, ProxyConfig};
use crate::route::{RouteRule, RouteTable};
use crate::{ProxyError, Result};

pub const PROXY_ERROR_BODY: &str = "Proxy error";

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Copy `headers` without hop-by-hop entries, including any named in `Connection`
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.as_str()) || listed.iter().any(|l| l == name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn proxy_error_response() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, PROXY_ERROR_BODY).into_response()
}

pub struct Dispatcher {
    routes: RouteTable,
    http: Client,
    environment: Environment,
    max_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(config.upstream_timeout)
            .build()
            .map_err(ProxyError::Upstream)?;
        Ok(Self {
            routes: config.routes,
            http,
            environment: config.environment,
            max_body_bytes: config.max_body_bytes,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Forward `req` to the upstream its path selects
    pub async fn forward(&self, req: Request) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let Some(rule) = self.routes.select(&path) else {
            warn!(target: "proxy", method = %method, path = %path, "No route for request");
            return (StatusCode::NOT_FOUND, "No route").into_response();
        };
        let url = rule.upstream_url(&path, req.uri().query());

        let (parts, body) = req.into_parts();
        // A client that drops mid-body never reads this reply
        let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(b) => b,
            Err(e) => {
                warn!(
                    target: "proxy",
                    method = %method,
                    path = %path,
                    limit = self.max_body_bytes,
                    error = %e,
                    "Rejected request body"
                );
                return (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large").into_response();
            }
        };

        let headers = self.outbound_headers(rule, &parts.headers);
        self.log_outbound(&method, &url);

        let upstream = match self
            .http
            .request(method.clone(), url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!(
                    target: "proxy",
                    method = %method,
                    url = %url,
                    error = %e,
                    timeout = e.is_timeout(),
                    "Proxy error"
                );
                return proxy_error_response();
            }
        };

        let status = upstream.status();
        self.log_upstream_status(&method, &url, status);

        let headers = strip_hop_by_hop(upstream.headers());
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }

    fn outbound_headers(&self, rule: &RouteRule, inbound: &HeaderMap) -> HeaderMap {
        let mut headers = strip_hop_by_hop(inbound);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        for (name, value) in &rule.headers {
            headers.insert(name.clone(), value.clone());
        }
        if let Some(auth) = &rule.auth {
            match auth.header_value() {
                Some(value) => {
                    headers.insert(header::AUTHORIZATION, value.clone());
                }
                None => warn!(
                    target: "proxy",
                    route = %rule.prefix,
                    secret = auth.source(),
                    "Secret not set; forwarding without authorization"
                ),
            }
        }
        headers
    }

    fn log_outbound(&self, method: &Method, url: &Url) {
        if self.environment.is_development() {
            info!(target: "proxy", method = %method, url = %url, "Proxying request");
        } else {
            debug!(target: "proxy", method = %method, url = %url, "Proxying request");
        }
    }

    fn log_upstream_status(&self, method: &Method, url: &Url, status: StatusCode) {
        if self.environment.is_development() {
            info!(target: "proxy", method = %method, url = %url, status = status.as_u16(), "Upstream response");
        } else {
            debug!(target: "proxy", method = %method, url = %url, status = status.as_u16(), "Upstream response");
        }
    }
}
