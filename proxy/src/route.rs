//! Route rules and longest-prefix selection.
//!
//! Rules are fixed at startup. A request path picks exactly one rule: the one
//! with the longest prefix that matches on a segment boundary.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::Deserialize;

use crate::{ProxyError, Result};

/// Replace a leading `strip` with `replace`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathRewrite {
    pub strip: String,
    pub replace: String,
}

impl PathRewrite {
    pub fn new(strip: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            strip: strip.into(),
            replace: replace.into(),
        }
    }

    /// Paths that do not start with `strip` come back unchanged
    pub fn apply(&self, path: &str) -> String {
        match path.strip_prefix(self.strip.as_str()) {
            Some(rest) => {
                let joined = format!("{}{}", self.replace.trim_end_matches('/'), rest);
                if joined.starts_with('/') {
                    joined
                } else {
                    format!("/{joined}")
                }
            }
            None => path.to_string(),
        }
    }
}

/// `Authorization: Bearer <secret>` injection.
///
/// The secret is resolved once at startup. `source` names where it should
/// come from (an env var) so a missing secret can be reported.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    source: String,
    value: Option<HeaderValue>,
}

impl BearerAuth {
    pub fn new(source: impl Into<String>, secret: Option<&str>) -> Result<Self> {
        let source = source.into();
        let value = match secret.map(str::trim).filter(|s| !s.is_empty()) {
            Some(secret) => {
                let mut v = HeaderValue::from_str(&format!("Bearer {secret}")).map_err(|_| {
                    ProxyError::Config(format!("{source} contains characters not allowed in a header"))
                })?;
                v.set_sensitive(true);
                Some(v)
            }
            None => None,
        };
        Ok(Self { source, value })
    }

    /// Read the secret from the env var `var`
    pub fn from_env(var: &str) -> Result<Self> {
        let secret = std::env::var(var).ok();
        Self::new(var, secret.as_deref())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_configured(&self) -> bool {
        self.value.is_some()
    }

    pub fn header_value(&self) -> Option<&HeaderValue> {
        self.value.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct RouteRule {
    pub prefix: String,
    pub target: Url,
    pub rewrite: Option<PathRewrite>,
    pub headers: HeaderMap,
    pub auth: Option<BearerAuth>,
}

impl RouteRule {
    pub fn new(prefix: &str, target: &str) -> Result<Self> {
        let target = Url::parse(target)
            .map_err(|e| ProxyError::Config(format!("invalid target {target:?}: {e}")))?;
        if target.cannot_be_a_base() || !matches!(target.scheme(), "http" | "https") {
            return Err(ProxyError::Config(format!(
                "target {target} must be an http(s) URL"
            )));
        }
        Ok(Self {
            prefix: normalize_prefix(prefix),
            target,
            rewrite: None,
            headers: HeaderMap::new(),
            auth: None,
        })
    }

    pub fn with_rewrite(mut self, rewrite: PathRewrite) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProxyError::Config(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ProxyError::Config(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_auth(mut self, auth: BearerAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Prefix match on a path-segment boundary; `/` matches everything
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Upstream URL for an inbound path and query
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> Url {
        let path = match &self.rewrite {
            Some(rw) => rw.apply(path),
            None => path.to_string(),
        };
        let mut url = self.target.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}{path}"));
        url.set_query(query);
        url
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Longest matching prefix wins; ties go to the rule listed first
    pub fn select(&self, path: &str) -> Option<&RouteRule> {
        let mut best: Option<&RouteRule> = None;
        for rule in self.rules.iter().filter(|r| r.matches(path)) {
            if best.map_or(true, |b| rule.prefix.len() > b.prefix.len()) {
                best = Some(rule);
            }
        }
        best
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
