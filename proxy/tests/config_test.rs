use chef_proxy::config::{DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
use chef_proxy::{Environment, ProxyConfig};
use serial_test::serial;
use std::time::Duration;

const KEYS: &[&str] = &[
    "CHEF_PROXY_ENV",
    "CHEF_PROXY_HOST",
    "CHEF_PROXY_PORT",
    "CHEF_BACKEND_HOST",
    "CHEF_BACKEND_PORT",
    "ELEVENLABS_API_KEY",
    "ELEVENLABS_API_URL",
    "CHEF_PROXY_TIMEOUT_MS",
    "CHEF_PROXY_MAX_BODY_BYTES",
    "CHEF_PROXY_CONFIG",
    "TEST_ROUTE_TOKEN",
];

fn clear_env() {
    for k in KEYS {
        std::env::remove_var(k);
    }
}

#[test]
#[serial]
fn defaults_to_production_catch_all() {
    clear_env();
    let cfg = ProxyConfig::from_env().unwrap();
    assert_eq!(cfg.environment, Environment::Production);
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.upstream_timeout, Duration::from_secs(30));
    assert_eq!(cfg.max_body_bytes, DEFAULT_MAX_BODY_BYTES);

    let rules = cfg.routes.rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].prefix, "/");
    assert_eq!(rules[0].target.as_str(), "http://localhost:1041/");
    assert!(rules[0].rewrite.is_none());
    assert!(rules[0].auth.is_none());
    assert!(rules[0].headers.is_empty());
    cfg.validate().unwrap();
}

#[test]
#[serial]
fn development_routes_use_env_targets() {
    clear_env();
    std::env::set_var("CHEF_PROXY_ENV", "development");
    std::env::set_var("CHEF_BACKEND_HOST", "127.0.0.1");
    std::env::set_var("ELEVENLABS_API_KEY", "sk-test");
    std::env::set_var("CHEF_PROXY_PORT", "8080");
    let cfg = ProxyConfig::from_env().unwrap();
    assert_eq!(cfg.environment, Environment::Development);
    assert_eq!(cfg.port, 8080);

    let eleven = cfg.routes.select("/api/elevenlabs/voices").unwrap();
    assert_eq!(eleven.target.as_str(), "https://api.elevenlabs.io/");
    assert!(eleven.auth.as_ref().unwrap().is_configured());
    assert_eq!(
        eleven.upstream_url("/api/elevenlabs/voices", None).as_str(),
        "https://api.elevenlabs.io/v1/voices"
    );

    let openai = cfg.routes.select("/api/openai/tts").unwrap();
    assert_eq!(openai.target.as_str(), "http://127.0.0.1:3001/");
    assert_eq!(cfg.routes.select("/health").unwrap().prefix, "/health");
    clear_env();
}

#[test]
#[serial]
fn development_without_key_still_validates() {
    clear_env();
    std::env::set_var("CHEF_PROXY_ENV", "dev");
    let cfg = ProxyConfig::from_env().unwrap();
    let auth = cfg.routes.select("/api/elevenlabs").unwrap().auth.clone().unwrap();
    assert!(!auth.is_configured());
    cfg.validate().unwrap();
    clear_env();
}

#[test]
#[serial]
fn unknown_environment_is_an_error() {
    clear_env();
    std::env::set_var("CHEF_PROXY_ENV", "staging");
    assert!(ProxyConfig::from_env().is_err());
    clear_env();
}

#[test]
#[serial]
fn toml_routes_replace_builtin_table() {
    clear_env();
    std::env::set_var("TEST_ROUTE_TOKEN", "tok");
    let raw = r#"
        port = 9000
        timeout_ms = 500

        [[routes]]
        prefix = "/api/elevenlabs"
        target = "http://127.0.0.1:7000"
        rewrite = { strip = "/api/elevenlabs", replace = "/v1" }
        bearer_env = "TEST_ROUTE_TOKEN"
        headers = { "x-client" = "ai-chef" }

        [[routes]]
        prefix = "/"
        target = "http://127.0.0.1:7001"
    "#;
    let cfg = ProxyConfig::from_env().unwrap().overlay_toml(raw).unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.upstream_timeout, Duration::from_millis(500));
    assert_eq!(cfg.routes.len(), 2);

    let rule = cfg.routes.select("/api/elevenlabs/voices").unwrap();
    assert_eq!(rule.headers.get("x-client").unwrap(), "ai-chef");
    assert!(rule.auth.as_ref().unwrap().is_configured());
    assert_eq!(cfg.routes.select("/other").unwrap().target.port(), Some(7001));
    cfg.validate().unwrap();
    clear_env();
}

#[test]
#[serial]
fn production_file_route_without_secret_fails_validation() {
    clear_env();
    let raw = r#"
        [[routes]]
        prefix = "/api/elevenlabs"
        target = "https://api.elevenlabs.io"
        bearer_env = "TEST_ROUTE_TOKEN"
    "#;
    let cfg = ProxyConfig::from_env().unwrap().overlay_toml(raw).unwrap();
    assert_eq!(cfg.environment, Environment::Production);
    let err = cfg.validate().unwrap_err().to_string();
    assert!(err.contains("TEST_ROUTE_TOKEN"));
}

#[test]
#[serial]
fn load_reads_file_from_env_path() {
    clear_env();
    let path = std::env::temp_dir().join(format!("chef_proxy_test_{}.toml", std::process::id()));
    std::fs::write(&path, "environment = \"development\"\nhost = \"127.0.0.1\"\n").unwrap();
    std::env::set_var("CHEF_PROXY_CONFIG", &path);

    let cfg = ProxyConfig::load().unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.environment, Environment::Development);
    assert_eq!(cfg.routes.len(), 3);
    let eleven = cfg.routes.select("/api/elevenlabs/voices").unwrap();
    assert_eq!(eleven.prefix, "/api/elevenlabs");

    std::fs::remove_file(&path).unwrap();
    clear_env();
}

#[test]
#[serial]
fn toml_environment_switch_rebuilds_builtin_table() {
    clear_env();
    std::env::set_var("ELEVENLABS_API_KEY", "sk-file");

    let cfg = ProxyConfig::from_env()
        .unwrap()
        .overlay_toml("environment = \"development\"\n")
        .unwrap();
    assert_eq!(cfg.environment, Environment::Development);

    let eleven = cfg.routes.select("/api/elevenlabs/voices").unwrap();
    assert_eq!(eleven.prefix, "/api/elevenlabs");
    assert_eq!(
        eleven.upstream_url("/api/elevenlabs/voices", None).path(),
        "/v1/voices"
    );
    assert!(eleven.auth.as_ref().unwrap().is_configured());
    let backend = cfg.routes.select("/api/openai/tts").unwrap();
    assert_eq!(backend.target.port(), Some(3001));
    assert!(cfg.routes.select("/recipes").is_none());

    let back = cfg.overlay_toml("environment = \"production\"\n").unwrap();
    assert_eq!(back.routes.len(), 1);
    assert_eq!(back.routes.select("/api/elevenlabs/voices").unwrap().prefix, "/");
    clear_env();
}

#[test]
#[serial]
fn missing_or_bad_file_is_an_error() {
    clear_env();
    std::env::set_var("CHEF_PROXY_CONFIG", "/definitely/not/here.toml");
    assert!(ProxyConfig::load().is_err());
    clear_env();

    let bad = ProxyConfig::from_env()
        .unwrap()
        .overlay_toml("[[routes]]\nprefix = \"/\"\ntarget = \"nope\"\n");
    assert!(bad.is_err());
}
