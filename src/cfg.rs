use std::{env, sync::OnceLock, time::Duration};

use url::Url;

pub const AGENT_SCRIPT_URL: &str = "/static/service-worker.js";
pub const AGENT_SCOPE: &str = "/";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the server collaborator. Env: `PUSH_SERVER_URL`
    pub server_url: Url,
    /// Origin the agent is registered on. Env: `PUSH_ORIGIN`, defaults to the server URL.
    pub origin: Url,
    /// Env: `PUSH_PRODUCT_NAME`
    pub product_name: String,
    /// Env: `PUSH_CACHE_PREFIX`
    pub cache_prefix: String,
    /// Generation tag of the static asset cache. Env: `PUSH_CACHE_VERSION`
    pub cache_version: String,
    /// Notification icon and badge. Env: `PUSH_ICON`
    pub icon: String,
    /// Env: `PUSH_REQUEST_TIMEOUT_SECS`
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let server_url = Url::parse("http://localhost:8080").expect("static url");
        Self {
            origin: server_url.clone(),
            server_url,
            product_name: "Jim.Tennis".to_string(),
            cache_prefix: "jim-tennis".to_string(),
            cache_version: "v1".to_string(),
            icon: "/static/icon-192.svg".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Reads `PUSH_*` variables, keeping the default for anything missing or invalid.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = read_url("PUSH_SERVER_URL") {
            config.server_url = url;
        }
        config.origin = read_url("PUSH_ORIGIN").unwrap_or_else(|| config.server_url.clone());
        if let Ok(name) = env::var("PUSH_PRODUCT_NAME") {
            config.product_name = name;
        }
        if let Ok(prefix) = env::var("PUSH_CACHE_PREFIX") {
            config.cache_prefix = prefix;
        }
        if let Ok(version) = env::var("PUSH_CACHE_VERSION") {
            config.cache_version = version;
        }
        if let Ok(icon) = env::var("PUSH_ICON") {
            config.icon = icon;
        }
        if let Ok(secs) = env::var("PUSH_REQUEST_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %secs, "invalid PUSH_REQUEST_TIMEOUT_SECS, using default"),
            }
        }

        config
    }

    /// Name of the live static asset cache.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }
}

fn read_url(key: &str) -> Option<Url> {
    let value = env::var(key).ok()?;
    match Url::parse(&value) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(key, value = %value, error = %e, "invalid url, using default");
            None
        }
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Loads `.env` and installs the process-wide config. Later calls keep the first one.
pub fn init_config() {
    dotenvy::dotenv().ok();
    CONFIG.get_or_init(Config::from_env);
}

#[inline]
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}
