//! Startup configuration.
//!
//! The API base URL is resolved exactly once, before the first load, and the
//! resulting [`AppConfig`] is passed by reference to everything that issues requests.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_APP_NAME: &str = "災民補助申請系統";
pub const FRONTEND_CONFIG_PATH: &str = "/api/v1/config/frontend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// `--api-base` was given on the command line.
    Explicit,
    /// Returned by the backend's frontend config endpoint.
    Backend,
    /// Config endpoint unavailable; `{origin}/api/v1` assumed.
    Default,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub origin: String,
    pub api_base_url: String,
    pub app_name: String,
    pub debug: bool,
    pub source: ConfigSource,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub limit: usize,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub user_agent: String,
}

/// Values taken from the command line before the config endpoint is consulted.
#[derive(Debug, Clone)]
pub struct ConfigOverrides {
    pub origin: String,
    pub api_base: Option<String>,
    pub token: Option<String>,
    pub limit: usize,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct FrontendConfig {
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    app_name: Option<String>,
    #[serde(default)]
    debug: bool,
}

fn user_agent() -> String {
    format!("relief-review/{}", env!("CARGO_PKG_VERSION"))
}

fn trim_slash(s: &str) -> String {
    s.trim_end_matches('/').to_string()
}

/// `{origin}/api/v1`, used when the backend cannot tell us better.
pub fn default_api_base(origin: &str) -> String {
    format!("{}/api/v1", trim_slash(origin))
}

/// Relative base URLs (e.g. `/api/v1`) are resolved against the origin.
fn absolutize(origin: &str, base: &str) -> String {
    if base.starts_with("http://") || base.starts_with("https://") {
        trim_slash(base)
    } else {
        let base = base.trim_end_matches('/');
        let sep = if base.starts_with('/') { "" } else { "/" };
        format!("{}{}{}", trim_slash(origin), sep, base)
    }
}

/// Build the shared HTTP client with the configured timeout and user agent.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .timeout(timeout)
        .build()
}

async fn fetch_frontend_config(
    client: &reqwest::Client,
    origin: &str,
) -> Result<FrontendConfig, ConfigError> {
    let url = format!("{}{}", trim_slash(origin), FRONTEND_CONFIG_PATH);
    let resp = client.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(ConfigError::Status(resp.status().as_u16()));
    }
    let cfg: FrontendConfig = resp.json().await?;
    if cfg
        .api_base_url
        .as_deref()
        .map(str::trim)
        .unwrap_or("")
        .is_empty()
    {
        return Err(ConfigError::MissingBaseUrl);
    }
    Ok(cfg)
}

impl AppConfig {
    fn new(overrides: &ConfigOverrides, api_base_url: String, source: ConfigSource) -> Self {
        Self {
            origin: trim_slash(&overrides.origin),
            api_base_url,
            app_name: DEFAULT_APP_NAME.to_string(),
            debug: false,
            source,
            token: overrides.token.clone(),
            limit: overrides.limit,
            timeout: overrides.timeout,
            user_agent: user_agent(),
        }
    }

    /// Resolve the configuration once: explicit base, then backend config, then default.
    pub async fn resolve(overrides: ConfigOverrides, client: &reqwest::Client) -> Self {
        if let Some(base) = overrides.api_base.as_deref() {
            let api_base_url = absolutize(&overrides.origin, base);
            info!(%api_base_url, "using explicit API base");
            return Self::new(&overrides, api_base_url, ConfigSource::Explicit);
        }

        match fetch_frontend_config(client, &overrides.origin).await {
            Ok(remote) => {
                let base = remote.api_base_url.unwrap_or_default();
                let mut cfg = Self::new(
                    &overrides,
                    absolutize(&overrides.origin, base.trim()),
                    ConfigSource::Backend,
                );
                if let Some(name) = remote.app_name.filter(|n| !n.trim().is_empty()) {
                    cfg.app_name = name;
                }
                cfg.debug = remote.debug;
                info!(api_base_url = %cfg.api_base_url, "loaded frontend config from backend");
                cfg
            }
            Err(e) => {
                let api_base_url = default_api_base(&overrides.origin);
                warn!(error = %e, %api_base_url, "frontend config unavailable, using default");
                Self::new(&overrides, api_base_url, ConfigSource::Default)
            }
        }
    }

    pub fn applications_url(&self) -> String {
        format!("{}/applications/?limit={}", self.api_base_url, self.limit)
    }

    pub fn geocode_url(&self) -> String {
        format!("{}/api/v1/maps/geocode", self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_base_is_joined_with_origin() {
        assert_eq!(
            absolutize("http://localhost:8000/", "/api/v1/"),
            "http://localhost:8000/api/v1"
        );
        assert_eq!(
            absolutize("http://localhost:8000", "api/v1"),
            "http://localhost:8000/api/v1"
        );
        assert_eq!(
            absolutize("http://localhost:8000", "https://relief.example.org/api/v1/"),
            "https://relief.example.org/api/v1"
        );
    }

    #[test]
    fn applications_url_carries_limit() {
        let overrides = ConfigOverrides {
            origin: "http://h".into(),
            api_base: None,
            token: None,
            limit: 1000,
            timeout: Duration::from_secs(1),
        };
        let cfg = AppConfig::new(&overrides, default_api_base("http://h/"), ConfigSource::Default);
        assert_eq!(cfg.applications_url(), "http://h/api/v1/applications/?limit=1000");
        assert_eq!(cfg.geocode_url(), "http://h/api/v1/maps/geocode");
    }
}
