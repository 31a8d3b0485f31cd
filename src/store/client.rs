use super::response::ApplicationsPayload;
use crate::config::AppConfig;
use crate::error::FetchError;
use crate::model::ApplicationRecord;
use tracing::{debug, info};

/// HTTP client for the backend's application list.
#[derive(Clone)]
pub struct ApplicationsClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl ApplicationsClient {
    pub fn new(cfg: &AppConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            url: cfg.applications_url(),
            token: cfg.token.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and normalize the application list.
    pub async fn fetch(&self) -> Result<Vec<ApplicationRecord>, FetchError> {
        let mut req = self.http.get(&self.url);
        if let Some(token) = self.token.as_deref() {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|source| FetchError::Transport {
            url: self.url.clone(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let payload: ApplicationsPayload =
            resp.json().await.map_err(|source| FetchError::Decode {
                url: self.url.clone(),
                source,
            })?;
        debug!(shape = payload.shape(), "decoded applications payload");

        let records = payload.into_records();
        info!(count = records.len(), "loaded applications");
        Ok(records)
    }
}
