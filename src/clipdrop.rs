use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use crate::backend::ImageBackend;
use crate::error::BackendError;
use crate::settings::Settings;

const DEFAULT_BASE_URL: &str = "https://clipdrop-api.co";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Clipdrop text-to-image client used as the pipeline's image backend.
/// One multipart POST per attempt; the retry loop lives in the renderer,
/// not here.
#[derive(Debug, Clone)]
pub struct ClipdropClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ClipdropClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        let api_key = settings
            .clipdrop_api_key
            .clone()
            .or_else(|| std::env::var("CLIPDROP_API_KEY").ok())
            .ok_or(BackendError::MissingKey)?;
        let base_url = settings
            .clipdrop_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl ImageBackend for ClipdropClient {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/text-to-image/v1", self.base_url.trim_end_matches('/'));
        let part = Part::text(prompt.to_string())
            .mime_str("text/plain")
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let form = Form::new().part("prompt", part);

        let resp = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BackendError::Status {
                status: resp.status().as_u16(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
