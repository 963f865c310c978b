use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::TextBackend;
use crate::error::BackendError;
use crate::settings::Settings;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPartsRequestText {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContentRequest {
    parts: Vec<GeminiPartsRequestText>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiRequestBody {
    contents: Vec<GeminiContentRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPartText {
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContentResponse {
    parts: Option<Vec<GeminiPartText>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiResponseBody {
    candidates: Option<Vec<GeminiCandidate>>,
}

/// Gemini `generateContent` client used as the pipeline's text backend.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        let api_key = settings
            .gemini_api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or(BackendError::MissingKey)?;
        let model = settings
            .gemini_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl TextBackend for GeminiClient {
    async fn generate_text(&self, instruction: &str) -> Result<String, BackendError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = GeminiRequestBody {
            contents: vec![GeminiContentRequest {
                parts: vec![GeminiPartsRequestText {
                    text: instruction.to_string(),
                }],
            }],
        };

        let resp = self
            .client
            .post(url)
            .header("X-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BackendError::Status {
                status: resp.status().as_u16(),
            });
        }

        let value: GeminiResponseBody = resp
            .json()
            .await
            .map_err(|e| BackendError::Transport(format!("gemini parse error: {e}")))?;

        if let Some(cands) = value.candidates {
            for cand in cands {
                if let Some(content) = cand.content {
                    if let Some(parts) = content.parts {
                        for p in parts {
                            if let Some(t) = p.text {
                                if !t.is_empty() {
                                    return Ok(t);
                                }
                            }
                        }
                    }
                }
            }
        }

        Err(BackendError::NoContent)
    }
}
