use reqwest::Client as HttpClient;
use shared::{GenerateRequest, GenerateResponse};

use crate::config::RelayConfig;

use super::models::RelayError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Forwards edit requests to the hosted image model. Holds the credential so
/// the browser never sees it.
#[derive(Clone)]
pub struct GeminiService {
    http_client: HttpClient,
    api_key: Option<String>,
    endpoint: String,
}

impl GeminiService {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let http_client = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url, config.model
            ),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// One upstream call. Retrying is left to the caller.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, RelayError> {
        let api_key = self.api_key.as_deref().ok_or(RelayError::MissingCredential)?;

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
