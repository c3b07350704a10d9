//! Client for the OpenAI-compatible model gateway.

use serde_json::{json, Value};
use url::Url;

use crate::config::GatewayConfig;
use crate::error::AppError;
use crate::models::ConversationMessage;

#[derive(Clone)]
pub struct ModelGateway {
    client: reqwest::Client,
    url: Url,
    model: String,
    api_key: Option<String>,
}

impl ModelGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completion_body(&self, system_prompt: &str, messages: &[ConversationMessage]) -> Value {
        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(ConversationMessage::system(system_prompt));
        all.extend_from_slice(messages);
        json!({
            "model": self.model,
            "messages": all,
            "stream": true,
        })
    }

    /// Request a streaming completion. On success the response body is the
    /// gateway's event stream, not yet read.
    pub async fn stream_completion(
        &self,
        system_prompt: &str,
        messages: &[ConversationMessage],
    ) -> Result<reqwest::Response, AppError> {
        let api_key = self.api_key.as_deref().ok_or(AppError::MissingCredential)?;

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(api_key)
            .json(&self.completion_body(system_prompt, messages))
            .send()
            .await?;

        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(response),
            429 => Err(AppError::RateLimited),
            402 => Err(AppError::PaymentRequired),
            _ => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status, body = %body, "AI gateway error");
                Err(AppError::Gateway { status })
            }
        }
    }
}
