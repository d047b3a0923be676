use anyhow::{anyhow, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;

use crate::normalize::ResponseEnvelope;

/// Wire shape the webhook expects for one send.
#[derive(Serialize, Debug, Clone)]
pub struct RequestPayload {
    pub message: String,
    pub models: Vec<String>,
}

#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }

    /// Posts one message to the webhook and splits the body by declared
    /// content type. Non-2xx statuses and unparseable JSON bodies are plain
    /// errors; the caller folds every failure into the same chat reply.
    pub async fn send(&self, payload: &RequestPayload) -> Result<ResponseEnvelope> {
        let response = self.client.post(&self.url).json(payload).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "webhook request failed with status: {}",
                response.status()
            ));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);

        if is_json {
            Ok(ResponseEnvelope::Json(response.json().await?))
        } else {
            Ok(ResponseEnvelope::Text(response.text().await?))
        }
    }
}
