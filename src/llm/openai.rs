use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::config::settings::LlmSettings;
use crate::core::errors::RagError;

/// OpenAI-compatible HTTP provider (`/v1/chat/completions`, `/v1/embeddings`).
///
/// Works against api.openai.com and any server speaking the same protocol.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, RagError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self, RagError> {
        Self::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, RagError> {
        let url = format!("{}/v1/models", self.base_url);
        let res = self.authorize(self.client.get(&url)).send().await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, RagError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        let res = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Llm(format!("chat error ({}): {}", status, text)));
        }

        let payload: Value = res.json().await?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| RagError::Llm("chat response carried no message content".to_string()))
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Llm(format!("embed error ({}): {}", status, text)));
        }

        let mut payload: EmbeddingResponse = res.json().await?;
        payload.data.sort_by_key(|item| item.index);

        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}
