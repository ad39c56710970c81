// src/provider/ollama.rs — Ollama local model provider (generation + embeddings)

use std::time::Duration;

use async_trait::async_trait;

use super::{Embedder, Generator};
use crate::infra::config::OllamaConfig;
use crate::infra::errors::DejaQError;

const PROVIDER: &str = "ollama";

pub struct OllamaProvider {
    base_url: String,
    model: String,
    embedding_model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig) -> Result<Self, DejaQError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DejaQError::unavailable(PROVIDER, e.to_string(), false))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// List locally pulled models. Used to warn early when a configured
    /// model is missing.
    pub async fn probe(&self) -> Result<Vec<String>, DejaQError> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(3))
            .send()
            .await
            .map_err(|e| {
                DejaQError::unavailable(PROVIDER, format!("Cannot reach Ollama: {e}"), false)
            })?;

        let body: serde_json::Value = resp.json().await.map_err(|e| {
            DejaQError::unavailable(PROVIDER, format!("Invalid Ollama response: {e}"), false)
        })?;

        Ok(model_names(&body))
    }

    /// Configured models not present in `available`. Tags default to
    /// `latest`, so `mistral` matches `mistral:latest`.
    pub fn missing_models(&self, available: &[String]) -> Vec<String> {
        [&self.model, &self.embedding_model]
            .into_iter()
            .filter(|wanted| {
                !available
                    .iter()
                    .any(|m| m == *wanted || m.split(':').next() == Some(wanted.as_str()))
            })
            .cloned()
            .collect()
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DejaQError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                DejaQError::unavailable(PROVIDER, e.to_string(), e.is_timeout() || e.is_connect())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DejaQError::unavailable(
                PROVIDER,
                format!("HTTP {status}: {error_body}"),
                status.is_server_error(),
            ));
        }

        response.json().await.map_err(|e| {
            DejaQError::unavailable(PROVIDER, format!("Failed to parse response: {e}"), false)
        })
    }
}

fn model_names(body: &serde_json::Value) -> Vec<String> {
    body["models"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn generate_body(model: &str, prompt: &str, system: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "prompt": prompt,
        "stream": false,
    });
    if let Some(system) = system.filter(|s| !s.is_empty()) {
        body["system"] = serde_json::json!(system);
    }
    body
}

fn parse_embedding(resp: &serde_json::Value) -> Result<Vec<f32>, DejaQError> {
    let values = resp["embedding"].as_array().ok_or_else(|| {
        DejaQError::unavailable(PROVIDER, "response has no embedding", false)
    })?;
    if values.is_empty() {
        return Err(DejaQError::unavailable(PROVIDER, "empty embedding", false));
    }
    Ok(values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

#[async_trait]
impl Generator for OllamaProvider {
    fn id(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str, guidance: Option<&str>) -> Result<String, DejaQError> {
        let body = generate_body(&self.model, prompt, guidance);
        let resp = self
            .post_json("/api/generate", &body)
            .await
            .inspect_err(|e| tracing::error!("Error generating response from Ollama: {e}"))?;

        resp["response"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| DejaQError::unavailable(PROVIDER, "response has no text", false))
    }
}

#[async_trait]
impl Embedder for OllamaProvider {
    fn id(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DejaQError> {
        let body = serde_json::json!({
            "model": self.embedding_model,
            "prompt": text,
        });
        let resp = self.post_json("/api/embeddings", &body).await?;
        parse_embedding(&resp)
    }
}
