//! OpenAI-compatible embedding provider.
//!
//! Calls `POST {base_url}/embeddings` with `{model, input}` and returns the first vector of
//! the response.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

pub struct OpenAIEmbeddingProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAIEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        anyhow::ensure!(
            !config.api_key.trim().is_empty(),
            "embedding provider \"openai\" needs [embedding].api_key or OPENAI_API_KEY"
        );

        let http = reqwest::Client::builder()
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": self.model, "input": text }))
            .send()
            .await
            .with_context(|| format!("embedding request failed for {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            anyhow::bail!("embedding API returned {status}: {message}");
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .context("failed to parse embedding response")?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .context("embedding response contained no vectors")?;
        anyhow::ensure!(!embedding.is_empty(), "embedding response contained an empty vector");

        tracing::debug!(model = %self.model, dimensions = embedding.len(), "text embedded");
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
