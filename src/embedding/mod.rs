//! Embedding providers and the pipeline that keeps idea vectors consistent with their text.
//!
//! The backend embeds new ideas itself on create. The client only computes vectors when an
//! idea is edited, through an [`EmbeddingProvider`] created from configuration by
//! [`create_provider`].

pub mod openai;
pub mod pipeline;

use anyhow::Result;
use async_trait::async_trait;

pub use pipeline::{EditOutcome, EmbeddingPipeline, EmbeddingStatus};

/// Trait for embedding text into vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifier of the model producing the vectors.
    fn model_name(&self) -> &str;
}

/// Create an embedding provider from config.
///
/// `"none"` disables client-side embedding (`Ok(None)`); `"openai"` talks to an
/// OpenAI-compatible `/embeddings` endpoint and requires an API key.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Option<Box<dyn EmbeddingProvider>>> {
    match config.provider.as_str() {
        "none" | "" => Ok(None),
        "openai" => {
            let provider = openai::OpenAIEmbeddingProvider::new(config)?;
            Ok(Some(Box::new(provider)))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: none, openai"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;

    #[test]
    fn none_provider_disables_embedding() {
        let config = EmbeddingConfig {
            provider: "none".into(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).unwrap().is_none());
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let config = EmbeddingConfig {
            provider: "onnx".into(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn openai_provider_requires_key() {
        let config = EmbeddingConfig {
            provider: "openai".into(),
            api_key: String::new(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).is_err());

        let config = EmbeddingConfig {
            provider: "openai".into(),
            api_key: "sk-test".into(),
            ..EmbeddingConfig::default()
        };
        let provider = create_provider(&config).unwrap().unwrap();
        assert_eq!(provider.model_name(), "text-embedding-3-small");
    }
}
