//! AI-generation collaborator seam
//!
//! The real generator lives outside this workspace. [`CannedGenerator`] and
//! [`CannedFallback`] are development doubles, wired only when
//! `generator.use_canned_responses` is set.

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Per-call generation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Requested model; the generator's default when `None`
    pub model: Option<String>,
    /// Output token cap
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    /// With model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// With output token cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Generated analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
    /// Result body
    pub content: String,
    /// Tokens consumed
    pub tokens_used: u64,
    /// Model that answered
    pub model_id: String,
}

/// Produces analyses from prompts
#[async_trait::async_trait]
pub trait AnalysisGenerator: Send + Sync {
    /// Generate a response for `prompt`
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generated, GenerationError>;
}

/// Model id reported by canned responses
pub const CANNED_MODEL: &str = "canned";

/// Deterministic placeholder responses
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedGenerator;

impl CannedGenerator {
    fn respond(prompt: &str) -> Generated {
        let subject = prompt.lines().last().unwrap_or_default().trim();
        let content = format!(
            "# Preliminary assessment\n\n\
             - Scope: {subject}\n\
             - Findings: placeholder analysis, no model was consulted\n\
             - Next step: rerun with a configured generator for a full report\n"
        );
        let tokens_used = (content.split_whitespace().count() as u64).max(1);
        Generated {
            content,
            tokens_used,
            model_id: CANNED_MODEL.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl AnalysisGenerator for CannedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<Generated, GenerationError> {
        Ok(Self::respond(prompt))
    }
}

/// Answers from [`CannedGenerator`] when the inner generator rejects
/// credentials; every other outcome passes through
#[derive(Clone)]
pub struct CannedFallback {
    inner: Arc<dyn AnalysisGenerator>,
}

impl CannedFallback {
    /// Wrap `inner`
    #[must_use]
    pub fn new(inner: Arc<dyn AnalysisGenerator>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for CannedFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CannedFallback").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl AnalysisGenerator for CannedFallback {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generated, GenerationError> {
        match self.inner.generate(prompt, options).await {
            Err(GenerationError::Auth(reason)) => {
                tracing::warn!(%reason, "generator rejected credentials, serving canned response");
                Ok(CannedGenerator::respond(prompt))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rejecting(GenerationError);

    #[async_trait::async_trait]
    impl AnalysisGenerator for Rejecting {
        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<Generated, GenerationError> {
            Err(self.0.clone())
        }
    }

    #[tokio::test]
    async fn canned_is_deterministic() {
        let options = GenerationOptions::default();
        let a = CannedGenerator.generate("cost analysis\naws s3", &options).await.unwrap();
        let b = CannedGenerator.generate("cost analysis\naws s3", &options).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.model_id, CANNED_MODEL);
        assert!(a.content.contains("aws s3"));
        assert!(a.tokens_used > 0);
    }

    #[tokio::test]
    async fn fallback_only_covers_auth() {
        let options = GenerationOptions::default();
        let auth = CannedFallback::new(Arc::new(Rejecting(GenerationError::Auth("403".into()))));
        assert!(auth.generate("p", &options).await.is_ok());

        let quota = CannedFallback::new(Arc::new(Rejecting(GenerationError::Quota("429".into()))));
        assert_eq!(
            quota.generate("p", &options).await,
            Err(GenerationError::Quota("429".into()))
        );
    }
}
