//! Cache-fronted analysis orchestration
//!
//! [`PerformanceOptimizer`] is the only caller of the cache on the request
//! path. A hit is returned directly; a miss goes to the generator, and a
//! successful result is cached with a quality-scaled TTL. Every outcome is
//! recorded in the metrics aggregator. Generator errors come back unchanged
//! and leave the cache untouched.

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::generator::{AnalysisGenerator, GenerationOptions};
use crate::session::SessionAssigner;
use advisor_cache::{metadata_keys, AnalysisCache};
use advisor_metrics::{
    AiRequestRecord, EngagementKind, MessageEvent, MetricsAggregator, UserEngagement,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One analysis request
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Analysis type, e.g. `cost_analysis`
    pub analysis_type: String,
    /// Request body
    pub content: String,
    /// Requesting user, for engagement metrics
    pub user_id: Option<String>,
    /// Generation options used on a miss
    pub options: GenerationOptions,
}

impl AnalysisRequest {
    /// Create request
    #[must_use]
    pub fn new(analysis_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            analysis_type: analysis_type.into(),
            content: content.into(),
            user_id: None,
            options: GenerationOptions::default(),
        }
    }

    /// With requesting user
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// With generation options
    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Analysis result and where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    /// Result body
    pub content: String,
    /// Tokens the result cost when generated
    pub tokens_used: u64,
    /// Model that produced it, if known
    pub model_id: Option<String>,
    /// Served from cache
    pub cached: bool,
    /// Quality estimate attached to the result
    pub quality: f64,
    /// Time spent serving the request
    pub response_time: Duration,
}

/// Request-path orchestrator
pub struct PerformanceOptimizer {
    cache: Arc<AnalysisCache>,
    metrics: Arc<MetricsAggregator>,
    generator: Arc<dyn AnalysisGenerator>,
    sessions: Arc<dyn SessionAssigner>,
    pricing: GeneratorConfig,
}

impl fmt::Debug for PerformanceOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceOptimizer")
            .field("cache_size", &self.cache.len())
            .field("default_model", &self.pricing.default_model)
            .finish_non_exhaustive()
    }
}

impl PerformanceOptimizer {
    /// Create orchestrator over shared components
    #[must_use]
    pub fn new(
        cache: Arc<AnalysisCache>,
        metrics: Arc<MetricsAggregator>,
        generator: Arc<dyn AnalysisGenerator>,
        sessions: Arc<dyn SessionAssigner>,
        pricing: GeneratorConfig,
    ) -> Self {
        Self {
            cache,
            metrics,
            generator,
            sessions,
            pricing,
        }
    }

    /// Shared cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Shared metrics
    #[inline]
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    /// Serve an analysis from cache or the generator
    ///
    /// # Errors
    /// The generator's [`GenerationError`], unchanged
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, GenerationError> {
        let started = Instant::now();
        self.metrics.record_message(MessageEvent::Received, None);

        if let Some(hit) = self.cache.get(&request.analysis_type, &request.content) {
            let response_time = started.elapsed();
            tracing::debug!(
                analysis_type = %request.analysis_type,
                access_count = hit.access_count,
                "analysis served from cache"
            );
            self.metrics
                .record_message(MessageEvent::Sent, Some(response_time));
            self.record_report(request);
            return Ok(AnalysisResponse {
                model_id: hit.metadata.get(metadata_keys::MODEL).cloned(),
                content: hit.content,
                tokens_used: hit.tokens_used,
                cached: true,
                quality: hit.quality,
                response_time,
            });
        }

        let prompt = build_prompt(&request.analysis_type, &request.content);
        let mut options = request.options.clone();
        if options.model.is_none() {
            options.model = Some(self.pricing.default_model.clone());
        }

        let call_started = Instant::now();
        let outcome = self.generator.generate(&prompt, &options).await;
        let call_time = call_started.elapsed();

        let generated = match outcome {
            Ok(generated) => generated,
            Err(err) => {
                let model = options.model.as_deref().unwrap_or(&self.pricing.default_model);
                self.metrics
                    .record_ai_request(&AiRequestRecord::failure(model, call_time));
                self.metrics.record_error(err.category(), &err.to_string());
                self.metrics.record_message(MessageEvent::Error, None);
                tracing::warn!(
                    analysis_type = %request.analysis_type,
                    error = %err,
                    "analysis generation failed"
                );
                return Err(err);
            }
        };

        let cost = self
            .pricing
            .estimate_cost(&generated.model_id, generated.tokens_used);
        self.metrics.record_ai_request(&AiRequestRecord::success(
            generated.model_id.clone(),
            call_time,
            generated.tokens_used,
            cost,
        ));

        let quality = estimate_quality(&generated.content);
        let metadata = BTreeMap::from([
            (metadata_keys::SOURCE.to_string(), "generated".to_string()),
            (metadata_keys::MODEL.to_string(), generated.model_id.clone()),
        ]);
        if let Err(err) = self.cache.put_with_metadata(
            &request.analysis_type,
            &request.content,
            generated.content.clone(),
            generated.tokens_used,
            quality,
            metadata,
        ) {
            tracing::warn!(error = %err, "analysis not cached");
        }

        let response_time = started.elapsed();
        self.metrics
            .record_message(MessageEvent::Sent, Some(response_time));
        self.record_report(request);

        Ok(AnalysisResponse {
            content: generated.content,
            tokens_used: generated.tokens_used,
            model_id: Some(generated.model_id),
            cached: false,
            quality,
            response_time,
        })
    }

    /// Assign a session through the collaborator and count it as started
    pub fn assign_session(&self, session_id: &str, consultant_id: &str, user_id: &str) -> String {
        let effective = self.sessions.assign_session(session_id, consultant_id);
        self.metrics
            .record_user_event(&UserEngagement::new(user_id, EngagementKind::SessionStarted));
        effective
    }

    fn record_report(&self, request: &AnalysisRequest) {
        if let Some(user) = &request.user_id {
            self.metrics
                .record_user_event(&UserEngagement::new(user.as_str(), EngagementKind::ReportGenerated));
        }
    }
}

/// Prompt sent to the generator for one request
#[must_use]
pub fn build_prompt(analysis_type: &str, content: &str) -> String {
    format!(
        "You are a senior technology consultant. Produce a {} for the request below.\n{}",
        analysis_type.trim().replace('_', " "),
        content.trim()
    )
}

/// Heuristic usefulness of a generated result in `[0, 1]`
///
/// Empty output scores 0. Longer output and visible structure (headings,
/// lists) raise the score.
#[must_use]
pub fn estimate_quality(content: &str) -> f64 {
    let text = content.trim();
    if text.is_empty() {
        return 0.0;
    }
    let mut score: f64 = 0.4;
    let words = text.split_whitespace().count();
    if words >= 50 {
        score += 0.2;
    }
    if words >= 200 {
        score += 0.1;
    }
    let structured = text.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with('#') || line.starts_with("- ") || line.starts_with("* ") || line.starts_with("1.")
    });
    if structured {
        score += 0.2;
    }
    if text.ends_with(['.', '!', '?', ')']) || structured {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_is_worthless() {
        assert_eq!(estimate_quality("   "), 0.0);
    }

    #[test]
    fn structure_and_length_raise_quality() {
        let terse = estimate_quality("ok");
        let structured = estimate_quality("# Findings\n- move cold data to glacier\n- enable lifecycle rules");
        let long = format!("# Findings\n{}", "- a recommendation with detail.\n".repeat(60));
        assert!(terse < structured);
        assert!(structured < estimate_quality(&long));
        assert!(estimate_quality(&long) <= 1.0);
    }

    #[test]
    fn prompt_mentions_type_and_content() {
        let prompt = build_prompt("cost_analysis", "  aws s3 cost ");
        assert!(prompt.contains("cost analysis"));
        assert!(prompt.ends_with("\naws s3 cost"));
    }
}
