//! Warm-up patterns
//!
//! Canned results for request shapes that show up in nearly every
//! consulting engagement, loaded at start to avoid cold-start misses.

use serde::{Deserialize, Serialize};

/// One pre-computed (type, content, result) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmUpPattern {
    /// Analysis type
    pub analysis_type: String,
    /// Request content (normalized on insert)
    pub content: String,
    /// Canned result
    pub result: String,
    /// Nominal token cost of the canned result
    #[serde(default)]
    pub tokens_used: u64,
    /// Quality estimate, drives the entry TTL
    #[serde(default = "default_quality")]
    pub quality: f64,
}

fn default_quality() -> f64 {
    0.8
}

impl WarmUpPattern {
    /// Create pattern with default quality and zero token cost
    #[must_use]
    pub fn new(
        analysis_type: impl Into<String>,
        content: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            analysis_type: analysis_type.into(),
            content: content.into(),
            result: result.into(),
            tokens_used: 0,
            quality: default_quality(),
        }
    }

    /// With quality estimate
    #[inline]
    #[must_use]
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }

    /// With nominal token cost
    #[inline]
    #[must_use]
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = tokens;
        self
    }
}

/// Built-in patterns for the common consulting request shapes
#[must_use]
pub fn default_warm_up_patterns() -> Vec<WarmUpPattern> {
    vec![
        WarmUpPattern::new(
            "cost_analysis",
            "cloud cost optimization overview",
            "Key levers: right-size compute, commit to reserved capacity for steady workloads, \
             tier cold storage, and remove idle resources. Start with a 30-day usage export.",
        )
        .with_tokens(420),
        WarmUpPattern::new(
            "security_assessment",
            "baseline security review",
            "Review identity and access policies, enforce MFA, encrypt data at rest and in \
             transit, centralize audit logging, and patch internet-facing services first.",
        )
        .with_tokens(380),
        WarmUpPattern::new(
            "architecture_review",
            "monolith to microservices",
            "Extract services along bounded contexts with independent data ownership. \
             Introduce an API gateway and observability before the first split.",
        )
        .with_tokens(450),
        WarmUpPattern::new(
            "migration_plan",
            "on-premises to cloud migration",
            "Inventory workloads, classify by rehost/replatform/refactor, migrate \
             low-risk stateless services first, and rehearse data cut-over.",
        )
        .with_tokens(400),
        WarmUpPattern::new(
            "compliance_check",
            "gdpr readiness",
            "Map personal data flows, document lawful bases, set retention limits, \
             support subject access requests, and appoint a responsible owner.",
        )
        .with_tokens(360)
        .with_quality(0.7),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_distinct_types() {
        let patterns = default_warm_up_patterns();
        let mut types: Vec<_> = patterns.iter().map(|p| p.analysis_type.as_str()).collect();
        types.sort_unstable();
        types.dedup();
        assert_eq!(types.len(), patterns.len());
    }

    #[test]
    fn pattern_deserializes_with_defaults() {
        let json = r#"{"analysis_type":"t","content":"c","result":"r"}"#;
        let pattern: WarmUpPattern = serde_json::from_str(json).unwrap();
        assert_eq!(pattern.tokens_used, 0);
        assert!((pattern.quality - 0.8).abs() < f64::EPSILON);
    }
}
