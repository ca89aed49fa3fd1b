//! Content-addressed cache keys
//!
//! Provides [`CacheKey`], a strongly-typed 32-byte Blake3 hash of
//! `analysis_type + ":" + normalize(content)`. Requests that differ only in
//! letter case or whitespace map to the same key on purpose.

use crate::error::KeyError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte cache key (Blake3)
///
/// Immutable and cheap to clone (Copy). The raw content never leaves the
/// hasher, so keys can be logged freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Create a key from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the lookup key for an analysis request
    ///
    /// # Errors
    /// Returns [`KeyError::EmptyAnalysisType`] if the analysis type is blank
    pub fn derive(analysis_type: &str, content: &str) -> Result<Self, KeyError> {
        let analysis_type = analysis_type.trim();
        if analysis_type.is_empty() {
            return Err(KeyError::EmptyAnalysisType);
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(analysis_type.as_bytes());
        hasher.update(b":");
        hasher.update(normalize_content(content).as_bytes());
        Ok(Self(*hasher.finalize().as_bytes()))
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

/// Normalize request content before hashing
///
/// Lower-cases, trims, and collapses internal whitespace runs to one space.
#[must_use]
pub fn normalize_content(content: &str) -> String {
    content
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for CacheKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| KeyError::InvalidEncoding(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Self(arr))
    }
}

impl serde::Serialize for CacheKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for CacheKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
