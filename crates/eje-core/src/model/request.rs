//! model/request.rs
//! Request / input snapshot (spec §3.1). Immutable once constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::canonical_json::context_hash;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RequestMetadata {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The frozen snapshot a request is reduced to once it enters the pipeline.
/// `context_hash` is computed at construction time and never recomputed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputSnapshot {
    pub text: String,
    pub context: Value,
    #[serde(default)]
    pub metadata: RequestMetadata,
    pub context_hash: String,
    pub received_at: DateTime<Utc>,
}

impl InputSnapshot {
    /// Construct and freeze a snapshot. `text` must be non-empty; this is
    /// enforced by the normalizer (§4.1), not here, so this constructor can
    /// also be used directly by tests and precedent deserialization.
    pub fn new(text: impl Into<String>, context: Value, metadata: RequestMetadata) -> Self {
        let text = text.into();
        let hash = context_hash(&text, &context);
        Self {
            text,
            context,
            metadata,
            context_hash: hash,
            received_at: Utc::now(),
        }
    }

    pub fn with_hash(
        text: impl Into<String>,
        context: Value,
        metadata: RequestMetadata,
        context_hash: String,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self { text: text.into(), context, metadata, context_hash, received_at }
    }
}
