//! On-disk layout of the feedback vector index
//!
//! The index is plain JSON with a closed schema. Loading it can only ever
//! produce strings, optional metadata, and float vectors.

use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::models::FeedbackDocument;
use crate::models::FeedbackMetadata;

pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Index files above this size are refused outright
pub const MAX_INDEX_BYTES: u64 = 512 * 1024 * 1024;

/// Similarity metric the index was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Dot product of L2-normalized vectors
    Cosine,
    /// Raw dot product
    InnerProduct,
    /// Euclidean distance; the score is its negation
    L2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexedDocument {
    pub text: String,
    #[serde(default)]
    pub metadata: FeedbackMetadata,
    pub vector: Vec<f32>,
}

impl IndexedDocument {
    pub fn new(document: FeedbackDocument, vector: Vec<f32>) -> Self {
        Self {
            text: document.text,
            metadata: document.metadata,
            vector,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexFile {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub metric: Metric,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
    pub documents: Vec<IndexedDocument>,
}

impl IndexFile {
    pub fn new(embedding_model: impl Into<String>, dimension: usize, metric: Metric) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimension,
            metric,
            built_at: Some(Utc::now()),
            documents: Vec::new(),
        }
    }
}

/// Sidecar checksum location: `<index path>.sha256`
pub fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
