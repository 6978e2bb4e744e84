//! Read-only vector index over customer feedback
//!
//! The index is built elsewhere and loaded once per process. Search is exact:
//! every stored vector is scored against the question vector, which keeps
//! ranking deterministic for a fixed index.

pub mod format;

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub use format::IndexFile;
pub use format::IndexedDocument;
pub use format::Metric;
use format::INDEX_FORMAT_VERSION;
use format::MAX_INDEX_BYTES;

use crate::embeddings::EmbeddingService;
use crate::errors::FeedbackRagError;
use crate::errors::Result;
use crate::models::FeedbackDocument;
use crate::models::RetrievalResult;
use crate::models::ScoredDocument;

/// Where an index may be loaded from and how it must be verified
#[derive(Debug, Clone)]
pub struct IndexLoadOptions {
    pub trusted_root: PathBuf,
    pub require_checksum: bool,
}

impl IndexLoadOptions {
    pub fn from_app_config(config: &crate::config::AppConfig) -> Self {
        Self {
            trusted_root: config.index.trusted_root.clone(),
            require_checksum: config.index.require_checksum,
        }
    }
}

/// Loaded feedback index bound to the embedder that serves its queries
pub struct VectorIndex {
    documents: Vec<FeedbackDocument>,
    vectors: Vec<Vec<f32>>,
    metric: Metric,
    dimension: usize,
    embedding_model: String,
    built_at: Option<DateTime<Utc>>,
    embedding: Arc<EmbeddingService>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("documents", &self.documents.len())
            .field("metric", &self.metric)
            .field("dimension", &self.dimension)
            .field("embedding_model", &self.embedding_model)
            .field("built_at", &self.built_at)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Load an index file from trusted local storage.
    ///
    /// # Errors
    /// `LoadError` when the file is missing, outside `trusted_root`, too large,
    /// fails its checksum, is not valid index JSON, or was built for another
    /// embedding model or dimensionality.
    pub fn load(
        path: &Path,
        options: &IndexLoadOptions,
        embedding: Arc<EmbeddingService>,
    ) -> Result<Self> {
        let resolved = resolve_trusted_path(path, &options.trusted_root)?;

        let file_meta = std::fs::metadata(&resolved).map_err(|e| {
            FeedbackRagError::LoadError(format!("cannot stat {}: {e}", resolved.display()))
        })?;
        if !file_meta.is_file() {
            return Err(FeedbackRagError::LoadError(format!(
                "{} is not a regular file",
                resolved.display()
            )));
        }
        if file_meta.len() > MAX_INDEX_BYTES {
            return Err(FeedbackRagError::LoadError(format!(
                "{} is {} bytes, limit is {MAX_INDEX_BYTES}",
                resolved.display(),
                file_meta.len()
            )));
        }

        let bytes = std::fs::read(&resolved).map_err(|e| {
            FeedbackRagError::LoadError(format!("cannot read {}: {e}", resolved.display()))
        })?;

        verify_checksum(&resolved, &bytes, options.require_checksum)?;

        let file: IndexFile = serde_json::from_slice(&bytes).map_err(|e| {
            FeedbackRagError::LoadError(format!(
                "{} is not a valid feedback index: {e}",
                resolved.display()
            ))
        })?;

        let index = Self::from_index_file(file, embedding)?;
        info!(
            "Loaded feedback index from {}: {} documents, dimension={}, metric={:?}",
            resolved.display(),
            index.len(),
            index.dimension,
            index.metric
        );
        Ok(index)
    }

    /// Validate an in-memory index file and bind it to an embedder
    pub fn from_index_file(file: IndexFile, embedding: Arc<EmbeddingService>) -> Result<Self> {
        if file.format_version != INDEX_FORMAT_VERSION {
            return Err(FeedbackRagError::LoadError(format!(
                "unsupported index format version {} (expected {INDEX_FORMAT_VERSION})",
                file.format_version
            )));
        }

        if file.dimension != embedding.dimension() {
            return Err(FeedbackRagError::LoadError(format!(
                "index was built with {}-dimensional vectors but the embedding provider produces {}",
                file.dimension,
                embedding.dimension()
            )));
        }

        if !file
            .embedding_model
            .eq_ignore_ascii_case(embedding.model_name())
        {
            return Err(FeedbackRagError::LoadError(format!(
                "index was built with embedding model `{}` but `{}` is configured",
                file.embedding_model,
                embedding.model_name()
            )));
        }

        let mut documents = Vec::with_capacity(file.documents.len());
        let mut vectors = Vec::with_capacity(file.documents.len());

        for (position, entry) in file.documents.into_iter().enumerate() {
            if entry.vector.len() != file.dimension {
                return Err(FeedbackRagError::LoadError(format!(
                    "document {position} has {} dimensions, expected {}",
                    entry.vector.len(),
                    file.dimension
                )));
            }
            if entry.vector.iter().any(|v| !v.is_finite()) {
                return Err(FeedbackRagError::LoadError(format!(
                    "document {position} contains a non-finite vector component"
                )));
            }

            let mut vector = entry.vector;
            if file.metric == Metric::Cosine {
                normalize(&mut vector);
            }

            vectors.push(vector);
            documents.push(FeedbackDocument {
                text: entry.text,
                metadata: entry.metadata,
            });
        }

        Ok(Self {
            documents,
            vectors,
            metric: file.metric,
            dimension: file.dimension,
            embedding_model: file.embedding_model,
            built_at: file.built_at,
            embedding,
        })
    }

    /// Rank documents against a question.
    ///
    /// Returns at most `k` documents by decreasing similarity; equal scores keep
    /// index order. An empty index yields an empty result.
    pub async fn query(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(FeedbackRagError::ValidationError(
                "top_k must be at least 1".to_string(),
            ));
        }

        if self.documents.is_empty() {
            warn!("Feedback index is empty; nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_vector = self.embedding.generate(question).await?;
        self.search_vector(&query_vector, k)
    }

    /// Rank documents against an already-embedded query
    pub fn search_vector(&self, query_vector: &[f32], k: usize) -> Result<RetrievalResult> {
        if query_vector.len() != self.dimension {
            return Err(FeedbackRagError::RetrievalError(format!(
                "query vector has {} dimensions, index expects {}",
                query_vector.len(),
                self.dimension
            )));
        }
        if query_vector.iter().any(|v| !v.is_finite()) {
            return Err(FeedbackRagError::RetrievalError(
                "query vector contains non-finite values".to_string(),
            ));
        }

        let mut query = query_vector.to_vec();
        if self.metric == Metric::Cosine {
            normalize(&mut query);
        }

        let score: fn(&[f32], &[f32]) -> f32 = match self.metric {
            Metric::Cosine | Metric::InnerProduct => dot,
            Metric::L2 => negative_distance,
        };
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, score(&query, vector)))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        debug!(
            "Vector search returned {} of {} documents (k={})",
            scored.len(),
            self.documents.len(),
            k
        );

        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredDocument {
                document: self.documents[position].clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }
}

/// Canonicalize `path` and require it to live under `trusted_root`
fn resolve_trusted_path(path: &Path, trusted_root: &Path) -> Result<PathBuf> {
    let root = trusted_root.canonicalize().map_err(|e| {
        FeedbackRagError::LoadError(format!(
            "trusted index root {} is unavailable: {e}",
            trusted_root.display()
        ))
    })?;

    let resolved = path.canonicalize().map_err(|e| {
        FeedbackRagError::LoadError(format!("index file {} not found: {e}", path.display()))
    })?;

    if !resolved.starts_with(&root) {
        return Err(FeedbackRagError::LoadError(format!(
            "refusing to load index from untrusted location {} (outside {})",
            resolved.display(),
            root.display()
        )));
    }

    Ok(resolved)
}

fn verify_checksum(path: &Path, bytes: &[u8], required: bool) -> Result<()> {
    let sidecar = format::checksum_path(path);
    let expected = match std::fs::read_to_string(&sidecar) {
        Ok(content) => content,
        Err(_) if !required => return Ok(()),
        Err(e) => {
            return Err(FeedbackRagError::LoadError(format!(
                "checksum file {} is required but unreadable: {e}",
                sidecar.display()
            )))
        }
    };

    // Accept both a bare digest and `sha256sum` output
    let expected = expected
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let actual = format::sha256_hex(bytes);

    if expected != actual {
        return Err(FeedbackRagError::LoadError(format!(
            "checksum mismatch for {}: expected {expected}, got {actual}",
            path.display()
        )));
    }

    debug!("Index checksum verified: {}", actual);
    Ok(())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn negative_distance(a: &[f32], b: &[f32]) -> f32 {
    -a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;

    fn service(dimension: usize) -> Arc<EmbeddingService> {
        Arc::new(EmbeddingService::from_embedder(Arc::new(
            HashingEmbedder::new(dimension).unwrap(),
        )))
    }

    fn file_with(vectors: &[Vec<f32>], metric: Metric) -> IndexFile {
        let dimension = vectors[0].len();
        let mut file = IndexFile::new(HashingEmbedder::model_id(dimension), dimension, metric);
        for (i, vector) in vectors.iter().enumerate() {
            file.documents.push(IndexedDocument::new(
                FeedbackDocument::new(format!("doc {i}"), None, None),
                vector.clone(),
            ));
        }
        file
    }

    fn write_with_sidecar(file: &IndexFile, path: &Path) {
        let bytes = serde_json::to_vec(file).unwrap();
        std::fs::write(path, &bytes).unwrap();
        std::fs::write(
            format::checksum_path(path),
            format!("{}\n", format::sha256_hex(&bytes)),
        )
        .unwrap();
    }

    #[test]
    fn test_search_orders_by_score() {
        let file = file_with(
            &[vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
            Metric::Cosine,
        );
        let index = VectorIndex::from_index_file(file, service(2)).unwrap();

        let results = index.search_vector(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.document.text.as_str()).collect();
        assert_eq!(texts, vec!["doc 1", "doc 2", "doc 0"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let file = file_with(
            &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]],
            Metric::InnerProduct,
        );
        let index = VectorIndex::from_index_file(file, service(2)).unwrap();

        let results = index.search_vector(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.document.text.as_str()).collect();
        assert_eq!(texts, vec!["doc 0", "doc 2", "doc 3"]);
    }

    #[test]
    fn test_inner_product_keeps_magnitude() {
        let file = file_with(&[vec![1.0, 0.0], vec![3.0, 0.0]], Metric::InnerProduct);
        let index = VectorIndex::from_index_file(file, service(2)).unwrap();

        let results = index.search_vector(&[2.0, 0.0], 2).unwrap();
        assert_eq!(results[0].document.text, "doc 1");
        assert!((results[0].score - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_ranks_nearest_first() {
        let file = file_with(
            &[vec![10.0, 0.0], vec![1.0, 1.0], vec![3.0, 0.0]],
            Metric::L2,
        );
        let index = VectorIndex::from_index_file(file, service(2)).unwrap();

        let results = index.search_vector(&[2.0, 0.0], 3).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.document.text.as_str()).collect();
        // Cosine would put doc 0 first; raw distance must not
        assert_eq!(texts, vec!["doc 2", "doc 1", "doc 0"]);
        assert!((results[0].score + 1.0).abs() < 1e-6);
        assert!((results[2].score + 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_exact_match_scores_zero() {
        let file = file_with(&[vec![0.5, -0.5], vec![0.5, 0.5]], Metric::L2);
        let index = VectorIndex::from_index_file(file, service(2)).unwrap();

        let results = index.search_vector(&[0.5, 0.5], 1).unwrap();
        assert_eq!(results[0].document.text, "doc 1");
        assert_eq!(results[0].score, 0.0);
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let file = file_with(&[vec![1.0, 0.0], vec![0.0, 1.0]], Metric::Cosine);
        let index = VectorIndex::from_index_file(file, service(2)).unwrap();
        assert_eq!(index.search_vector(&[1.0, 1.0], 10).unwrap().len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_is_load_error() {
        let file = file_with(&[vec![0.1; 384]], Metric::Cosine);
        let err = VectorIndex::from_index_file(file, service(768)).unwrap_err();
        assert!(matches!(err, FeedbackRagError::LoadError(_)));
    }

    #[test]
    fn test_ragged_vector_is_load_error() {
        let mut file = file_with(&[vec![1.0, 0.0]], Metric::Cosine);
        file.documents[0].vector.push(0.5);
        assert!(matches!(
            VectorIndex::from_index_file(file, service(2)),
            Err(FeedbackRagError::LoadError(_))
        ));
    }

    #[test]
    fn test_non_finite_vector_is_load_error() {
        let file = file_with(&[vec![f32::NAN, 0.0]], Metric::Cosine);
        assert!(VectorIndex::from_index_file(file, service(2)).is_err());
    }

    #[test]
    fn test_model_mismatch_is_load_error() {
        let mut file = file_with(&[vec![1.0, 0.0]], Metric::Cosine);
        file.embedding_model = "BAAI/bge-small-en-v1.5".to_string();
        assert!(matches!(
            VectorIndex::from_index_file(file, service(2)),
            Err(FeedbackRagError::LoadError(_))
        ));
    }

    #[test]
    fn test_wrong_format_version() {
        let mut file = file_with(&[vec![1.0, 0.0]], Metric::Cosine);
        file.format_version = 99;
        assert!(VectorIndex::from_index_file(file, service(2)).is_err());
    }

    #[test]
    fn test_search_rejects_wrong_query_shape() {
        let file = file_with(&[vec![1.0, 0.0]], Metric::Cosine);
        let index = VectorIndex::from_index_file(file, service(2)).unwrap();
        assert!(matches!(
            index.search_vector(&[1.0, 0.0, 0.0], 1),
            Err(FeedbackRagError::RetrievalError(_))
        ));
    }

    #[tokio::test]
    async fn test_query_rejects_zero_k() {
        let file = file_with(&[vec![1.0, 0.0]], Metric::Cosine);
        let index = VectorIndex::from_index_file(file, service(2)).unwrap();
        assert!(matches!(
            index.query("milk", 0).await,
            Err(FeedbackRagError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_query_on_empty_index() {
        let file = IndexFile::new(HashingEmbedder::model_id(384), 384, Metric::Cosine);
        let index = VectorIndex::from_index_file(file, service(384)).unwrap();
        assert!(index.is_empty());
        assert!(index.query("why is milk late", 8).await.unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_path_outside_trusted_root() {
        let trusted = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let path = elsewhere.path().join("index.json");
        write_with_sidecar(&file_with(&[vec![1.0, 0.0]], Metric::Cosine), &path);

        let options = IndexLoadOptions {
            trusted_root: trusted.path().to_path_buf(),
            require_checksum: false,
        };
        let err = VectorIndex::load(&path, &options, service(2)).unwrap_err();
        assert!(err.to_string().contains("untrusted"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let options = IndexLoadOptions {
            trusted_root: dir.path().to_path_buf(),
            require_checksum: false,
        };
        let err = VectorIndex::load(&dir.path().join("missing.json"), &options, service(2))
            .unwrap_err();
        assert!(matches!(err, FeedbackRagError::LoadError(_)));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, b"{\"format_version\": 1, \"documents\": [").unwrap();

        let options = IndexLoadOptions {
            trusted_root: dir.path().to_path_buf(),
            require_checksum: false,
        };
        let err = VectorIndex::load(&path, &options, service(2)).unwrap_err();
        assert!(matches!(err, FeedbackRagError::LoadError(_)));
    }

    #[test]
    fn test_load_checksum_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        write_with_sidecar(&file_with(&[vec![1.0, 0.0]], Metric::Cosine), &path);
        let options = IndexLoadOptions {
            trusted_root: dir.path().to_path_buf(),
            require_checksum: true,
        };

        assert_eq!(VectorIndex::load(&path, &options, service(2)).unwrap().len(), 1);

        std::fs::write(format::checksum_path(&path), "deadbeef  index.json\n").unwrap();
        let err = VectorIndex::load(&path, &options, service(2)).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));

        std::fs::remove_file(format::checksum_path(&path)).unwrap();
        assert!(VectorIndex::load(&path, &options, service(2)).is_err());
    }
}
