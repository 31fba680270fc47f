use serde::{Deserialize, Serialize};

use crate::{error::Result, record::ProblemRecord};

/// Similarity metric of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    Cosine,
}

impl Distance {
    /// Score two equal-length vectors; higher means more similar.
    ///
    /// # Examples
    ///
    /// ```
    /// use mathsearch::vector_store::Distance;
    ///
    /// let score = Distance::Cosine.score(&[1.0, 0.0], &[2.0, 0.0]);
    /// assert!((score - 1.0).abs() < 1e-6);
    /// ```
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
        }
    }
}

// Accumulated in f64: squaring large f32 components overflows to inf.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
    }
}

/// Total order key for ranking scores: NaN ranks below everything and
/// `-0.0` ties with `0.0`.
pub(crate) fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score + 0.0
    }
}

/// Shape and size of a stored collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
    pub point_count: u64,
}

/// Outcome of looking a collection up by name.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionLookup {
    Exists(CollectionInfo),
    NotFound,
}

/// A vector plus its payload, as written to a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: ProblemRecord,
}

/// A stored point matched by a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: u64,
    pub score: f32,
    pub payload: ProblemRecord,
}

/// A store of named vector collections queried by nearest neighbour.
pub trait VectorStore {
    /// Create an empty collection. Fails if the name is already taken.
    fn create_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<CollectionInfo>;

    /// Look a collection up without treating absence as an error.
    fn collection_info(&self, name: &str) -> Result<CollectionLookup>;

    /// Insert or overwrite points by id. All points land, or none do.
    fn upsert(&self, name: &str, points: &[StoredPoint]) -> Result<usize>;

    /// The `limit` points most similar to `query`, best first.
    fn search(
        &self,
        name: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>>;
}
