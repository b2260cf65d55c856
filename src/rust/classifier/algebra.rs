use std::collections::BTreeMap;
use std::ops::{Add, Div, Mul, Sub};

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;

/// Sparse word to weight vector.
///
/// Missing words weigh zero. Keys are kept sorted so sums over the vector run
/// in a fixed order and give reproducible results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityVector {
    weights: BTreeMap<String, f32>,
}

impl SimilarityVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            weights: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, word: &str) -> Option<f32> {
        self.weights.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.weights.iter().map(|(k, &v)| (k.as_str(), v))
    }

    fn combine(&self, other: &Self, k: f32) -> Self {
        let mut weights = self.weights.clone();
        for (word, &weight) in &other.weights {
            *weights.entry(word.clone()).or_insert(0.0) += k * weight;
        }
        Self { weights }
    }

    pub fn add(&self, other: &Self) -> Self {
        self.combine(other, 1.0)
    }

    pub fn subtract(&self, other: &Self) -> Self {
        self.combine(other, -1.0)
    }

    pub fn scale(&self, k: f32) -> Self {
        Self {
            weights: self.weights.iter().map(|(w, &v)| (w.clone(), v * k)).collect(),
        }
    }

    pub fn divide(&self, k: f32) -> Self {
        self.scale(1.0 / k)
    }

    /// Euclidean length.
    pub fn length(&self) -> f32 {
        self.weights.values().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Mean of `vectors`.
    ///
    /// # Errors
    /// - `EmptySetError` if `vectors` is empty
    pub fn centroid(vectors: &[SimilarityVector]) -> Result<Self, ClassifierError> {
        if vectors.is_empty() {
            return Err(ClassifierError::EmptySetError(
                "Cannot take the centroid of zero similarity vectors".into(),
            ));
        }
        let sum = vectors.iter().fold(Self::new(), |acc, v| acc.add(v));
        Ok(sum.scale(1.0 / vectors.len() as f32))
    }
}

impl Add for &SimilarityVector {
    type Output = SimilarityVector;

    fn add(self, other: Self) -> SimilarityVector {
        SimilarityVector::add(self, other)
    }
}

impl Sub for &SimilarityVector {
    type Output = SimilarityVector;

    fn sub(self, other: Self) -> SimilarityVector {
        self.subtract(other)
    }
}

impl Mul<f32> for &SimilarityVector {
    type Output = SimilarityVector;

    fn mul(self, k: f32) -> SimilarityVector {
        self.scale(k)
    }
}

impl Div<f32> for &SimilarityVector {
    type Output = SimilarityVector;

    fn div(self, k: f32) -> SimilarityVector {
        self.divide(k)
    }
}

pub fn euclidean_length(vec: ArrayView1<f32>) -> f32 {
    vec.dot(&vec).sqrt()
}

/// Mean of dense vectors of equal dimension.
pub fn dense_centroid(vectors: &[Array1<f32>]) -> Result<Array1<f32>, ClassifierError> {
    let first = vectors.first().ok_or_else(|| {
        ClassifierError::EmptySetError("Cannot take the centroid of zero word vectors".into())
    })?;
    let sum = vectors
        .iter()
        .fold(Array1::zeros(first.len()), |acc, v| acc + v);
    Ok(sum / vectors.len() as f32)
}
