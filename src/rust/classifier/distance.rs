use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::algebra::SimilarityVector;

/// Distances from a phrase to every class, aligned with an [`Axis`].
pub type DistanceVector = Vec<f32>;

/// Confidences in `[0, 1]`, aligned with an [`Axis`].
pub type ConfidenceVector = Vec<f32>;

/// Sorted, unique class labels. Position `i` of every distance and confidence
/// vector belongs to `labels()[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Axis {
    labels: Vec<String>,
}

impl Axis {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        labels.sort();
        labels.dedup();
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels
            .binary_search_by(|probe| probe.as_str().cmp(label))
            .ok()
    }

    /// Indicator vector with 1.0 at `label`'s position.
    pub fn one_hot(&self, label: &str) -> Option<Vec<f32>> {
        let index = self.index_of(label)?;
        let mut target = vec![0.0; self.len()];
        target[index] = 1.0;
        Some(target)
    }
}

impl From<Vec<String>> for Axis {
    fn from(labels: Vec<String>) -> Self {
        Self::new(labels)
    }
}

impl From<Axis> for Vec<String> {
    fn from(axis: Axis) -> Self {
        axis.labels
    }
}

fn squared_distance(a: &Array2<f32>, b: &Array2<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Frobenius distance between two sentence matrices of equal shape.
pub fn matrix_distance(a: &Array2<f32>, b: &Array2<f32>) -> f32 {
    squared_distance(a, b).sqrt()
}

/// Distance from `matrix` to the closest of `examples`.
///
/// With `trim_zeros`, examples at exactly zero distance are ignored, which keeps
/// a training example from matching its own permutations. Returns `+inf` when
/// no candidate is left.
pub fn nearest_matrix_distance(examples: &[Array2<f32>], matrix: &Array2<f32>, trim_zeros: bool) -> f32 {
    examples
        .iter()
        .map(|example| squared_distance(example, matrix))
        .filter(|&sum| !(trim_zeros && sum == 0.0))
        .fold(f32::INFINITY, f32::min)
        .sqrt()
}

/// Confidence that `vector` belongs to the class with `centroid`, relative to
/// how far that centroid sits from the `global_center` of all classes.
///
/// Returns `1 - min(1, |v - c| / |c - g|)`, or 0 when the centroid coincides
/// with the global center.
pub fn centroid_confidence(
    vector: &SimilarityVector,
    centroid: &SimilarityVector,
    global_center: &SimilarityVector,
) -> f32 {
    let spread = (centroid - global_center).length();
    if spread == 0.0 {
        return 0.0;
    }
    let ratio = (vector - centroid).length() / spread;
    1.0 - ratio.min(1.0)
}

/// Distance from `vector` to the closest of `examples`, `+inf` if there are none.
pub fn nearest_vector_distance(vector: &SimilarityVector, examples: &[SimilarityVector]) -> f32 {
    examples
        .iter()
        .map(|example| (vector - example).length())
        .fold(f32::INFINITY, f32::min)
}

/// Sum over the words of `from` of the distance to their nearest word in `to`.
fn directed_phrase_distance(from: &[Array1<f32>], to: &[Array1<f32>]) -> f32 {
    from.iter()
        .map(|word| {
            to.iter()
                .map(|other| {
                    word.iter()
                        .zip(other.iter())
                        .map(|(x, y)| (x - y) * (x - y))
                        .sum::<f32>()
                        .sqrt()
                })
                .fold(f32::INFINITY, f32::min)
        })
        .sum()
}

/// Symmetric distance between two bags of word vectors: the mean of the
/// directed nearest-word distances both ways. `+inf` if either side is empty.
pub fn phrase_distance(a: &[Array1<f32>], b: &[Array1<f32>]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return f32::INFINITY;
    }
    (directed_phrase_distance(a, b) + directed_phrase_distance(b, a)) / 2.0
}
