use std::path::PathBuf;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::algebra::SimilarityVector;
use super::classifier::ClassifierKind;
use super::distance::Axis;
use super::error::ClassifierError;
use super::scorer::ScorerState;
use crate::runtime::RuntimeConfig;

/// Version written into every export. Imports of any other version are rejected.
pub const FORMAT_VERSION: u32 = 1;

/// Self-describing snapshot of a trained classifier.
///
/// The vector file itself is not embedded; it is referenced by path and
/// SHA-256 fingerprint and reloaded on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExport {
    pub format_version: u32,
    pub kind: ClassifierKind,
    pub store_path: PathBuf,
    pub store_fingerprint: String,
    pub dimension: usize,
    pub stop_words: Vec<String>,
    pub delimiters: String,
    pub axis: Axis,
    pub representation: RepresentationState,
    /// Row count of every sentence matrix, 0 unless `kind` is `Matrix`
    pub sentence_length: usize,
    /// Absent for the centroid kind, which scores without a scorer
    pub scorer: Option<ScorerState>,
    pub runtime: RuntimeConfig,
}

impl ModelExport {
    pub fn to_json(&self) -> Result<String, ClassifierError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let export: Self = serde_json::from_str(json)?;
        if export.format_version != FORMAT_VERSION {
            return Err(ClassifierError::SerializationError(format!(
                "Unsupported export format version {} (expected {})",
                export.format_version, FORMAT_VERSION
            )));
        }
        Ok(export)
    }
}

/// Class representations as plain nested arrays, outermost index on the axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum RepresentationState {
    Centroid {
        centroids: Vec<SimilarityVector>,
        global_center: SimilarityVector,
    },
    NearestExample {
        examples: Vec<Vec<SimilarityVector>>,
    },
    /// class, example, word, component
    WordSet {
        examples: Vec<Vec<Vec<Vec<f32>>>>,
    },
    /// class, matrix, row, component
    Matrix {
        matrices: Vec<Vec<Vec<Vec<f32>>>>,
    },
}

/// In-memory class representations used for classification.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Representation {
    Centroid {
        centroids: Vec<SimilarityVector>,
        global_center: SimilarityVector,
    },
    NearestExample {
        examples: Vec<Vec<SimilarityVector>>,
    },
    WordSet {
        examples: Vec<Vec<Vec<Array1<f32>>>>,
    },
    Matrix {
        matrices: Vec<Vec<Array2<f32>>>,
    },
}

impl Representation {
    pub(crate) fn kind(&self) -> ClassifierKind {
        match self {
            Self::Centroid { .. } => ClassifierKind::Centroid,
            Self::NearestExample { .. } => ClassifierKind::NearestExample,
            Self::WordSet { .. } => ClassifierKind::WordSet,
            Self::Matrix { .. } => ClassifierKind::Matrix,
        }
    }

    fn class_count(&self) -> usize {
        match self {
            Self::Centroid { centroids, .. } => centroids.len(),
            Self::NearestExample { examples } => examples.len(),
            Self::WordSet { examples } => examples.len(),
            Self::Matrix { matrices } => matrices.len(),
        }
    }

    pub(crate) fn to_state(&self) -> RepresentationState {
        match self {
            Self::Centroid {
                centroids,
                global_center,
            } => RepresentationState::Centroid {
                centroids: centroids.clone(),
                global_center: global_center.clone(),
            },
            Self::NearestExample { examples } => RepresentationState::NearestExample {
                examples: examples.clone(),
            },
            Self::WordSet { examples } => RepresentationState::WordSet {
                examples: examples
                    .iter()
                    .map(|class| {
                        class
                            .iter()
                            .map(|words| words.iter().map(|w| w.to_vec()).collect())
                            .collect()
                    })
                    .collect(),
            },
            Self::Matrix { matrices } => RepresentationState::Matrix {
                matrices: matrices
                    .iter()
                    .map(|class| class.iter().map(matrix_rows).collect())
                    .collect(),
            },
        }
    }

    /// Rebuilds and validates representations for `classes` classes of
    /// `dimension`-wide vectors. Matrices must have exactly `sentence_length` rows.
    pub(crate) fn from_state(
        state: &RepresentationState,
        classes: usize,
        dimension: usize,
        sentence_length: usize,
    ) -> Result<Self, ClassifierError> {
        let representation = match state {
            RepresentationState::Centroid {
                centroids,
                global_center,
            } => Self::Centroid {
                centroids: centroids.clone(),
                global_center: global_center.clone(),
            },
            RepresentationState::NearestExample { examples } => Self::NearestExample {
                examples: examples.clone(),
            },
            RepresentationState::WordSet { examples } => Self::WordSet {
                examples: examples
                    .iter()
                    .map(|class| {
                        class
                            .iter()
                            .map(|words| {
                                words
                                    .iter()
                                    .map(|w| word_vector(w, dimension))
                                    .collect::<Result<Vec<_>, _>>()
                            })
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            },
            RepresentationState::Matrix { matrices } => Self::Matrix {
                matrices: matrices
                    .iter()
                    .map(|class| {
                        class
                            .iter()
                            .map(|rows| sentence_matrix(rows, sentence_length, dimension))
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            },
        };
        if representation.class_count() != classes {
            return Err(ClassifierError::ValidationError(format!(
                "Export holds representations for {} classes but its axis has {}",
                representation.class_count(),
                classes
            )));
        }
        Ok(representation)
    }
}

fn matrix_rows(matrix: &Array2<f32>) -> Vec<Vec<f32>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

fn word_vector(values: &[f32], dimension: usize) -> Result<Array1<f32>, ClassifierError> {
    if values.len() != dimension {
        return Err(ClassifierError::ValidationError(format!(
            "Word vector has {} components, expected {}",
            values.len(),
            dimension
        )));
    }
    Ok(Array1::from_vec(values.to_vec()))
}

fn sentence_matrix(rows: &[Vec<f32>], length: usize, dimension: usize) -> Result<Array2<f32>, ClassifierError> {
    if rows.len() != length {
        return Err(ClassifierError::ValidationError(format!(
            "Sentence matrix has {} rows, expected {}",
            rows.len(),
            length
        )));
    }
    let mut flat = Vec::with_capacity(length * dimension);
    for row in rows {
        if row.len() != dimension {
            return Err(ClassifierError::ValidationError(format!(
                "Sentence matrix row has {} components, expected {}",
                row.len(),
                dimension
            )));
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((length, dimension), flat)
        .map_err(|e| ClassifierError::ValidationError(format!("Invalid sentence matrix: {}", e)))
}
