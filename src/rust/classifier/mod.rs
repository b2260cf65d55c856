use std::path::PathBuf;

mod algebra;
pub mod builder;
mod classifier;
mod distance;
mod error;
mod matrix;
mod scorer;
mod state;
mod tokenizer;

pub use algebra::{dense_centroid, euclidean_length, SimilarityVector};
pub use builder::{ClassDefinition, Classes, ClassifierBuilder};
pub use classifier::{Classifier, ClassifierKind, Prediction, TrainingReport};
pub use distance::{
    centroid_confidence, matrix_distance, nearest_matrix_distance, nearest_vector_distance,
    phrase_distance, Axis, ConfidenceVector, DistanceVector,
};
pub use error::ClassifierError;
pub use matrix::SentenceMatrixBuilder;
pub use scorer::{AnalyticScorer, ConfidenceScorer, ScorerState};
pub use state::{ModelExport, RepresentationState};
pub use tokenizer::{Language, Tokenizer, DEFAULT_DELIMITERS};

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Representation scheme selected at construction
    pub kind: ClassifierKind,
    /// Path of the vector file backing the classifier
    pub store_path: PathBuf,
    /// Dimension of the word vectors
    pub dimension: usize,
    /// Whether `train` has completed
    pub trained: bool,
    /// Labels of the classes, in axis order
    pub class_labels: Vec<String>,
    /// Row count of sentence matrices (matrix kind only, 0 otherwise)
    pub sentence_length: usize,
    /// Name of the confidence scorer
    pub scorer: String,
}
