use crate::vector_store::StoreError;

/// Represents the different types of errors that can occur in the phrase classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The vector store could not be loaded or parsed
    #[error("Vector store error: {0}")]
    StoreError(#[from] StoreError),
    /// A centroid was requested over an empty set of vectors
    #[error("Empty set: {0}")]
    EmptySetError(String),
    /// A phrase has too many distinct tokens to enumerate its orderings
    #[error("Phrase too long: {tokens} distinct tokens (max: {max})")]
    PhraseTooLongError { tokens: usize, max: usize },
    /// Classification or export was attempted before training
    #[error("Classifier has not been trained")]
    NotTrainedError,
    /// Error occurred due to invalid input parameters
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// The vector file referenced by an export changed since it was exported
    #[error("Vector store at {path} changed: expected fingerprint {expected}, got {actual}")]
    StoreMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    /// Error occurred while reading or writing an exported model
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::SerializationError(err.to_string())
    }
}
