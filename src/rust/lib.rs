//! A thread-safe phrase classifier over pretrained word-vector spaces.
//!
//! Phrases are embedded with a binary word2vec-style vector file and compared
//! against example phrases of each class. Distances are turned into
//! confidences by a pluggable [`ConfidenceScorer`].
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use wordspace::{Classifier, ClassifierKind, ClassDefinition, Classes, Language, VectorStoreCache};
//!
//! let cache = VectorStoreCache::new();
//! let mut classifier = Classifier::builder()
//!     .with_store_path("vectors/glove.6B.50d.bin", &cache)?
//!     .with_language(Language::English)
//!     .with_kind(ClassifierKind::Matrix)
//!     .build()?;
//!
//! let classes = Classes::new()
//!     .add_class(ClassDefinition::new("computer").with_examples(vec!["I have a computer", "I have a laptop"]))?
//!     .add_class(ClassDefinition::new("dog").with_examples(vec!["I have a dog"]))?;
//! let report = classifier.train(&classes)?;
//! println!("Trained on {} examples", report.examples);
//!
//! let prediction = classifier.classify("Do you have a cat?")?;
//! for (label, confidence) in prediction.iter() {
//!     println!("{}: {:.2}", label, confidence);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! A trained classifier is `Send + Sync` and can be shared across threads using `Arc`.
//! Vector stores are shared read-only through a [`VectorStoreCache`], which loads
//! every file at most once.

pub mod classifier;
mod runtime;
pub mod store_cache;
pub mod vector_store;

pub use classifier::{
    AnalyticScorer, Axis, ClassDefinition, Classes, Classifier, ClassifierBuilder, ClassifierError,
    ClassifierInfo, ClassifierKind, ConfidenceScorer, ConfidenceVector, DistanceVector, Language,
    ModelExport, Prediction, ScorerState, SentenceMatrixBuilder, SimilarityVector, Tokenizer,
    TrainingReport,
};
pub use runtime::RuntimeConfig;
pub use store_cache::VectorStoreCache;
pub use vector_store::{StoreError, VectorStore};

pub fn init_logger() {
    env_logger::init();
}
