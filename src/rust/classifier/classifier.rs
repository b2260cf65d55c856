use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::algebra::SimilarityVector;
use super::builder::{ClassifierBuilder, Classes};
use super::distance::{
    centroid_confidence, nearest_matrix_distance, nearest_vector_distance, phrase_distance, Axis,
    ConfidenceVector, DistanceVector,
};
use super::error::ClassifierError;
use super::matrix::SentenceMatrixBuilder;
use super::scorer::{AnalyticScorer, ConfidenceScorer};
use super::state::{ModelExport, Representation, FORMAT_VERSION};
use super::tokenizer::Tokenizer;
use super::ClassifierInfo;
use crate::runtime::RuntimeConfig;
use crate::store_cache::VectorStoreCache;
use crate::vector_store::VectorStore;

/// How classes are represented and how a phrase is compared against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// One mean similarity vector per class; confidence is the distance to it
    /// relative to the spread of all class centroids
    Centroid,
    /// Similarity vector per example; distance to the nearest example
    NearestExample,
    /// Word vectors per example; symmetric nearest-word phrase distance
    WordSet,
    /// Sentence matrices of every word ordering per example; distance to the nearest matrix
    #[default]
    Matrix,
}

impl ClassifierKind {
    /// Whether distances go through the [`ConfidenceScorer`]
    pub fn uses_scorer(&self) -> bool {
        !matches!(self, Self::Centroid)
    }
}

/// Classes ranked by confidence, highest first. Ties are ordered by label.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    ranked: Vec<(String, f32)>,
}

impl Prediction {
    fn new(axis: &Axis, confidences: &[f32]) -> Self {
        let mut ranked: Vec<(String, f32)> = axis
            .labels()
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let confidence = confidences.get(i).copied().unwrap_or(0.0);
                let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
                (label.clone(), confidence)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Self { ranked }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.ranked.iter().map(|(label, c)| (label.as_str(), *c))
    }

    /// The highest ranked class
    pub fn best(&self) -> Option<(&str, f32)> {
        self.iter().next()
    }

    pub fn confidence(&self, label: &str) -> Option<f32> {
        self.iter().find(|(l, _)| *l == label).map(|(_, c)| c)
    }

    pub fn ranked(&self) -> &[(String, f32)] {
        &self.ranked
    }

    pub fn to_map(&self) -> HashMap<String, f32> {
        self.ranked.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Summary of a training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingReport {
    /// Number of classes on the axis
    pub classes: usize,
    /// Examples that contributed to the class representations
    pub examples: usize,
    /// `(label, example)` pairs skipped because no word of the example is in the vector store
    pub skipped: Vec<(String, String)>,
    /// Rows per sentence matrix (matrix kind only, 0 otherwise)
    pub sentence_length: usize,
    /// Rows of distance data the scorer was fitted on
    pub fit_rows: usize,
}

#[derive(Debug, Clone)]
struct TrainedModel {
    axis: Axis,
    representation: Representation,
    sentence_length: usize,
}

/// A thread-safe phrase classifier over a word-vector space.
///
/// # Thread Safety
///
/// A trained classifier only reads its state during classification, so it can
/// be shared across threads with `Arc`. The vector store itself is shared
/// read-only between classifiers loaded from the same file.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use std::thread;
/// use wordspace::{ClassDefinition, Classes, Classifier, VectorStore};
///
/// let mut bytes = b"2 2\n".to_vec();
/// for (word, vector) in [("dog", [0.0f32, 1.0]), ("laptop", [1.0, 0.0])] {
///     bytes.extend_from_slice(word.as_bytes());
///     bytes.push(b' ');
///     vector.iter().for_each(|v| bytes.extend_from_slice(&v.to_le_bytes()));
/// }
/// let store = Arc::new(VectorStore::parse("inline", &bytes)?);
///
/// let mut classifier = Classifier::builder().with_store(store).build()?;
/// classifier.train(
///     &Classes::new()
///         .add_class(ClassDefinition::new("pet").with_examples(vec!["dog"]))?
///         .add_class(ClassDefinition::new("device").with_examples(vec!["laptop"]))?,
/// )?;
///
/// let classifier = Arc::new(classifier);
/// let shared = Arc::clone(&classifier);
/// let label = thread::spawn(move || shared.predict("my dog").map(|(label, _)| label))
///     .join()
///     .unwrap()?;
/// assert_eq!(label, "pet");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Classifier {
    store: Arc<VectorStore>,
    tokenizer: Tokenizer,
    kind: ClassifierKind,
    config: RuntimeConfig,
    scorer: Box<dyn ConfidenceScorer>,
    trained: Option<TrainedModel>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }

    pub(crate) fn from_parts(
        store: Arc<VectorStore>,
        tokenizer: Tokenizer,
        kind: ClassifierKind,
        config: RuntimeConfig,
        scorer: Box<dyn ConfidenceScorer>,
    ) -> Self {
        Self {
            store,
            tokenizer,
            kind,
            config,
            scorer,
            trained: None,
        }
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            kind: self.kind,
            store_path: self.store.path().to_path_buf(),
            dimension: self.store.dimension(),
            trained: self.trained.is_some(),
            class_labels: self
                .trained
                .as_ref()
                .map(|t| t.axis.labels().to_vec())
                .unwrap_or_default(),
            sentence_length: self.trained.as_ref().map_or(0, |t| t.sentence_length),
            scorer: self.scorer.kind().to_string(),
        }
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn matrix_builder(&self) -> SentenceMatrixBuilder {
        SentenceMatrixBuilder::new(Arc::clone(&self.store), self.config.max_phrase_tokens)
    }

    fn trained(&self) -> Result<&TrainedModel, ClassifierError> {
        self.trained.as_ref().ok_or(ClassifierError::NotTrainedError)
    }

    fn has_known_word(&self, tokens: &[String]) -> bool {
        tokens.iter().any(|t| self.store.contains(t))
    }

    fn phrase_similarity(&self, tokens: &[String]) -> SimilarityVector {
        self.store.most_similar(tokens, &[], self.config.similar_topn)
    }

    /// Maps `f` over `items`, on the rayon pool when parallelism is enabled.
    /// Output order always follows `items`.
    fn map_items<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.config.parallel {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    /// Trains the classifier on `classes`, replacing any earlier training.
    ///
    /// Examples without any word known to the vector store are skipped and
    /// listed in the report. On error the previous state is kept.
    ///
    /// # Errors
    /// * `ValidationError` if `classes` is empty or no example has a known word
    /// * `EmptySetError` if a class has no usable example (centroid kind)
    /// * `PhraseTooLongError` if an example has more distinct known words than
    ///   `max_phrase_tokens` (matrix kind)
    pub fn train(&mut self, classes: &Classes) -> Result<TrainingReport, ClassifierError> {
        if classes.is_empty() {
            return Err(ClassifierError::ValidationError(
                "At least one class must be added".into(),
            ));
        }
        let axis = Axis::new(classes.labels());
        info!("Training {:?} classifier on {} classes", self.kind, axis.len());

        let mut skipped = Vec::new();
        let mut prepared: Vec<Vec<Vec<String>>> = Vec::with_capacity(axis.len());
        for label in axis.labels() {
            let mut usable = Vec::new();
            for example in classes.get(label).map(|c| c.examples.as_slice()).unwrap_or_default() {
                let tokens = self.tokenizer.tokenize(example);
                if self.has_known_word(&tokens) {
                    usable.push(tokens);
                } else {
                    warn!("Skipping example {:?} of class '{}': no known words", example, label);
                    skipped.push((label.clone(), example.clone()));
                }
            }
            debug!("Class '{}': {} usable examples", label, usable.len());
            prepared.push(usable);
        }

        let examples: usize = prepared.iter().map(Vec::len).sum();
        if examples == 0 {
            return Err(ClassifierError::ValidationError(
                "No example contains a word known to the vector store".into(),
            ));
        }

        let (representation, sentence_length) = match self.kind {
            ClassifierKind::Centroid => (self.centroid_representation(&axis, &prepared)?, 0),
            ClassifierKind::NearestExample => (
                Representation::NearestExample {
                    examples: prepared
                        .iter()
                        .map(|class| self.map_items(class, |tokens| self.phrase_similarity(tokens)))
                        .collect(),
                },
                0,
            ),
            ClassifierKind::WordSet => (
                Representation::WordSet {
                    examples: prepared
                        .iter()
                        .map(|class| {
                            let builder = self.matrix_builder();
                            class.iter().map(|tokens| builder.word_vectors(tokens)).collect()
                        })
                        .collect(),
                },
                0,
            ),
            ClassifierKind::Matrix => self.matrix_representation(&prepared)?,
        };

        let mut fit_rows = 0;
        if self.kind.uses_scorer() {
            let (distances, targets) = self.fit_data(&axis, &representation);
            fit_rows = distances.len();
            info!("Fitting {} scorer on {} rows", self.scorer.kind(), fit_rows);
            self.scorer.fit(&distances, &targets)?;
        }

        self.trained = Some(TrainedModel {
            axis,
            representation,
            sentence_length,
        });
        info!(
            "Training finished: {} examples used, {} skipped",
            examples,
            skipped.len()
        );
        Ok(TrainingReport {
            classes: classes.len(),
            examples,
            skipped,
            sentence_length,
            fit_rows,
        })
    }

    fn centroid_representation(
        &self,
        axis: &Axis,
        prepared: &[Vec<Vec<String>>],
    ) -> Result<Representation, ClassifierError> {
        let mut centroids = Vec::with_capacity(prepared.len());
        for (label, class) in axis.labels().iter().zip(prepared) {
            if class.is_empty() {
                return Err(ClassifierError::EmptySetError(format!(
                    "Class '{}' has no example with known words",
                    label
                )));
            }
            let vectors = self.map_items(class, |tokens| self.phrase_similarity(tokens));
            centroids.push(SimilarityVector::centroid(&vectors)?);
        }
        let global_center = SimilarityVector::centroid(&centroids)?;
        Ok(Representation::Centroid {
            centroids,
            global_center,
        })
    }

    fn matrix_representation(
        &self,
        prepared: &[Vec<Vec<String>>],
    ) -> Result<(Representation, usize), ClassifierError> {
        let builder = self.matrix_builder();
        let mut length = 0;
        let mut per_class = Vec::with_capacity(prepared.len());
        for class in prepared {
            let mut seen = HashSet::new();
            let mut matrices = Vec::new();
            for tokens in class {
                let words: BTreeSet<&str> = builder.distinct_known_tokens(tokens).into_iter().collect();
                if !seen.insert(words) {
                    continue;
                }
                let orderings = builder.permutations(tokens)?;
                length = orderings.first().map_or(length, |m| length.max(m.nrows()));
                matrices.extend(orderings);
            }
            per_class.push(matrices);
        }
        let matrices = per_class
            .into_iter()
            .map(|class| SentenceMatrixBuilder::normalize_size(class, length))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Built {} sentence matrices of {} rows",
            matrices.iter().map(Vec::len).sum::<usize>(),
            length
        );
        Ok((Representation::Matrix { matrices }, length))
    }

    /// Distances from every stored example to every class, paired with one-hot
    /// targets. Exact-zero distances to the example's own class are ignored so an
    /// example is not matched against itself.
    fn fit_data(&self, axis: &Axis, representation: &Representation) -> (Vec<DistanceVector>, Vec<Vec<f32>>) {
        let targets: Vec<Vec<f32>> = axis
            .labels()
            .iter()
            .map(|label| axis.one_hot(label).unwrap_or_default())
            .collect();
        let nearest = |distances: Vec<f32>, trim_zeros: bool| -> f32 {
            distances
                .into_iter()
                .filter(|&d| !(trim_zeros && d == 0.0))
                .fold(f32::INFINITY, f32::min)
        };

        let mut rows: Vec<(DistanceVector, Vec<f32>)> = Vec::new();
        match representation {
            Representation::Centroid { .. } => {}
            Representation::NearestExample { examples } => {
                for (own, class) in examples.iter().enumerate() {
                    rows.extend(self.map_items(class, |vector| {
                        let distances: DistanceVector = examples
                            .iter()
                            .enumerate()
                            .map(|(ci, other)| {
                                if ci == own {
                                    nearest(other.iter().map(|e| (vector - e).length()).collect(), true)
                                } else {
                                    nearest_vector_distance(vector, other)
                                }
                            })
                            .collect();
                        (distances, targets[own].clone())
                    }));
                }
            }
            Representation::WordSet { examples } => {
                for (own, class) in examples.iter().enumerate() {
                    rows.extend(self.map_items(class, |words| {
                        let distances: DistanceVector = examples
                            .iter()
                            .enumerate()
                            .map(|(ci, other)| {
                                nearest(other.iter().map(|e| phrase_distance(words, e)).collect(), ci == own)
                            })
                            .collect();
                        (distances, targets[own].clone())
                    }));
                }
            }
            Representation::Matrix { matrices } => {
                for (own, class) in matrices.iter().enumerate() {
                    rows.extend(self.map_items(class, |matrix| {
                        let distances: DistanceVector = matrices
                            .iter()
                            .enumerate()
                            .map(|(ci, other)| nearest_matrix_distance(other, matrix, ci == own))
                            .collect();
                        (distances, targets[own].clone())
                    }));
                }
            }
        }
        rows.into_iter().unzip()
    }

    fn distances(&self, trained: &TrainedModel, tokens: &[String]) -> Result<DistanceVector, ClassifierError> {
        if !self.has_known_word(tokens) {
            return Ok(vec![f32::INFINITY; trained.axis.len()]);
        }
        let distances = match &trained.representation {
            Representation::Centroid { centroids, .. } => {
                let vector = self.phrase_similarity(tokens);
                centroids.iter().map(|c| (&vector - c).length()).collect()
            }
            Representation::NearestExample { examples } => {
                let vector = self.phrase_similarity(tokens);
                self.map_items(examples, |class| nearest_vector_distance(&vector, class))
            }
            Representation::WordSet { examples } => {
                let words: Vec<Array1<f32>> = self.matrix_builder().word_vectors(tokens);
                self.map_items(examples, |class| {
                    class
                        .iter()
                        .map(|example| phrase_distance(&words, example))
                        .fold(f32::INFINITY, f32::min)
                })
            }
            Representation::Matrix { matrices } => {
                let length = trained.sentence_length;
                let orderings: Vec<Array2<f32>> = self
                    .matrix_builder()
                    .prefix_permutations(tokens, length)?
                    .into_iter()
                    .map(|m| SentenceMatrixBuilder::pad(m, length))
                    .collect::<Result<_, _>>()?;
                self.map_items(matrices, |class| {
                    orderings
                        .iter()
                        .map(|ordering| nearest_matrix_distance(class, ordering, false))
                        .fold(f32::INFINITY, f32::min)
                })
            }
        };
        Ok(distances)
    }

    /// Distance from `text` to every class, in axis order. For the centroid kind
    /// these are the distances to the class centroids.
    ///
    /// A phrase without known words is infinitely far from every class.
    pub fn distance_vector(&self, text: &str) -> Result<DistanceVector, ClassifierError> {
        let trained = self.trained()?;
        let tokens = self.tokenizer.tokenize(text);
        self.distances(trained, &tokens)
    }

    fn confidences(&self, trained: &TrainedModel, tokens: &[String]) -> Result<ConfidenceVector, ClassifierError> {
        match &trained.representation {
            Representation::Centroid {
                centroids,
                global_center,
            } => {
                if !self.has_known_word(tokens) {
                    return Ok(vec![0.0; centroids.len()]);
                }
                let vector = self.phrase_similarity(tokens);
                Ok(centroids
                    .iter()
                    .map(|c| centroid_confidence(&vector, c, global_center))
                    .collect())
            }
            _ => {
                let distances = self.distances(trained, tokens)?;
                self.scorer.predict(&distances)
            }
        }
    }

    /// Ranks every trained class by confidence that `text` belongs to it
    ///
    /// # Errors
    /// * `NotTrainedError` if `train` has not succeeded yet
    /// * `PhraseTooLongError` if `text` has more distinct known words than
    ///   `max_phrase_tokens` (matrix kind)
    pub fn classify(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let trained = self.trained()?;
        let tokens = self.tokenizer.tokenize(text);
        let confidences = self.confidences(trained, &tokens)?;
        Ok(Prediction::new(&trained.axis, &confidences))
    }

    /// Predicts the class of the input text and returns class scores.
    ///
    /// # Returns
    /// A tuple containing:
    /// * The predicted class label (String)
    /// * A HashMap of class labels to their confidences (0.0 to 1.0)
    pub fn predict(&self, text: &str) -> Result<(String, HashMap<String, f32>), ClassifierError> {
        let prediction = self.classify(text)?;
        let best = prediction
            .best()
            .map(|(label, _)| label.to_string())
            .unwrap_or_default();
        Ok((best, prediction.to_map()))
    }

    /// Snapshot of the trained state
    ///
    /// # Errors
    /// * `NotTrainedError` if `train` has not succeeded yet
    pub fn export(&self) -> Result<ModelExport, ClassifierError> {
        let trained = self.trained()?;
        Ok(ModelExport {
            format_version: FORMAT_VERSION,
            kind: self.kind,
            store_path: self.store.path().to_path_buf(),
            store_fingerprint: self.store.fingerprint().to_string(),
            dimension: self.store.dimension(),
            stop_words: self.tokenizer.stop_words(),
            delimiters: self.tokenizer.delimiters().to_string(),
            axis: trained.axis.clone(),
            representation: trained.representation.to_state(),
            sentence_length: trained.sentence_length,
            scorer: self.kind.uses_scorer().then(|| self.scorer.export_state()),
            runtime: self.config.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String, ClassifierError> {
        self.export()?.to_json()
    }

    /// Restores a classifier exported by [`export`](Self::export), using the
    /// default [`AnalyticScorer`]
    pub fn import(export: ModelExport, cache: &VectorStoreCache) -> Result<Self, ClassifierError> {
        Self::import_with_scorer(export, cache, Box::new(AnalyticScorer::default()))
    }

    pub fn from_json(json: &str, cache: &VectorStoreCache) -> Result<Self, ClassifierError> {
        Self::import(ModelExport::from_json(json)?, cache)
    }

    /// Restores a classifier, loading the scorer state into `scorer`
    ///
    /// # Errors
    /// * `StoreError` if the referenced vector file cannot be loaded
    /// * `StoreMismatch` if the vector file changed since the export
    /// * `ValidationError` if the export is internally inconsistent or its
    ///   runtime configuration is invalid
    pub fn import_with_scorer(
        export: ModelExport,
        cache: &VectorStoreCache,
        mut scorer: Box<dyn ConfidenceScorer>,
    ) -> Result<Self, ClassifierError> {
        if export.format_version != FORMAT_VERSION {
            return Err(ClassifierError::SerializationError(format!(
                "Unsupported export format version {}",
                export.format_version
            )));
        }
        export.runtime.validate()?;
        let store = cache.load(&export.store_path)?;
        if store.fingerprint() != export.store_fingerprint {
            return Err(ClassifierError::StoreMismatch {
                path: export.store_path.display().to_string(),
                expected: export.store_fingerprint,
                actual: store.fingerprint().to_string(),
            });
        }
        if store.dimension() != export.dimension {
            return Err(ClassifierError::ValidationError(format!(
                "Export expects dimension {}, vector store has {}",
                export.dimension,
                store.dimension()
            )));
        }

        let representation = Representation::from_state(
            &export.representation,
            export.axis.len(),
            export.dimension,
            export.sentence_length,
        )?;
        if representation.kind() != export.kind {
            return Err(ClassifierError::ValidationError(format!(
                "Export kind {:?} does not match its {:?} representation",
                export.kind,
                representation.kind()
            )));
        }
        match &export.scorer {
            Some(state) => scorer.import_state(state)?,
            None if export.kind.uses_scorer() => {
                return Err(ClassifierError::ValidationError(format!(
                    "Export of a {:?} classifier has no scorer state",
                    export.kind
                )));
            }
            None => {}
        }

        let tokenizer = Tokenizer::new(&export.stop_words).with_delimiters(export.delimiters);
        info!(
            "Imported {:?} classifier with {} classes from {}",
            export.kind,
            export.axis.len(),
            store.path().display()
        );
        Ok(Self {
            store,
            tokenizer,
            kind: export.kind,
            config: export.runtime,
            scorer,
            trained: Some(TrainedModel {
                axis: export.axis,
                representation,
                sentence_length: export.sentence_length,
            }),
        })
    }
}
