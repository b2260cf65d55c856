use std::path::Path;
use std::sync::Arc;

use log::info;

use super::classifier::{Classifier, ClassifierKind};
use super::error::ClassifierError;
use super::scorer::{AnalyticScorer, ConfidenceScorer};
use super::tokenizer::{Language, Tokenizer, DEFAULT_DELIMITERS};
use crate::runtime::RuntimeConfig;
use crate::store_cache::VectorStoreCache;
use crate::vector_store::VectorStore;

/// Represents a class definition with a required label and its example phrases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    /// The unique identifier for the class
    pub label: String,
    /// Example phrases that belong to this class. Every example becomes part of
    /// the class representation; phrases without any known word are skipped at
    /// training time.
    pub examples: Vec<String>,
}

impl ClassDefinition {
    /// Creates a new class definition without examples
    ///
    /// # Example
    /// ```
    /// use wordspace::ClassDefinition;
    ///
    /// let class = ClassDefinition::new("computer");
    /// assert!(class.examples.is_empty());
    /// ```
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            examples: Vec::new(),
        }
    }

    /// Adds examples to the class definition
    ///
    /// # Example
    /// ```
    /// use wordspace::ClassDefinition;
    ///
    /// let class = ClassDefinition::new("computer")
    ///     .with_examples(vec!["I have a computer", "I have a laptop"]);
    /// assert_eq!(class.examples.len(), 2);
    /// ```
    pub fn with_examples(mut self, examples: Vec<impl Into<String>>) -> Self {
        self.examples.extend(examples.into_iter().map(Into::into));
        self
    }
}

/// Validated training input: uniquely labelled classes with at least one example each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classes {
    classes: Vec<ClassDefinition>,
}

impl Classes {
    pub const MAX_CLASSES: usize = 100;

    pub fn new() -> Self {
        Self::default()
    }

    /// Validates class data according to the following rules:
    /// - Label must not be empty
    /// - Must have at least one example
    /// - No example text can be empty
    fn validate_class_data(label: &str, examples: &[impl AsRef<str>]) -> Result<(), ClassifierError> {
        if label.is_empty() {
            return Err(ClassifierError::ValidationError("Class label cannot be empty".into()));
        }
        if examples.is_empty() {
            return Err(ClassifierError::ValidationError(format!(
                "Class '{}' must have at least one example",
                label
            )));
        }
        if let Some(pos) = examples.iter().position(|e| e.as_ref().trim().is_empty()) {
            return Err(ClassifierError::ValidationError(format!(
                "Example {} of class '{}' cannot be empty",
                pos + 1,
                label
            )));
        }
        Ok(())
    }

    /// Adds a class to the collection
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The collection if successful, or an error if:
    ///   - The class label is empty or already present
    ///   - No examples are provided
    ///   - Any example text is empty
    ///   - Maximum number of classes (100) is exceeded
    ///
    /// # Example
    /// ```
    /// use wordspace::{ClassDefinition, Classes};
    ///
    /// let classes = Classes::new()
    ///     .add_class(ClassDefinition::new("dog").with_examples(vec!["I have a dog"]))
    ///     .unwrap();
    /// assert_eq!(classes.len(), 1);
    /// ```
    pub fn add_class(mut self, class: ClassDefinition) -> Result<Self, ClassifierError> {
        Self::validate_class_data(&class.label, &class.examples)?;

        if self.get(&class.label).is_some() {
            return Err(ClassifierError::ValidationError(format!(
                "Class '{}' is defined twice",
                class.label
            )));
        }
        if self.classes.len() >= Self::MAX_CLASSES {
            return Err(ClassifierError::ValidationError(format!(
                "Maximum number of classes ({}) exceeded",
                Self::MAX_CLASSES
            )));
        }

        self.classes.push(class);
        Ok(self)
    }

    pub fn get(&self, label: &str) -> Option<&ClassDefinition> {
        self.classes.iter().find(|c| c.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.classes.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// A builder for constructing a Classifier with a fluent interface.
#[derive(Debug, Default)]
pub struct ClassifierBuilder {
    store: Option<Arc<VectorStore>>,
    kind: ClassifierKind,
    stop_words: Vec<String>,
    delimiters: Option<String>,
    runtime_config: RuntimeConfig,
    scorer: Option<Box<dyn ConfidenceScorer>>,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an already loaded vector store
    pub fn with_store(mut self, store: Arc<VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Loads the vector store at `path` through `cache`, so classifiers built
    /// from the same file share one parsed copy
    ///
    /// # Errors
    /// * `StoreError` if the file cannot be read or is not a valid vector file
    ///
    /// # Example
    /// ```no_run
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use wordspace::{ClassifierBuilder, VectorStoreCache};
    ///
    /// let cache = VectorStoreCache::new();
    /// let builder = ClassifierBuilder::new()
    ///     .with_store_path("vectors/model.bin", &cache)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_store_path<P: AsRef<Path>>(
        mut self,
        path: P,
        cache: &VectorStoreCache,
    ) -> Result<Self, ClassifierError> {
        self.store = Some(cache.load(path)?);
        Ok(self)
    }

    /// Selects how classes are represented and compared
    pub fn with_kind(mut self, kind: ClassifierKind) -> Self {
        self.kind = kind;
        self
    }

    /// Replaces the stop word list
    pub fn with_stop_words<I, S>(mut self, stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words = stop_words.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the stop word list with the built-in list for `language`
    pub fn with_language(self, language: Language) -> Self {
        self.with_stop_words(language.stop_words().iter().copied())
    }

    /// Replaces the set of characters that separate words
    pub fn with_delimiters(mut self, delimiters: impl Into<String>) -> Self {
        self.delimiters = Some(delimiters.into());
        self
    }

    /// Sets the runtime configuration used for training and classification
    ///
    /// # Example
    /// ```
    /// use wordspace::{ClassifierBuilder, RuntimeConfig};
    ///
    /// let config = RuntimeConfig {
    ///     max_phrase_tokens: 4,
    ///     ..RuntimeConfig::default()
    /// };
    /// let builder = ClassifierBuilder::new().with_runtime_config(config);
    /// ```
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Replaces the default [`AnalyticScorer`]
    pub fn with_scorer(mut self, scorer: Box<dyn ConfidenceScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Builds an untrained Classifier
    ///
    /// # Returns
    /// * `Result<Classifier, ClassifierError>` - The constructed Classifier if successful, or an error if:
    ///   - No vector store is set
    ///   - The store holds no words
    ///   - The runtime configuration allows zero tokens or zero neighbours
    pub fn build(self) -> Result<Classifier, ClassifierError> {
        let store = self
            .store
            .ok_or_else(|| ClassifierError::ValidationError("A vector store must be set".into()))?;
        if store.is_empty() {
            return Err(ClassifierError::ValidationError(format!(
                "Vector store {} holds no words",
                store.path().display()
            )));
        }
        self.runtime_config.validate()?;

        let tokenizer = Tokenizer::new(self.stop_words)
            .with_delimiters(self.delimiters.unwrap_or_else(|| DEFAULT_DELIMITERS.to_string()));
        let scorer = self
            .scorer
            .unwrap_or_else(|| Box::new(AnalyticScorer::default()));

        info!(
            "Building {:?} classifier over {} ({} words, dimension {})",
            self.kind,
            store.path().display(),
            store.len(),
            store.dimension()
        );
        Ok(Classifier::from_parts(
            store,
            tokenizer,
            self.kind,
            self.runtime_config,
            scorer,
        ))
    }
}
