use std::sync::Arc;

use ndarray::{s, Array1, Array2, Axis};

use super::error::ClassifierError;
use crate::vector_store::VectorStore;

/// Turns token sequences into sentence matrices: one word vector per row.
///
/// Training represents every example by all orderings of its distinct known
/// words so that matrix distances do not depend on word order. The number of
/// orderings is `n!`, so phrases with more than `max_phrase_tokens` distinct
/// known words are rejected.
#[derive(Debug, Clone)]
pub struct SentenceMatrixBuilder {
    store: Arc<VectorStore>,
    max_phrase_tokens: usize,
}

impl SentenceMatrixBuilder {
    pub fn new(store: Arc<VectorStore>, max_phrase_tokens: usize) -> Self {
        Self {
            store,
            max_phrase_tokens,
        }
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    pub fn max_phrase_tokens(&self) -> usize {
        self.max_phrase_tokens
    }

    /// Word vectors of the known tokens, in order. Unknown tokens are dropped.
    pub fn word_vectors(&self, tokens: &[String]) -> Vec<Array1<f32>> {
        tokens
            .iter()
            .filter_map(|token| self.store.lookup(token).ok())
            .map(|view| view.to_owned())
            .collect()
    }

    /// Sentence matrix of the known tokens, in order. Unknown tokens are dropped, not zero filled.
    pub fn build(&self, tokens: &[String]) -> Array2<f32> {
        let known: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| self.store.contains(t))
            .collect();
        self.stack(&known)
    }

    /// Distinct known tokens in order of first occurrence.
    ///
    /// Repeated words collapse into one, so "dog dog" and "dog" share a representation.
    pub fn distinct_known_tokens<'a>(&self, tokens: &'a [String]) -> Vec<&'a str> {
        let mut distinct: Vec<&str> = Vec::new();
        for token in tokens {
            if self.store.contains(token) && !distinct.contains(&token.as_str()) {
                distinct.push(token);
            }
        }
        distinct
    }

    /// One matrix per ordering of the distinct known tokens, in lexicographic
    /// order of token positions.
    ///
    /// # Errors
    /// - `PhraseTooLongError` if there are more than `max_phrase_tokens` distinct known tokens
    pub fn permutations(&self, tokens: &[String]) -> Result<Vec<Array2<f32>>, ClassifierError> {
        let distinct = self.checked_distinct(tokens)?;
        Ok(self.orderings(&distinct, distinct.len()))
    }

    /// Like [`permutations`](Self::permutations) but every ordering keeps only its
    /// first `length` rows. Orderings that share a prefix are produced once.
    pub fn prefix_permutations(
        &self,
        tokens: &[String],
        length: usize,
    ) -> Result<Vec<Array2<f32>>, ClassifierError> {
        let distinct = self.checked_distinct(tokens)?;
        Ok(self.orderings(&distinct, length.min(distinct.len())))
    }

    /// Pads every matrix with trailing zero rows up to `target` rows.
    ///
    /// # Errors
    /// - `ValidationError` if a matrix already has more than `target` rows
    pub fn normalize_size(matrices: Vec<Array2<f32>>, target: usize) -> Result<Vec<Array2<f32>>, ClassifierError> {
        matrices
            .into_iter()
            .map(|matrix| Self::pad(matrix, target))
            .collect()
    }

    pub(crate) fn pad(matrix: Array2<f32>, target: usize) -> Result<Array2<f32>, ClassifierError> {
        let rows = matrix.nrows();
        if rows > target {
            return Err(ClassifierError::ValidationError(format!(
                "Sentence matrix has {} rows, more than the model length {}",
                rows, target
            )));
        }
        if rows == target {
            return Ok(matrix);
        }
        let mut padded = Array2::zeros((target, matrix.ncols()));
        padded.slice_mut(s![..rows, ..]).assign(&matrix);
        Ok(padded)
    }

    fn checked_distinct<'a>(&self, tokens: &'a [String]) -> Result<Vec<&'a str>, ClassifierError> {
        let distinct = self.distinct_known_tokens(tokens);
        if distinct.len() > self.max_phrase_tokens {
            return Err(ClassifierError::PhraseTooLongError {
                tokens: distinct.len(),
                max: self.max_phrase_tokens,
            });
        }
        Ok(distinct)
    }

    fn stack(&self, words: &[&str]) -> Array2<f32> {
        let dimension = self.dimension();
        let mut matrix = Array2::zeros((words.len(), dimension));
        for (mut row, word) in matrix.axis_iter_mut(Axis(0)).zip(words) {
            if let Ok(vector) = self.store.lookup(word) {
                row.assign(&vector);
            }
        }
        matrix
    }

    fn orderings(&self, words: &[&str], length: usize) -> Vec<Array2<f32>> {
        let rows = self.stack(words);
        k_permutations(words.len(), length)
            .iter()
            .map(|order| rows.select(Axis(0), order))
            .collect()
    }
}

/// All ordered selections of `k` out of `n` indices, lexicographic.
fn k_permutations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn extend(n: usize, k: usize, current: &mut Vec<usize>, used: &mut [bool], out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in 0..n {
            if !used[i] {
                used[i] = true;
                current.push(i);
                extend(n, k, current, used, out);
                current.pop();
                used[i] = false;
            }
        }
    }

    let mut out = Vec::new();
    extend(n, k.min(n), &mut Vec::with_capacity(k), &mut vec![false; n], &mut out);
    out
}
