use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io::{self, BufRead, Cursor};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use sha2::{Digest, Sha256};

use crate::classifier::SimilarityVector;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Corrupt vector file: {0}")]
    CorruptFormat(String),
    #[error("Word not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Read-only dictionary of pretrained word vectors.
///
/// Vectors are stored row-wise in a single matrix so similarity queries run
/// as one matrix-vector product. All rows share the dimension declared in
/// the file header.
pub struct VectorStore {
    path: PathBuf,
    fingerprint: String,
    words: Vec<String>,
    index: HashMap<String, usize>,
    vectors: Array2<f32>,
    norms: Array1<f32>,
}

impl fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorStore")
            .field("path", &self.path)
            .field("vocabulary_size", &self.words.len())
            .field("dimension", &self.dimension())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl VectorStore {
    /// Loads a binary word-vector file.
    ///
    /// # Format
    /// - ASCII header `"<vocabulary_size> <dimension>\n"`
    /// - `vocabulary_size` records: token bytes, one space byte, then
    ///   `dimension` little-endian `f32` values
    ///
    /// # Errors
    /// - `IoError` if the file cannot be read
    /// - `CorruptFormat` if the header or any record is malformed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        log::info!("Loading word vectors from {:?}", path);
        let bytes = fs::read(path)?;
        let store = Self::parse(path, &bytes)?;
        log::info!(
            "Loaded {} word vectors (dimension {}) from {:?}",
            store.len(),
            store.dimension(),
            path
        );
        Ok(store)
    }

    /// Parses an in-memory copy of a vector file. `path` is only recorded.
    pub fn parse<P: Into<PathBuf>>(path: P, bytes: &[u8]) -> Result<Self, StoreError> {
        let mut cursor = Cursor::new(bytes);
        let (vocabulary_size, dimension) = read_header(&mut cursor)?;

        let record_bytes = dimension
            .checked_mul(4)
            .ok_or_else(|| StoreError::CorruptFormat(format!("Dimension {} is too large", dimension)))?;
        let remaining = bytes.len() - cursor.position() as usize;
        if vocabulary_size > 0 && record_bytes > remaining {
            return Err(StoreError::CorruptFormat(format!(
                "Dimension {} needs {} bytes per record but only {} remain",
                dimension, record_bytes, remaining
            )));
        }
        // Header values are untrusted: never reserve more than the input could hold.
        let capacity = vocabulary_size.min(bytes.len() / (record_bytes + 2).max(1));

        let mut words: Vec<String> = Vec::with_capacity(capacity);
        let mut index: HashMap<String, usize> = HashMap::with_capacity(capacity);
        let mut data: Vec<f32> = Vec::with_capacity(capacity * dimension);
        let mut token = Vec::new();
        let mut row = vec![0f32; dimension];

        for record in 0..vocabulary_size {
            token.clear();
            cursor.read_until(b' ', &mut token)?;
            if token.pop() != Some(b' ') {
                return Err(StoreError::CorruptFormat(format!(
                    "Unexpected end of input in token of record {} of {}",
                    record + 1,
                    vocabulary_size
                )));
            }
            // Writers that end each record with a newline leave it in front of the next token.
            let word_bytes = match token.first() {
                Some(b'\n') => &token[1..],
                _ => &token[..],
            };
            let word = std::str::from_utf8(word_bytes)
                .map_err(|e| {
                    StoreError::CorruptFormat(format!("Record {} token is not valid UTF-8: {}", record + 1, e))
                })?
                .to_string();

            cursor.read_f32_into::<LittleEndian>(&mut row).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => StoreError::CorruptFormat(format!(
                    "Unexpected end of input in vector of record {} ('{}'), expected {} bytes",
                    record + 1,
                    word,
                    record_bytes
                )),
                _ => StoreError::IoError(e),
            })?;

            match index.get(&word) {
                Some(&existing) => {
                    data[existing * dimension..(existing + 1) * dimension].copy_from_slice(&row);
                }
                None => {
                    index.insert(word.clone(), words.len());
                    words.push(word);
                    data.extend_from_slice(&row);
                }
            }
        }

        let vectors = Array2::from_shape_vec((words.len(), dimension), data)
            .map_err(|e| StoreError::CorruptFormat(format!("Failed to shape vector matrix: {}", e)))?;
        let norms = vectors.map_axis(Axis(1), |row| row.dot(&row).sqrt());

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let fingerprint = format!("{:x}", hasher.finalize());

        Ok(Self {
            path: path.into(),
            fingerprint,
            words,
            index,
            vectors,
            norms,
        })
    }

    /// Returns the vector of `word`, or `NotFound` when it is not in the vocabulary.
    pub fn lookup(&self, word: &str) -> Result<ArrayView1<'_, f32>, StoreError> {
        self.index
            .get(word)
            .map(|&i| self.vectors.row(i))
            .ok_or_else(|| StoreError::NotFound(word.to_string()))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 of the file contents, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Vocabulary in file order (first occurrence of duplicated tokens).
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Finds the words closest in direction to the given words.
    ///
    /// The query is the mean of the unit vectors of `positive` minus those of
    /// `negative`. Every other word is scored by cosine similarity to it and the
    /// best `topn` are returned as a [`SimilarityVector`]. Unknown words are
    /// ignored; if no known word remains the result is empty.
    pub fn most_similar(&self, positive: &[String], negative: &[String], topn: usize) -> SimilarityVector {
        let mut query = Array1::<f32>::zeros(self.dimension());
        let mut used = HashSet::new();
        let mut count = 0usize;

        let signed = positive
            .iter()
            .map(|w| (w, 1.0f32))
            .chain(negative.iter().map(|w| (w, -1.0f32)));
        for (word, sign) in signed {
            let Some(&i) = self.index.get(word.as_str()) else {
                continue;
            };
            used.insert(i);
            let norm = self.norms[i];
            if norm > 1e-10 {
                query.scaled_add(sign / norm, &self.vectors.row(i));
                count += 1;
            }
        }
        if count == 0 {
            return SimilarityVector::new();
        }
        query /= count as f32;
        let query_norm = query.dot(&query).sqrt();
        if query_norm <= 1e-10 {
            return SimilarityVector::new();
        }

        let dots = self.vectors.dot(&query);
        let mut scored: Vec<(usize, f32)> = dots
            .iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(i))
            .map(|(i, &dot)| {
                let norm = self.norms[i];
                let similarity = if norm > 1e-10 { dot / (norm * query_norm) } else { 0.0 };
                (i, similarity)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.words[a.0].cmp(&self.words[b.0]))
        });
        scored.truncate(topn);

        SimilarityVector::from_pairs(scored.into_iter().map(|(i, s)| (self.words[i].clone(), s)))
    }
}

fn read_header(cursor: &mut Cursor<&[u8]>) -> Result<(usize, usize), StoreError> {
    let mut line = Vec::new();
    cursor.read_until(b'\n', &mut line)?;
    if line.pop() != Some(b'\n') {
        return Err(StoreError::CorruptFormat("Missing header line".into()));
    }
    let header = std::str::from_utf8(&line)
        .map_err(|_| StoreError::CorruptFormat("Header is not valid UTF-8".into()))?;
    let parts: Vec<&str> = header.split_whitespace().collect();
    let parsed: Vec<usize> = parts
        .iter()
        .filter_map(|p| p.parse::<usize>().ok())
        .collect();
    match (parts.len(), parsed.as_slice()) {
        (2, &[vocabulary_size, dimension]) => Ok((vocabulary_size, dimension)),
        _ => Err(StoreError::CorruptFormat(format!(
            "Header must hold vocabulary size and dimension, got '{}'",
            header
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::encode_store;

    #[test]
    fn test_parse_records() {
        let bytes = encode_store(&[("dog", vec![1.0, 2.0]), ("cat", vec![-0.5, 0.25])]);
        let store = VectorStore::parse("mem", &bytes).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimension(), 2);
        assert_eq!(store.lookup("cat").unwrap().to_vec(), vec![-0.5, 0.25]);
        assert_eq!(store.words().collect::<Vec<_>>(), vec!["dog", "cat"]);
    }

    #[test]
    fn test_lookup_missing_word() {
        let bytes = encode_store(&[("dog", vec![1.0])]);
        let store = VectorStore::parse("mem", &bytes).unwrap();
        assert!(matches!(store.lookup("cat"), Err(StoreError::NotFound(w)) if w == "cat"));
    }

    #[test]
    fn test_token_ends_only_at_space() {
        // Tabs and other bytes are part of the token
        let mut bytes = b"1 1\nhot\tdog ".to_vec();
        bytes.extend_from_slice(&3.5f32.to_le_bytes());
        let store = VectorStore::parse("mem", &bytes).unwrap();
        assert!(store.contains("hot\tdog"));
    }

    #[test]
    fn test_newline_terminated_records() {
        let mut bytes = b"2 1\nfirst ".to_vec();
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend_from_slice(b"\nsecond ");
        bytes.extend_from_slice(&2.0f32.to_le_bytes());
        bytes.push(b'\n');
        let store = VectorStore::parse("mem", &bytes).unwrap();
        assert_eq!(store.lookup("second").unwrap()[0], 2.0);
    }

    #[test]
    fn test_corrupt_header() {
        for header in ["", "3\n", "a b\n", "1 2 3\n", "2 2"] {
            let result = VectorStore::parse("mem", header.as_bytes());
            assert!(
                matches!(result, Err(StoreError::CorruptFormat(_))),
                "header {:?} should be rejected",
                header
            );
        }
    }

    #[test]
    fn test_oversized_dimension() {
        let result = VectorStore::parse("mem", b"1 100000000000\nx \0\0\x80?");
        assert!(matches!(result, Err(StoreError::CorruptFormat(_))));

        let result = VectorStore::parse("mem", format!("2 {}\n", usize::MAX / 4).as_bytes());
        assert!(matches!(result, Err(StoreError::CorruptFormat(_))));
    }

    #[test]
    fn test_truncated_vector() {
        let mut bytes = encode_store(&[("dog", vec![1.0, 2.0])]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            VectorStore::parse("mem", &bytes),
            Err(StoreError::CorruptFormat(_))
        ));
    }

    #[test]
    fn test_missing_records() {
        let mut bytes = encode_store(&[("dog", vec![1.0])]);
        bytes[0] = b'2';
        assert!(matches!(
            VectorStore::parse("mem", &bytes),
            Err(StoreError::CorruptFormat(_))
        ));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = VectorStore::parse("a", &encode_store(&[("dog", vec![1.0])])).unwrap();
        let b = VectorStore::parse("b", &encode_store(&[("dog", vec![1.0])])).unwrap();
        let c = VectorStore::parse("c", &encode_store(&[("dog", vec![2.0])])).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_most_similar() {
        let bytes = encode_store(&[
            ("king", vec![1.0, 0.0]),
            ("queen", vec![0.9, 0.1]),
            ("apple", vec![0.0, 1.0]),
            ("pear", vec![0.1, 0.9]),
        ]);
        let store = VectorStore::parse("mem", &bytes).unwrap();
        let similar = store.most_similar(&["king".to_string()], &[], 2);
        assert_eq!(similar.len(), 2);
        assert!(similar.get("king").is_none());
        assert!(similar.get("queen").unwrap() > similar.get("pear").unwrap());

        let nothing = store.most_similar(&["unknown".to_string()], &[], 10);
        assert!(nothing.is_empty());
    }
}
