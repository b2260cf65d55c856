#![allow(dead_code)]

use std::path::{Path, PathBuf};

use wordspace::{ClassDefinition, Classes, ClassifierError};

/// Small space where devices, animals and vehicles form separate clusters.
pub const TOY_VECTORS: &[(&str, [f32; 3])] = &[
    ("computer", [1.0, 0.0, 0.0]),
    ("laptop", [0.9, 0.1, 0.0]),
    ("cat", [0.6, 0.5, 0.0]),
    ("dog", [0.0, 1.0, 0.0]),
    ("puppy", [0.1, 0.9, 0.1]),
    ("red", [0.0, 0.0, 1.0]),
    ("car", [0.3, 0.0, 0.8]),
    ("fast", [0.2, 0.2, 0.6]),
];

/// Encodes `(word, vector)` pairs in the binary vector file format.
pub fn encode_vectors(entries: &[(&str, [f32; 3])]) -> Vec<u8> {
    let mut bytes = format!("{} 3\n", entries.len()).into_bytes();
    for (word, vector) in entries {
        bytes.extend_from_slice(word.as_bytes());
        bytes.push(b' ');
        for value in vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes
}

pub fn write_vectors(dir: &Path, name: &str, entries: &[(&str, [f32; 3])]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encode_vectors(entries)).expect("Failed to write vector file");
    path
}

pub fn write_toy_vectors(dir: &Path) -> PathBuf {
    write_vectors(dir, "toy.bin", TOY_VECTORS)
}

pub fn computers_and_dogs() -> Result<Classes, ClassifierError> {
    Classes::new()
        .add_class(ClassDefinition::new("computer").with_examples(vec!["I have a computer", "I have a laptop"]))?
        .add_class(ClassDefinition::new("dog").with_examples(vec!["I have a dog", "Have you a dog?"]))
}

pub fn three_topics() -> Result<Classes, ClassifierError> {
    Classes::new()
        .add_class(ClassDefinition::new("computer").with_examples(vec!["I have a computer", "a fast laptop"]))?
        .add_class(ClassDefinition::new("dog").with_examples(vec!["I have a dog", "my puppy"]))?
        .add_class(ClassDefinition::new("vehicle").with_examples(vec!["a red car", "fast car"]))
}
