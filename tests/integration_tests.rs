mod common;

use std::sync::Arc;

use anyhow::Result;
use wordspace::{
    AnalyticScorer, Classifier, ClassifierError, ClassifierKind, Language, ModelExport,
    VectorStoreCache,
};

use common::{three_topics, write_toy_vectors, write_vectors, TOY_VECTORS};

const PHRASES: &[&str] = &["fast red car", "my laptop", "a puppy and a cat", "dog", "unicorn", ""];

fn build(path: &std::path::Path, cache: &VectorStoreCache, kind: ClassifierKind) -> Result<Classifier> {
    Ok(Classifier::builder()
        .with_store_path(path, cache)?
        .with_language(Language::English)
        .with_kind(kind)
        .build()?)
}

#[test]
fn test_export_import_classifies_identically() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_toy_vectors(dir.path());
    let cache = VectorStoreCache::new();

    for kind in [
        ClassifierKind::Matrix,
        ClassifierKind::WordSet,
        ClassifierKind::NearestExample,
        ClassifierKind::Centroid,
    ] {
        let mut original = build(&path, &cache, kind)?;
        original.train(&three_topics()?)?;

        let imported = Classifier::import(original.export()?, &cache)?;
        let from_json = Classifier::from_json(&original.to_json()?, &cache)?;
        for text in PHRASES {
            let expected = original.classify(text)?;
            assert_eq!(imported.classify(text)?, expected, "{:?} {:?}", kind, text);
            assert_eq!(from_json.classify(text)?, expected, "{:?} {:?}", kind, text);
            assert_eq!(from_json.distance_vector(text)?, original.distance_vector(text)?);
        }
        assert_eq!(from_json.info().class_labels, original.info().class_labels);
        assert_eq!(from_json.info().sentence_length, original.info().sentence_length);
        assert_eq!(from_json.export()?, original.export()?);
    }
    // Every classifier and import shares one parsed store
    assert_eq!(cache.load_count(), 1);
    Ok(())
}

#[test]
fn test_export_document_shape() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_toy_vectors(dir.path());
    let cache = VectorStoreCache::new();
    let mut classifier = build(&path, &cache, ClassifierKind::Matrix)?;
    classifier.train(&three_topics()?)?;

    let json: serde_json::Value = serde_json::from_str(&classifier.to_json()?)?;
    assert_eq!(json["format_version"], 1);
    assert_eq!(json["kind"], "matrix");
    assert_eq!(json["axis"], serde_json::json!(["computer", "dog", "vehicle"]));
    assert_eq!(json["representation"]["scheme"], "matrix");
    assert_eq!(json["sentence_length"], 2);
    assert_eq!(json["scorer"]["kind"], "analytic");
    assert_eq!(json["runtime"]["max_phrase_tokens"], 6);
    assert_eq!(json["store_fingerprint"], classifier.store().fingerprint());
    assert!(json["stop_words"].as_array().map_or(false, |w| w.iter().any(|w| w == "have")));
    Ok(())
}

#[test]
fn test_import_detects_changed_vectors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_toy_vectors(dir.path());
    let mut classifier = build(&path, &VectorStoreCache::new(), ClassifierKind::WordSet)?;
    classifier.train(&three_topics()?)?;
    let export = classifier.export()?;

    let mut changed = TOY_VECTORS.to_vec();
    changed[0].1 = [0.5, 0.5, 0.5];
    write_vectors(dir.path(), "toy.bin", &changed);

    let result = Classifier::import(export, &VectorStoreCache::new());
    assert!(matches!(result, Err(ClassifierError::StoreMismatch { .. })));
    Ok(())
}

#[test]
fn test_import_with_missing_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_toy_vectors(dir.path());
    let mut classifier = build(&path, &VectorStoreCache::new(), ClassifierKind::Matrix)?;
    classifier.train(&three_topics()?)?;
    let export = classifier.export()?;

    std::fs::remove_file(&path)?;
    let result = Classifier::import(export, &VectorStoreCache::new());
    assert!(matches!(result, Err(ClassifierError::StoreError(_))));
    Ok(())
}

#[test]
fn test_import_rejects_other_format_version() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_toy_vectors(dir.path());
    let cache = VectorStoreCache::new();
    let mut classifier = build(&path, &cache, ClassifierKind::Matrix)?;
    classifier.train(&three_topics()?)?;

    let mut json: serde_json::Value = serde_json::from_str(&classifier.to_json()?)?;
    json["format_version"] = serde_json::json!(2);
    let result = Classifier::from_json(&json.to_string(), &cache);
    assert!(matches!(result, Err(ClassifierError::SerializationError(_))));
    assert!(matches!(
        ModelExport::from_json("{ not json"),
        Err(ClassifierError::SerializationError(_))
    ));
    Ok(())
}

#[test]
fn test_import_rejects_invalid_runtime_config() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_toy_vectors(dir.path());
    let cache = VectorStoreCache::new();
    let mut classifier = build(&path, &cache, ClassifierKind::Matrix)?;
    classifier.train(&three_topics()?)?;

    for field in ["max_phrase_tokens", "similar_topn"] {
        let mut json: serde_json::Value = serde_json::from_str(&classifier.to_json()?)?;
        json["runtime"][field] = serde_json::json!(0);
        let result = Classifier::from_json(&json.to_string(), &cache);
        assert!(
            matches!(result, Err(ClassifierError::ValidationError(_))),
            "{} = 0 should be rejected",
            field
        );
    }
    // The untouched export still imports and classifies
    let imported = Classifier::from_json(&classifier.to_json()?, &cache)?;
    assert_eq!(imported.predict("red car")?.0, "vehicle");
    Ok(())
}

#[test]
fn test_import_with_custom_scorer() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_toy_vectors(dir.path());
    let cache = VectorStoreCache::new();
    let mut classifier = Classifier::builder()
        .with_store_path(&path, &cache)?
        .with_scorer(Box::new(AnalyticScorer::new(4.0, 0.05, 0.5)?))
        .build()?;
    classifier.train(&three_topics()?)?;

    // The exported parameters override the ones the scorer was built with
    let imported = Classifier::import_with_scorer(
        classifier.export()?,
        &cache,
        Box::new(AnalyticScorer::default()),
    )?;
    assert_eq!(imported.classify("red car")?, classifier.classify("red car")?);
    Ok(())
}

#[test]
fn test_classifiers_share_cached_store() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_toy_vectors(dir.path());
    let cache = VectorStoreCache::new();

    let first = build(&path, &cache, ClassifierKind::Matrix)?;
    let second = build(&dir.path().join(".").join("toy.bin"), &cache, ClassifierKind::Centroid)?;
    assert!(Arc::ptr_eq(first.store(), second.store()));
    assert_eq!(cache.load_count(), 1);
    assert_eq!(cache.len(), 1);
    Ok(())
}

#[test]
fn test_shared_classifier_across_threads() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_toy_vectors(dir.path());
    let mut classifier = build(&path, &VectorStoreCache::new(), ClassifierKind::Matrix)?;
    classifier.train(&three_topics()?)?;
    let classifier = Arc::new(classifier);
    let expected = classifier.classify("fast car")?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let classifier = Arc::clone(&classifier);
            std::thread::spawn(move || classifier.classify("fast car"))
        })
        .collect();
    for handle in handles {
        let prediction = handle.join().map_err(|_| anyhow::anyhow!("worker panicked"))??;
        assert_eq!(prediction, expected);
    }
    Ok(())
}
