//! Term cache lifecycle tests.

use tempfile::TempDir;

use termap::error::CacheError;
use termap::{
    ClearOutcome, ClearScope, IndexSource, MapperKind, MappingOptions, OntologyReference,
    Registry, SourceTerm, TargetSpec, TermapError,
};

use crate::fixtures::{toy_engine, toy_loader, TOY};

#[tokio::test]
async fn test_cache_then_clear() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());
    let cache = engine.cache();

    let cached = cache
        .cache_ontology(engine.collector(), &OntologyReference::parse(TOY), TOY)
        .await
        .unwrap();
    assert!(cached.exists());
    assert!(cache.exists(TOY));
    assert!(dir.path().join(TOY).join("index.json").is_file());

    let index = cached.load().await.unwrap();
    assert_eq!(index.len(), 6);

    assert_eq!(cached.clear().await.unwrap(), ClearOutcome::Cleared);
    assert!(!cache.exists(TOY));
    assert!(matches!(
        cache.load(TOY).await,
        Err(TermapError::Cache(CacheError::Miss(_)))
    ));

    assert_eq!(cached.clear().await.unwrap(), ClearOutcome::NotFound);
}

#[tokio::test]
async fn test_mapping_from_cache_skips_collection() {
    let dir = TempDir::new().unwrap();
    let loader = toy_loader();
    let engine = crate::fixtures::engine_with(crate::fixtures::test_config(dir.path()), loader.clone());

    let cached = engine
        .cache()
        .cache_ontology(engine.collector(), &OntologyReference::parse(TOY), TOY)
        .await
        .unwrap();
    assert_eq!(loader.load_count(TOY), 1);

    let table = cached
        .map_terms(
            &engine,
            vec![SourceTerm::new("asthma")],
            MapperKind::Tfidf,
            MappingOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(table.rows()[0].mapping_score, Some(1.0));

    let options = MappingOptions::default().with_index_source(IndexSource::Cache);
    engine
        .map_terms(
            vec![SourceTerm::new("eczema")],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &options,
        )
        .await
        .unwrap();
    assert_eq!(loader.load_count(TOY), 1);
}

#[tokio::test]
async fn test_cache_survives_new_handle() {
    let dir = TempDir::new().unwrap();
    {
        let engine = toy_engine(dir.path());
        engine
            .cache()
            .cache_ontology(engine.collector(), &OntologyReference::parse(TOY), TOY)
            .await
            .unwrap();
    }

    let engine = toy_engine(dir.path());
    let index = engine.cache().load(TOY).await.unwrap();
    assert_eq!(index.ontology(), TOY);
    assert!(index.contains("http://purl.obolibrary.org/obo/TOY_0002"));
    assert!(index
        .get("http://purl.obolibrary.org/obo/TOY_0002")
        .unwrap()
        .is_deprecated());
}

#[tokio::test]
async fn test_corrupt_entry_falls_back_to_collection() {
    let dir = TempDir::new().unwrap();
    let loader = toy_loader();
    let engine = crate::fixtures::engine_with(crate::fixtures::test_config(dir.path()), loader.clone());

    std::fs::create_dir_all(dir.path().join(TOY)).unwrap();
    std::fs::write(dir.path().join(TOY).join("index.json"), b"{ not json").unwrap();

    let strict = MappingOptions::default().with_index_source(IndexSource::Cache);
    let result = engine
        .map_terms(
            vec![SourceTerm::new("asthma")],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &strict,
        )
        .await;
    assert!(matches!(
        result,
        Err(TermapError::Cache(CacheError::Corrupt { .. }))
    ));

    let lenient = MappingOptions::default().with_index_source(IndexSource::CacheOrCollect);
    let table = engine
        .map_terms(
            vec![SourceTerm::new("asthma")],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &lenient,
        )
        .await
        .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(loader.load_count(TOY), 1);
}

#[tokio::test]
async fn test_cache_all_from_registry() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());

    let registry = Registry::parse("acronym,url\nTOY,TOY\nMISSING,MISSING\nbroken row\n");
    assert_eq!(registry.entries().len(), 2);
    assert_eq!(registry.rejected().len(), 1);

    let report = engine.cache().cache_all(engine.collector(), &registry).await;
    assert_eq!(report.cached.len(), 1);
    assert_eq!(report.cached[0].acronym(), TOY);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "MISSING");

    assert_eq!(engine.cache().list().await.unwrap(), vec![TOY.to_string()]);

    assert_eq!(
        engine.cache().clear(ClearScope::All).await.unwrap(),
        ClearOutcome::Cleared
    );
    assert!(engine.cache().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_relocated_cache() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(&dir.path().join("first"));

    let second = dir.path().join("second");
    engine.cache().set_base_dir(&second).await.unwrap();
    engine
        .cache()
        .cache_ontology(engine.collector(), &OntologyReference::parse(TOY), TOY)
        .await
        .unwrap();

    assert!(second.join(TOY).is_dir());
    assert!(!dir.path().join("first").join(TOY).exists());
}
