//! Collecting from ontology files on disk.

use tempfile::TempDir;

use termap::{
    Config, MapperKind, MappingEngine, MappingOptions, OntologyReference, SourceTerm, TargetSpec,
    TermType,
};

fn file_engine(dir: &TempDir) -> MappingEngine {
    let mut config = Config::default();
    config.cache = termap::config::CacheConfig::at(dir.path().join("cache"));
    MappingEngine::from_config(config).unwrap()
}

#[tokio::test]
async fn test_map_against_obo_graph_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mini.json");
    std::fs::write(&path, crate::fixtures::OBO_GRAPH_JSON).unwrap();
    let engine = file_engine(&dir);

    let table = engine
        .map_terms(
            vec![SourceTerm::new("flu").with_id("p1")],
            &TargetSpec::new([path.to_string_lossy()]),
            MapperKind::Tfidf,
            &MappingOptions::default().with_max_mappings(1),
        )
        .await
        .unwrap();

    let row = &table.rows()[0];
    assert_eq!(row.mapped_term_label.as_deref(), Some("influenza"));
    assert_eq!(row.mapped_term_curie.as_deref(), Some("MINI:0001"));
    assert_eq!(row.mapping_score, Some(1.0));
}

#[tokio::test]
async fn test_collect_ntriples_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mini.nt");
    std::fs::write(&path, crate::fixtures::NTRIPLES).unwrap();
    let engine = file_engine(&dir);
    let reference = OntologyReference::parse(&path.to_string_lossy());

    let classes = engine
        .collector()
        .collect(&reference, TermType::Class, &[])
        .await
        .unwrap();
    assert_eq!(classes.len(), 2);
    let fever = classes.get("http://example.org/onto#Fever").unwrap();
    assert_eq!(fever.label(), "fever");
    assert!(fever.synonyms().contains("pyrexia"));

    let everything = engine
        .collector()
        .collect(&reference, TermType::Any, &[])
        .await
        .unwrap();
    assert_eq!(everything.len(), 3);
}

#[tokio::test]
async fn test_map_against_owl_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("derm.owl");
    std::fs::write(&path, crate::fixtures::OWL_XML).unwrap();
    let engine = file_engine(&dir);

    let table = engine
        .map_terms(
            vec![SourceTerm::new("Eczema").with_id("p1")],
            &TargetSpec::new([path.to_string_lossy()]),
            MapperKind::Tfidf,
            &MappingOptions::default().with_max_mappings(1),
        )
        .await
        .unwrap();

    let row = &table.rows()[0];
    assert_eq!(row.mapped_term_label.as_deref(), Some("atopic dermatitis"));
    assert_eq!(row.mapped_term_curie.as_deref(), Some("DERM:0001"));
    assert_eq!(row.mapping_score, Some(1.0));

    let index = engine
        .collector()
        .collect(
            &OntologyReference::parse(&path.to_string_lossy()),
            TermType::Class,
            &[],
        )
        .await
        .unwrap();
    assert_eq!(index.len(), 3);
    assert!(index
        .get("http://purl.obolibrary.org/obo/DERM_0003")
        .unwrap()
        .is_deprecated());
}

#[tokio::test]
async fn test_cache_file_ontology_under_acronym() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mini.json");
    std::fs::write(&path, crate::fixtures::OBO_GRAPH_JSON).unwrap();
    let engine = file_engine(&dir);

    let cached = engine
        .cache()
        .cache_ontology(
            engine.collector(),
            &OntologyReference::parse(&path.to_string_lossy()),
            "MINI",
        )
        .await
        .unwrap();

    let index = cached.load().await.unwrap();
    assert_eq!(index.ontology(), "MINI");
    assert_eq!(index.len(), 3);
    assert!(index
        .get("http://purl.obolibrary.org/obo/MINI_0003")
        .unwrap()
        .is_deprecated());

    let table = cached
        .map_terms(
            &engine,
            vec![SourceTerm::new("common cold")],
            MapperKind::Tfidf,
            MappingOptions::default().with_excl_deprecated(true).with_min_score(0.9),
        )
        .await
        .unwrap();
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_missing_file_is_source_error() {
    let dir = TempDir::new().unwrap();
    let engine = file_engine(&dir);
    let missing = dir.path().join("absent.json");

    let result = engine
        .map_terms(
            vec![SourceTerm::new("flu")],
            &TargetSpec::new([missing.to_string_lossy()]),
            MapperKind::Tfidf,
            &MappingOptions::default(),
        )
        .await;
    assert!(matches!(result, Err(termap::TermapError::Source(_))));
}
