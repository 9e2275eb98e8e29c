//! Mapping engine tests over an in-memory ontology.

use std::sync::Arc;

use tempfile::TempDir;

use termap::ontology::{EntityKind, RawEntity, StaticOntologyLoader};
use termap::{
    get_metrics, MapperKind, MappingMetadata, MappingOptions, SourceTerm, TargetSpec, TermType, TermapError,
};

use crate::fixtures::{toy_engine, toy_loader, engine_with, test_config, TOY};

#[tokio::test]
async fn test_exact_match_excludes_deprecated() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());
    let options = MappingOptions::default()
        .with_min_score(0.1)
        .with_max_mappings(5)
        .with_excl_deprecated(true);

    let table = engine
        .map_terms(
            vec![
                SourceTerm::new("asthma").with_id("p1"),
                SourceTerm::new("heart disease").with_id("p2"),
            ],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &options,
        )
        .await
        .unwrap();

    let asthma: Vec<_> = table.rows_for("p1").collect();
    assert_eq!(asthma[0].mapped_term_label.as_deref(), Some("asthma"));
    assert_eq!(asthma[0].mapped_term_curie.as_deref(), Some("TOY:0001"));
    assert_eq!(asthma[0].mapping_score, Some(1.0));
    assert_eq!(asthma[0].ontology.as_deref(), Some(TOY));

    let heart: Vec<_> = table.rows_for("p2").collect();
    assert!(!heart.is_empty());
    assert!(heart
        .iter()
        .all(|r| r.mapped_term_label.as_deref() != Some("heart disease")));
}

#[tokio::test]
async fn test_deprecated_terms_kept_by_default() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());

    let table = engine
        .map_terms(
            vec![SourceTerm::new("heart disease")],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &MappingOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(table.rows()[0].mapped_term_label.as_deref(), Some("heart disease"));
    assert_eq!(table.rows()[0].mapping_score, Some(1.0));
}

#[tokio::test]
async fn test_high_threshold_yields_unmapped_row() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());
    let options = MappingOptions::default()
        .with_min_score(0.99)
        .with_incl_unmapped(true);

    let table = engine
        .map_terms(
            vec![SourceTerm::new("cardiac issue").with_tags(["cardio"])],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &options,
        )
        .await
        .unwrap();

    assert_eq!(table.len(), 1);
    let row = &table.rows()[0];
    assert!(row.is_unmapped());
    assert_eq!(row.mapping_score, None);
    assert_eq!(row.tags, vec!["cardio", "unmapped"]);

    let without = engine
        .map_terms(
            vec![SourceTerm::new("cardiac issue")],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &options.clone().with_incl_unmapped(false),
        )
        .await
        .unwrap();
    assert!(without.is_empty());
}

#[tokio::test]
async fn test_rows_respect_cap_and_order() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());
    let options = MappingOptions::default()
        .with_min_score(0.0)
        .with_max_mappings(2);

    let table = engine
        .map_terms(
            vec![
                SourceTerm::new("skin disease").with_id("a"),
                SourceTerm::new("asthma").with_id("b"),
            ],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &options,
        )
        .await
        .unwrap();

    let ids: Vec<_> = table.rows().iter().map(|r| r.source_term_id.as_str()).collect();
    let first_b = ids.iter().position(|id| *id == "b").unwrap();
    assert!(ids[..first_b].iter().all(|id| *id == "a"));
    assert!(table.rows_for("a").count() <= 2);
    assert!(table.rows_for("b").count() <= 2);

    let scores: Vec<f64> = table.rows_for("a").filter_map(|r| r.mapping_score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_syntactic_mappers() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());

    for kind in [MapperKind::JaroWinkler, MapperKind::Levenshtein] {
        let table = engine
            .map_terms(
                vec![SourceTerm::new("Eczema")],
                &TargetSpec::parse(TOY),
                kind,
                &MappingOptions::default().with_max_mappings(1),
            )
            .await
            .unwrap();
        assert_eq!(table.rows()[0].mapped_term_label.as_deref(), Some("eczema"));
        assert_eq!(table.rows()[0].mapping_score, Some(1.0));
    }
}

#[tokio::test]
async fn test_term_type_filter() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());

    let classes = engine
        .map_terms(
            vec![SourceTerm::new("has symptom")],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &MappingOptions::default().with_min_score(0.9),
        )
        .await
        .unwrap();
    assert!(classes.is_empty());

    let properties = engine
        .map_terms(
            vec![SourceTerm::new("has symptom")],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &MappingOptions::default()
                .with_min_score(0.9)
                .with_term_type(TermType::Property),
        )
        .await
        .unwrap();
    assert_eq!(properties.rows()[0].mapped_term_label.as_deref(), Some("has symptom"));
}

#[tokio::test]
async fn test_base_iri_filter() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());
    let options = MappingOptions::default()
        .with_min_score(0.0)
        .with_base_iris(["http://example.org/"]);

    let table = engine
        .map_terms(
            vec![SourceTerm::new("asthma")],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &options,
        )
        .await
        .unwrap();
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_unknown_target_is_fatal() {
    let dir = TempDir::new().unwrap();
    let engine = engine_with(test_config(dir.path()), toy_loader());

    let result = engine
        .map_terms(
            vec![SourceTerm::new("asthma")],
            &TargetSpec::parse("NOPE"),
            MapperKind::Tfidf,
            &MappingOptions::default(),
        )
        .await;
    assert!(matches!(result, Err(TermapError::Source(_))));
}

#[tokio::test]
async fn test_csv_metadata_toggle() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());
    let target = TargetSpec::parse(TOY);
    let options = MappingOptions::default();

    let table = engine
        .map_terms(
            vec![SourceTerm::new("asthma").with_id("p1")],
            &target,
            MapperKind::Tfidf,
            &options,
        )
        .await
        .unwrap();

    let meta = MappingMetadata::new(MapperKind::Tfidf, &target, &options);
    let path = dir.path().join("with.csv");
    table.write_csv(&path, Some(&meta)).await.unwrap();
    let with = std::fs::read_to_string(&path).unwrap();
    assert!(with.lines().next().unwrap().starts_with("# termap_version: "));
    assert!(with.contains("# target: TOY"));

    let path = dir.path().join("without.csv");
    table.write_csv(&path, None).await.unwrap();
    let without = std::fs::read_to_string(&path).unwrap();
    assert!(without.starts_with("Source Term,Source Term ID,"));
    assert!(without.contains("asthma,p1,asthma,TOY:0001,"));
}

#[tokio::test]
async fn test_deprecated_sibling_excluded_from_two_term_ontology() {
    let dir = TempDir::new().unwrap();
    let loader = StaticOntologyLoader::new().with_source(
        "X",
        vec![
            RawEntity::new("urn:x#1", EntityKind::Class).with_label("asthma"),
            RawEntity::new("urn:x#2", EntityKind::Class)
                .with_label("heart disease")
                .deprecated(true),
        ],
    );
    let engine = engine_with(test_config(dir.path()), Arc::new(loader));

    let table = engine
        .map_terms(
            vec![SourceTerm::new("asthma").with_id("t1")],
            &TargetSpec::parse("X"),
            MapperKind::Tfidf,
            &MappingOptions::default().with_excl_deprecated(true),
        )
        .await
        .unwrap();

    assert_eq!(table.rows_for("t1").count(), 1);
    let row = table.rows_for("t1").next().unwrap();
    assert_eq!(row.mapped_term_iri.as_deref(), Some("urn:x#1"));
    assert_eq!(row.mapped_term_label.as_deref(), Some("asthma"));
    assert_eq!(row.mapping_score, Some(1.0));
}

#[tokio::test]
async fn test_cap_applies_across_targets() {
    let dir = TempDir::new().unwrap();
    let loader = StaticOntologyLoader::new()
        .with_source(
            "X",
            vec![RawEntity::new("urn:x#asthma", EntityKind::Class).with_label("asthma")],
        )
        .with_source(
            "Y",
            vec![RawEntity::new("urn:y#asthma", EntityKind::Class).with_label("asthma")],
        );
    let engine = engine_with(test_config(dir.path()), Arc::new(loader));

    let table = engine
        .map_terms(
            vec![SourceTerm::new("asthma").with_id("t1")],
            &TargetSpec::parse("X,Y"),
            MapperKind::Tfidf,
            &MappingOptions::default().with_max_mappings(1),
        )
        .await
        .unwrap();

    // Equal scores and labels fall back to IRI order
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].mapped_term_iri.as_deref(), Some("urn:x#asthma"));
    assert_eq!(table.rows()[0].ontology.as_deref(), Some("X"));

    let both = engine
        .map_terms(
            vec![SourceTerm::new("asthma").with_id("t1")],
            &TargetSpec::parse("X,Y"),
            MapperKind::Tfidf,
            &MappingOptions::default().with_max_mappings(5),
        )
        .await
        .unwrap();
    let ontologies: Vec<_> = both.rows().iter().filter_map(|r| r.ontology.as_deref()).collect();
    assert_eq!(ontologies, vec!["X", "Y"]);
}

#[tokio::test]
async fn test_shared_iri_reported_once_across_targets() {
    let dir = TempDir::new().unwrap();
    let shared = || RawEntity::new("urn:shared#asthma", EntityKind::Class).with_label("asthma");
    let loader = StaticOntologyLoader::new()
        .with_source("X", vec![shared()])
        .with_source(
            "Y",
            vec![
                shared(),
                RawEntity::new("urn:y#asthma-attack", EntityKind::Class).with_label("asthma attack"),
            ],
        );
    let engine = engine_with(test_config(dir.path()), Arc::new(loader));

    let table = engine
        .map_terms(
            vec![SourceTerm::new("asthma").with_id("t1")],
            &TargetSpec::parse("X,Y"),
            MapperKind::Tfidf,
            &MappingOptions::default()
                .with_min_score(0.0)
                .with_max_mappings(5),
        )
        .await
        .unwrap();

    let shared_rows = table
        .rows_for("t1")
        .filter(|r| r.mapped_term_iri.as_deref() == Some("urn:shared#asthma"))
        .count();
    assert_eq!(shared_rows, 1);
    assert_eq!(table.rows()[0].mapping_score, Some(1.0));
}

#[tokio::test]
async fn test_mapping_updates_process_metrics() {
    let dir = TempDir::new().unwrap();
    let engine = toy_engine(dir.path());
    let before = get_metrics().export_json().counters;

    engine
        .map_terms(
            vec![SourceTerm::new("asthma"), SourceTerm::new("zzzz qqqq")],
            &TargetSpec::parse(TOY),
            MapperKind::Tfidf,
            &MappingOptions::default().with_min_score(0.9),
        )
        .await
        .unwrap();

    // Other tests share the registry, so counters only grow
    let after = get_metrics().export_json().counters;
    assert!(after.phrases_mapped_total >= before.phrases_mapped_total + 1);
    assert!(after.phrases_unmapped_total >= before.phrases_unmapped_total + 1);
    assert!(after.terms_collected_total > before.terms_collected_total);
    assert!(get_metrics()
        .export_prometheus()
        .contains("termap_phrases_mapped_total"));
}
