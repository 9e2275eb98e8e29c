//! Remote mapper failure paths. Services point at a closed local port.

use std::time::Duration;
use tempfile::TempDir;

use termap::config::TransportConfig;
use termap::mapper::{BioPortalMapper, ZoomaMapper};
use termap::{MapperKind, MappingOptions, SourceTerm, TargetSpec};

use crate::fixtures::{engine_with, test_config, toy_loader};

const CLOSED_PORT: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn test_unreachable_zooma_yields_unmapped_rows() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.remote.zooma_url = CLOSED_PORT.to_string();
    config.remote.timeout_secs = 2;
    let engine = engine_with(config, toy_loader());

    let table = engine
        .map_terms(
            vec![SourceTerm::new("asthma"), SourceTerm::new("eczema")],
            &TargetSpec::parse("EFO"),
            MapperKind::Zooma,
            &MappingOptions::default().with_incl_unmapped(true),
        )
        .await
        .unwrap();

    assert_eq!(table.len(), 2);
    assert!(table.rows().iter().all(|r| r.is_unmapped()));
}

#[tokio::test]
async fn test_unreachable_zooma_without_unmapped_is_empty() {
    let dir = TempDir::new().unwrap();
    let engine = engine_with(test_config(dir.path()), toy_loader());
    let zooma =
        ZoomaMapper::new(CLOSED_PORT, &TransportConfig::default(), Duration::from_secs(2)).unwrap();

    let table = engine
        .map_terms_with(
            vec![SourceTerm::new("asthma")],
            &TargetSpec::parse("EFO"),
            &zooma,
            &MappingOptions::default(),
        )
        .await
        .unwrap();
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_bioportal_without_key_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let engine = engine_with(test_config(dir.path()), toy_loader());
    let bioportal = BioPortalMapper::new(
        CLOSED_PORT,
        None,
        &TransportConfig::default(),
        Duration::from_secs(2),
    )
    .unwrap();

    let table = engine
        .map_terms_with(
            vec![SourceTerm::new("asthma")],
            &TargetSpec::parse("MONDO"),
            &bioportal,
            &MappingOptions::default().with_incl_unmapped(true),
        )
        .await
        .unwrap();

    assert_eq!(table.len(), 1);
    assert!(table.rows()[0].is_unmapped());
}
