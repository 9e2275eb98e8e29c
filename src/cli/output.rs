//! Output formatting for CLI commands.
//!
//! This module handles formatting output as either JSON or human-readable text.

use anyhow::Result;
use serde_json::json;
use std::path::Path;
use termap::{
    CacheReport, ClearOutcome, ClearScope, MappingMetadata, MappingTable, Metrics, RejectedRow,
};

/// Print a mapping table as CSV, or as JSON rows.
pub fn print_mapping_table(
    table: &MappingTable,
    metadata: Option<&MappingMetadata>,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", table.to_json()?);
    } else {
        print!("{}", table.to_csv(metadata));
    }
    Ok(())
}

/// Print a summary after writing mappings to a file.
pub fn print_write_summary(table: &MappingTable, path: &str, json: bool) -> Result<()> {
    let unmapped = table.rows().iter().filter(|r| r.is_unmapped()).count();
    if json {
        let summary = json!({
            "output": path,
            "rows": table.len(),
            "unmapped": unmapped,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Wrote {} rows to {}", table.len(), path);
        if unmapped > 0 {
            println!("Unmapped phrases: {}", unmapped);
        }
    }
    Ok(())
}

/// Print the result of caching one ontology.
pub fn print_cached(acronym: &str, terms: usize, base_dir: &Path, json: bool) -> Result<()> {
    if json {
        let result = json!({
            "acronym": acronym,
            "terms": terms,
            "cache_dir": base_dir.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Cached {} ({} terms)", acronym, terms);
        println!("Cache folder: {}", base_dir.display());
    }
    Ok(())
}

/// Print the outcome of a bulk caching run.
pub fn print_cache_report(report: &CacheReport, rejected: &[RejectedRow], json: bool) -> Result<()> {
    if json {
        let result = json!({
            "cached": report.cached.iter().map(|c| c.acronym()).collect::<Vec<_>>(),
            "failed": report
                .failed
                .iter()
                .map(|(acronym, error)| json!({ "acronym": acronym, "error": error }))
                .collect::<Vec<_>>(),
            "rejected_rows": rejected
                .iter()
                .map(|r| json!({ "line": r.line, "content": r.content, "reason": r.reason }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Cached {} ontologies", report.cached.len());
    for cached in &report.cached {
        println!("  {}", cached.acronym());
    }
    if !report.failed.is_empty() {
        println!("\nFailed ({}):", report.failed.len());
        for (acronym, error) in &report.failed {
            println!("  {}: {}", acronym, error);
        }
    }
    if !rejected.is_empty() {
        println!("\nSkipped registry rows ({}):", rejected.len());
        for row in rejected {
            println!("  line {}: {} ({})", row.line, row.content, row.reason);
        }
    }
    Ok(())
}

/// Print the outcome of a clear request.
pub fn print_clear_outcome(scope: &ClearScope, outcome: ClearOutcome, json: bool) -> Result<()> {
    let target = match scope {
        ClearScope::Ontology(acronym) => acronym.as_str(),
        ClearScope::All => "all",
    };
    let cleared = outcome == ClearOutcome::Cleared;
    if json {
        let result = json!({ "target": target, "cleared": cleared });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if cleared {
        println!("Cleared cache: {}", target);
    } else {
        println!("Cache for {} does not exist", target);
    }
    Ok(())
}

/// Print whether an ontology is cached.
pub fn print_exists(acronym: &str, exists: bool, json: bool) -> Result<()> {
    if json {
        let result = json!({ "acronym": acronym, "exists": exists });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", exists);
    }
    Ok(())
}

/// Print cached ontology acronyms.
pub fn print_cached_list(acronyms: &[String], base_dir: &Path, json: bool) -> Result<()> {
    if json {
        let result = json!({
            "cache_dir": base_dir.display().to_string(),
            "ontologies": acronyms,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if acronyms.is_empty() {
        println!("No cached ontologies in {}", base_dir.display());
    } else {
        println!("Cached ontologies in {}:", base_dir.display());
        for acronym in acronyms {
            println!("  {}", acronym);
        }
    }
    Ok(())
}

/// Print a metrics export to stderr.
pub fn print_metrics(metrics: &Metrics, json: bool) -> Result<()> {
    if json {
        eprintln!("{}", serde_json::to_string_pretty(&metrics.export_json())?);
    } else {
        eprint!("{}", metrics.export_prometheus());
    }
    Ok(())
}
