//! termap command-line entry point

use clap::{Parser, Subcommand};
use termap::{Config, MapperKind, TermType};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

/// termap: map free-text phrases onto ontology terms
#[derive(Parser, Debug)]
#[command(name = "termap")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Override the term cache directory
    #[arg(long, global = true)]
    cache_dir: Option<String>,

    /// Print the metrics collected by this run to stderr when it finishes
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Map phrases to terms of one or more target ontologies
    Map {
        /// Phrases to map
        phrases: Vec<String>,
        /// File with one phrase per line (optional tab-separated tags and id)
        #[arg(short = 'f', long)]
        source_terms: Option<String>,
        /// Target ontologies: acronyms, file paths or URLs, comma-separated
        #[arg(short, long)]
        target: String,
        /// Mapper: tfidf, jaro_winkler, levenshtein, zooma, bioportal
        #[arg(short, long)]
        mapper: Option<MapperKind>,
        /// Minimum score a mapping must reach (0.0 to 1.0)
        #[arg(long)]
        min_score: Option<f64>,
        /// Maximum mappings per phrase
        #[arg(long)]
        max_mappings: Option<usize>,
        /// Exclude deprecated terms
        #[arg(long)]
        excl_deprecated: bool,
        /// Emit a placeholder row for phrases without a mapping
        #[arg(long)]
        incl_unmapped: bool,
        /// Term type: class, property or any
        #[arg(long)]
        term_type: Option<TermType>,
        /// Only map to terms whose IRI starts with one of these prefixes
        #[arg(long, value_delimiter = ',')]
        base_iris: Vec<String>,
        /// Read term indexes from the cache, collecting on a miss
        #[arg(long)]
        use_cache: bool,
        /// Write results as CSV to this file
        #[arg(short, long)]
        output: Option<String>,
        /// Omit the metadata header from CSV output
        #[arg(long)]
        no_metadata: bool,
    },
    /// Collect an ontology and cache its terms
    Cache {
        /// Ontology acronym, file path or URL
        source: String,
        /// Acronym to cache under (defaults to the source when it is an acronym)
        #[arg(short, long)]
        acronym: Option<String>,
    },
    /// Cache every ontology listed in a registry CSV (acronym,source)
    CacheAll {
        /// Path to the registry file
        registry: String,
    },
    /// Remove cached ontologies
    Clear {
        /// Acronym to remove
        acronym: Option<String>,
        /// Remove every cached ontology
        #[arg(long, conflicts_with = "acronym")]
        all: bool,
    },
    /// Check whether an ontology is cached
    Exists {
        /// Ontology acronym
        acronym: String,
    },
    /// List cached ontologies
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Mapping and caching report progress; one-shot lookups stay quiet
    let verbose = matches!(
        args.command,
        Command::Map { .. } | Command::Cache { .. } | Command::CacheAll { .. }
    );
    init_tracing(if verbose { "info" } else { "warn" }, args.json_logs);

    let mut config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };
    if let Some(dir) = &args.cache_dir {
        config.cache.base_dir = dir.clone();
    }

    let result = match args.command {
        Command::Map {
            phrases,
            source_terms,
            target,
            mapper,
            min_score,
            max_mappings,
            excl_deprecated,
            incl_unmapped,
            term_type,
            base_iris,
            use_cache,
            output,
            no_metadata,
        } => {
            let request = cli::MapRequest {
                phrases,
                source_terms,
                target,
                mapper,
                min_score,
                max_mappings,
                excl_deprecated,
                incl_unmapped,
                term_type,
                base_iris,
                use_cache,
                output,
                metadata: !no_metadata,
            };
            cli::run_map(config, request, args.json).await
        }
        Command::Cache { source, acronym } => {
            cli::run_cache(config, source, acronym, args.json).await
        }
        Command::CacheAll { registry } => cli::run_cache_all(config, registry, args.json).await,
        Command::Clear { acronym, all } => cli::run_clear(config, acronym, all, args.json).await,
        Command::Exists { acronym } => cli::run_exists(config, acronym, args.json).await,
        Command::List => cli::run_list(config, args.json).await,
    };

    // Counters live in this process, so report them even when the command failed
    if args.metrics {
        cli::report_metrics(args.json)?;
    }
    result
}

fn init_tracing(default_level: &str, json_logs: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
