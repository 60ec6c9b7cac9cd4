//! Glossary CLI
//!
//! Command-line front end for the term catalog:
//! - Importing record files (JSON / TOML, files or directories)
//! - Running relationship resolution
//! - Browsing: lookup, category listings, featured terms, search, A-Z index
//! - Administration: diagnostics, removal, compaction

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use glossary_catalog::{
    ImportPipeline, QueryService, ResolutionSummary, Resolver, RunSummary, TermStore,
};
use glossary_ingest::LoadedRecords;
use glossary_model::{normalize_identifier, Category, Term};

mod config;

use config::GlossaryConfig;

#[derive(Parser)]
#[command(name = "glossary")]
#[command(author, version, about = "Glossary term catalog")]
struct Cli {
    /// Config file (default: ./glossary.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(long, global = true, env = "GLOSSARY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import record files or directories of them
    Import {
        /// `.json` / `.toml` files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Skip the resolution pass after importing
        #[arg(long)]
        no_resolve: bool,
    },

    /// Resolve related-term names into links
    Resolve,

    /// Show one term (identifier or display name)
    Show { id: String },

    /// List the terms of one category (label or slug)
    List {
        #[arg(short, long)]
        category: Category,
    },

    /// Featured terms, most important first
    Featured {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Search names, definitions and tags
    Search { query: String },

    /// A-Z index of all terms
    Index,

    /// Last import and resolution summaries
    Diagnostics,

    /// Remove a term
    Remove { id: String },

    /// Write a snapshot and truncate the write-ahead log
    Compact,

    /// List categories with term counts
    Categories,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = GlossaryConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    init_tracing(&config.log_level);
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        auto_resolve = config.auto_resolve,
        "configuration loaded"
    );

    let store = Arc::new(
        TermStore::open(&config.data_dir, config.retry.clone()).with_context(|| {
            format!("failed to open term store at {}", config.data_dir.display())
        })?,
    );
    let json = cli.json;

    match cli.command {
        Commands::Import { paths, no_resolve } => {
            let resolve = config.auto_resolve && !no_resolve;
            return cmd_import(store, &paths, resolve, json);
        }
        Commands::Resolve => {
            let summary = Resolver::new(store).resolve();
            if json {
                print_json(&summary)?;
            } else {
                print_resolution(&summary);
            }
        }
        Commands::Show { id } => {
            let term = QueryService::new(store)
                .get_by_identifier(&id)
                .map_err(|e| anyhow!(e))?;
            if json {
                print_json(term.as_ref())?;
            } else {
                print_term(&term);
            }
        }
        Commands::List { category } => {
            let terms = QueryService::new(store).list_by_category(category);
            print_terms(&format!("{category}"), &terms, json)?;
        }
        Commands::Featured { limit } => {
            let terms = QueryService::new(store).list_featured(limit);
            print_terms("Featured", &terms, json)?;
        }
        Commands::Search { query } => {
            let hits = QueryService::new(store).search(&query);
            if json {
                let out: Vec<_> = hits
                    .iter()
                    .map(|h| json!({ "rank": h.rank, "term": h.term.as_ref() }))
                    .collect();
                print_json(&out)?;
            } else if hits.is_empty() {
                eprintln!("{} no terms match `{}`", "info:".yellow().bold(), query);
            } else {
                for hit in &hits {
                    println!(
                        "{:<14} {} ({})",
                        format!("{:?}", hit.rank).dimmed(),
                        hit.term.display_name.bold(),
                        hit.term.identifier
                    );
                }
            }
        }
        Commands::Index => {
            let index = QueryService::new(store).group_alphabetically();
            if json {
                let out: Vec<_> = index
                    .iter()
                    .map(|g| {
                        json!({
                            "letter": g.letter.to_string(),
                            "terms": g.terms().map(|t| t.identifier.as_str()).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                print_json(&out)?;
            } else {
                for group in &index {
                    println!("{}", group.letter.to_string().green().bold());
                    for term in group.terms() {
                        println!("  {} ({})", term.display_name, term.identifier);
                    }
                }
            }
        }
        Commands::Diagnostics => {
            let diagnostics = QueryService::new(store).diagnostics();
            if json {
                print_json(&diagnostics)?;
            } else {
                match &diagnostics.last_import {
                    Some(summary) => print_import(summary, None),
                    None => println!("no import has run yet"),
                }
                match &diagnostics.last_resolution {
                    Some(summary) => print_resolution(summary),
                    None => println!("no resolution pass has run yet"),
                }
            }
        }
        Commands::Remove { id } => {
            let identifier = normalize_identifier(&id);
            if !store.remove(&identifier)? {
                return Err(anyhow!("term not found: {id}"));
            }
            eprintln!("{} removed {}", "ok".green().bold(), identifier.bold());
        }
        Commands::Compact => {
            let terms = store.compact()?;
            eprintln!(
                "{} compacted {} terms into {}",
                "ok".green().bold(),
                terms,
                config.data_dir.display()
            );
        }
        Commands::Categories => {
            let counts = QueryService::new(store).category_counts();
            if json {
                let out: Vec<_> = counts
                    .iter()
                    .map(|(c, n)| json!({ "label": c.label(), "slug": c.slug(), "terms": n }))
                    .collect();
                print_json(&out)?;
            } else {
                for (category, count) in counts {
                    println!("{:>4}  {} ({})", count, category.label().bold(), category.slug());
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_import(
    store: Arc<TermStore>,
    paths: &[PathBuf],
    resolve: bool,
    json: bool,
) -> Result<ExitCode> {
    let loaded = glossary_ingest::load_paths(paths)?;
    if !json {
        eprintln!(
            "{} {} records from {} file(s)",
            "Importing".green().bold(),
            loaded.records.len(),
            loaded.files.len()
        );
    }

    let summary = ImportPipeline::new(store.clone()).import_batch(&loaded.records);
    let resolution = resolve.then(|| Resolver::new(store).resolve());

    if json {
        print_json(&json!({
            "import": summary,
            "rejections": loaded.rejections,
            "resolution": resolution,
        }))?;
    } else {
        for rejection in &loaded.rejections {
            println!(
                "  {} {}#{}: {}",
                "rejected".red(),
                rejection.source.file.display(),
                rejection.source.position,
                rejection.reason
            );
        }
        print_import(&summary, Some(&loaded));
        if let Some(resolution) = &resolution {
            print_resolution(resolution);
        }
    }

    if summary.is_clean() && loaded.rejections.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_terms(title: &str, terms: &[Arc<Term>], json: bool) -> Result<()> {
    if json {
        let out: Vec<&Term> = terms.iter().map(|t| t.as_ref()).collect();
        return print_json(&out);
    }
    println!("{} ({})", title.bold(), terms.len());
    for term in terms {
        let marker = if term.featured { "*" } else { " " };
        println!("  {} {} ({})", marker.yellow(), term.display_name, term.identifier);
    }
    Ok(())
}

fn print_term(term: &Term) {
    println!("{} ({})", term.display_name.bold(), term.identifier);
    println!(
        "  {} {}  {} {}{}",
        "category:".dimmed(),
        term.category,
        "priority:".dimmed(),
        term.priority,
        if term.featured { "  [featured]" } else { "" }
    );
    println!();
    println!("{}", term.definition);
    println!();
    println!("{}\n  {}", "Why it matters".bold(), term.why_it_matters);
    println!("{}\n  {}", "Local context".bold(), term.local_context);
    if let Some(data) = &term.supporting_data {
        println!("{}\n  {}", "Supporting data".bold(), data);
    }
    if let Some(policy) = &term.policy_alignment {
        println!("{}\n  {}", "Policy alignment".bold(), policy);
    }
    if !term.tags.is_empty() {
        let tags: Vec<&str> = term.tags.iter().map(String::as_str).collect();
        println!("{} {}", "tags:".dimmed(), tags.join(", "));
    }
    if !term.related_term_ids.is_empty() {
        let related: Vec<&str> = term.related_term_ids.iter().map(|id| id.as_str()).collect();
        println!("{} {}", "related:".dimmed(), related.join(", "));
    }
}

fn print_import(summary: &RunSummary, loaded: Option<&LoadedRecords>) {
    println!(
        "{} import {}: {} created, {} updated, {} unchanged, {} failed",
        if summary.is_clean() { "ok".green().bold() } else { "warn".yellow().bold() },
        summary.run_id,
        summary.created.len(),
        summary.updated.len(),
        summary.unchanged.len(),
        summary.failed.len()
    );
    for failure in &summary.failed {
        let origin = loaded
            .and_then(|l| l.source_of(failure.position))
            .map(|s| format!("{}#{}", s.file.display(), s.position))
            .unwrap_or_else(|| format!("record {}", failure.position));
        println!(
            "  {} {} `{}` ({:?}): {}",
            "failed".red(),
            origin,
            failure.record.label(),
            failure.kind,
            failure.reason
        );
    }
    for warning in &summary.warnings {
        println!("  {} {:?}", "warning".yellow(), warning);
    }
}

fn print_resolution(summary: &ResolutionSummary) {
    println!(
        "{} resolution {}: {} terms, {} links, {} relinked, {} dangling",
        if summary.failed.is_empty() { "ok".green().bold() } else { "warn".yellow().bold() },
        summary.run_id,
        summary.terms_scanned,
        summary.links_resolved,
        summary.relinked.len(),
        summary.dangling.len()
    );
    for dangling in &summary.dangling {
        println!(
            "  {} {} -> `{}`",
            "dangling".yellow(),
            dangling.term,
            dangling.name
        );
    }
    for id in &summary.self_references {
        println!("  {} {} lists itself as related", "skipped".yellow(), id);
    }
    for failure in &summary.failed {
        println!("  {} {}: {}", "failed".red(), failure.identifier, failure.reason);
    }
}
