//! Geograph CLI
//!
//! - `import`: load OpenGeoDB exports into a graph store
//! - `check`: parse the exports and report what would be loaded
//! - `stats`: summarize an existing store

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use geograph_ingest_opengeodb::{
    parse_inputs, ImportConfig, ImportReport, Importer, RowDiagnostic, DEFAULT_INDEX_TIMEOUT,
};
use geograph_store::GraphStore;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geograph")]
#[command(author, version, about = "Geograph: OpenGeoDB places and postal codes as a graph")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a place export and a postal-code export into a store directory
    Import {
        /// Place export (DE.tab), header row first
        place_file: PathBuf,
        /// Postal-code export (PLZ.tab), no header
        postal_code_file: PathBuf,
        /// Store directory, created if missing
        store_dir: PathBuf,
        /// Seconds to wait for schema indexes to come online
        #[arg(long, default_value_t = DEFAULT_INDEX_TIMEOUT.as_secs())]
        index_timeout_secs: u64,
        /// Print the full report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Parse both exports without touching a store
    Check {
        place_file: PathBuf,
        postal_code_file: PathBuf,
        /// Print every skipped row
        #[arg(long)]
        details: bool,
    },

    /// Node and relationship counts of a store
    Stats { store_dir: PathBuf },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Import {
            place_file,
            postal_code_file,
            store_dir,
            index_timeout_secs,
            json,
        } => {
            let config = ImportConfig::new(place_file, postal_code_file, store_dir)
                .with_index_timeout(Duration::from_secs(index_timeout_secs));
            cmd_import(config, json)
        }
        Commands::Check {
            place_file,
            postal_code_file,
            details,
        } => cmd_check(&place_file, &postal_code_file, details),
        Commands::Stats { store_dir } => cmd_stats(&store_dir),
    }
}

fn cmd_import(config: ImportConfig, json: bool) -> Result<()> {
    let mut importer = Importer::new(config);
    let config = importer.config();
    println!(
        "{} {} + {} into {}",
        "Importing".green().bold(),
        config.place_file.display(),
        config.postal_code_file.display(),
        config.store_dir.display()
    );

    let store_dir = config.store_dir.clone();
    let report = importer
        .run()
        .with_context(|| format!("import into {} failed", store_dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    eprintln!("{} {}", "wrote".green().bold(), store_dir.display().to_string().bold());
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!(
        "  {} {} place nodes ({} rows skipped)",
        "→".cyan(),
        report.place_nodes,
        report.place_diagnostics.len()
    );
    println!(
        "  {} {} postal code nodes ({} rows skipped)",
        "→".cyan(),
        report.postal_code_nodes,
        report.postal_code_diagnostics.len()
    );
    println!(
        "  {} {} PART_OF, {} POSTAL_CODE_FOR",
        "→".cyan(),
        report.links.part_of,
        report.links.postal_code_for
    );
    if !report.links.gaps.is_empty() {
        println!(
            "  {} {} references pointed outside the loaded data",
            "→".yellow(),
            report.links.gaps.len()
        );
    }
}

fn cmd_check(place_file: &Path, postal_code_file: &Path, details: bool) -> Result<()> {
    let inputs = parse_inputs(place_file, postal_code_file)?;

    let files = [
        (
            place_file,
            inputs.places.records.len(),
            &inputs.places.diagnostics,
        ),
        (
            postal_code_file,
            inputs.postal_codes.records.len(),
            &inputs.postal_codes.diagnostics,
        ),
    ];
    for (path, records, diagnostics) in files {
        let status = if diagnostics.is_empty() {
            "ok".green().bold()
        } else {
            "warn".yellow().bold()
        };
        println!(
            "{} {} records={} skipped={}",
            status,
            path.display(),
            records,
            diagnostics.len()
        );
        if details {
            print_diagnostics(diagnostics);
        }
    }
    Ok(())
}

fn print_diagnostics(diagnostics: &[RowDiagnostic]) {
    for diagnostic in diagnostics {
        println!(
            "  {} line {}: {}",
            "→".yellow(),
            diagnostic.line,
            diagnostic.error
        );
    }
}

fn cmd_stats(store_dir: &Path) -> Result<()> {
    if !store_dir.is_dir() {
        anyhow::bail!("no store at {}", store_dir.display());
    }
    let store = GraphStore::open(store_dir)
        .with_context(|| format!("failed to open {}", store_dir.display()))?;

    println!(
        "{} {} {} nodes, {} relationships",
        "Store".green().bold(),
        store.location().unwrap_or(store_dir).display(),
        store.node_count(),
        store.relationship_count()
    );
    for (label, count) in store.count_by_label() {
        println!("  {} :{label} {count}", "→".cyan());
    }
    for (rel_type, count) in store.count_by_relationship_type() {
        println!("  {} [:{rel_type}] {count}", "→".cyan());
    }
    for index in store.indexes() {
        println!(
            "  {} index :{}({}) {:?}",
            "→".yellow(),
            index.label,
            index.property,
            index.state
        );
    }
    store.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn import_requires_three_paths() {
        assert!(Cli::try_parse_from(["geograph", "import", "DE.tab", "PLZ.tab"]).is_err());
        let cli = Cli::try_parse_from(["geograph", "-v", "import", "DE.tab", "PLZ.tab", "db"])
            .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Import {
                index_timeout_secs, ..
            } => assert_eq!(index_timeout_secs, 5),
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn stats_on_missing_dir_fails_without_creating_it() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(cmd_stats(&missing).is_err());
        assert!(!missing.exists());
    }
}
