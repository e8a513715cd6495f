use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use target_merge::{
    HeaderLookup, TargetMerger,
    config::load_config,
    ingest::{BatchOptions, ingest_dir, run_batch},
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(version, about = "Merge heterogeneous target lists into one canonical table")]
struct Cli {
    /// Path to the config file (target_merge.toml); built-in defaults when omitted
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Merge every file in the inbox directory, save, and move merged files to processed
    Ingest {
        /// Directory to scan instead of the configured inbox
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Merge in memory and report, without saving or moving files
        #[arg(long)]
        dry_run: bool,
        /// Stop after this many files
        #[arg(long)]
        max_files: Option<usize>,
    },

    /// Merge the given files in order and save; files are left in place
    Merge {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
        /// Merge in memory and report, without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the header lookup, or resolve the given labels
    Lookup {
        #[arg(value_name = "LABEL")]
        labels: Vec<String>,
    },
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    let (schema, lookup) = cfg
        .schema_and_lookup()
        .context("failed to build header lookup")?;

    match cli.cmd {
        Cmd::Ingest {
            dir,
            dry_run,
            max_files,
        } => {
            let dir = dir.unwrap_or_else(|| cfg.inbox_dir.clone());
            let mut merger = TargetMerger::open(&cfg.master_path, schema, lookup)
                .with_context(|| format!("load master table {}", cfg.master_path.display()))?;
            let opts = BatchOptions {
                save_to: (!dry_run).then(|| cfg.master_path.clone()),
                processed_dir: (!dry_run).then(|| cfg.processed_dir.clone()),
                max_files,
            };
            let report = ingest_dir(&mut merger, &dir, &[cfg.master_path.clone()], &opts)?;
            print!("{report}");
        }
        Cmd::Merge { files, dry_run } => {
            let mut merger = TargetMerger::open(&cfg.master_path, schema, lookup)
                .with_context(|| format!("load master table {}", cfg.master_path.display()))?;
            let opts = BatchOptions {
                save_to: (!dry_run).then(|| cfg.master_path.clone()),
                ..BatchOptions::default()
            };
            let report = run_batch(&mut merger, &files, &opts)?;
            print!("{report}");
        }
        Cmd::Lookup { labels } => print_lookup(&lookup, &labels),
    }

    Ok(())
}

fn print_lookup(lookup: &HeaderLookup, labels: &[String]) {
    if !labels.is_empty() {
        for label in labels {
            match lookup.get(label) {
                Some(canonical) => println!("{label:?} -> {canonical}"),
                None => println!("{label:?} -> {} (pass-through)", lookup.resolve(label)),
            }
        }
        return;
    }

    for (label, canonical) in lookup.iter() {
        println!("{label:<24} {canonical}");
    }
    for c in lookup.conflicts() {
        println!(
            "conflict: {:?} kept for {}, ignored for {}",
            c.label, c.kept, c.rejected
        );
    }
    for o in lookup.overrides() {
        match &o.replaced {
            Some(prev) => println!("override: {:?} -> {} (was {prev})", o.label, o.canonical),
            None => println!("override: {:?} -> {}", o.label, o.canonical),
        }
    }
}
