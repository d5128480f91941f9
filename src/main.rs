//! usnjrnl CLI
//!
//! Command-line front end for the USN journal decoder.

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use usnjrnl::{coalesce_events, usn_journal_with_config, JournalEntry, ScanConfig};

/// usnjrnl - NTFS USN Change Journal decoder
///
/// Reads an extracted $UsnJrnl:$J stream and prints its change records.
#[derive(Parser)]
#[command(name = "usnjrnl")]
#[command(version)]
#[command(about = "Decode an NTFS USN change journal", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode every record of a journal file
    Parse {
        /// Path to the extracted $J stream
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Bytes read per block
        #[arg(long, default_value = "8192")]
        block_size: usize,

        /// Stop on records with a known but unimplemented version
        #[arg(long)]
        strict: bool,
    },

    /// Fold consecutive records into change events
    Timeline {
        /// Path to the extracted $J stream
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    usnjrnl::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Parse {
            path,
            format,
            block_size,
            strict,
        } => {
            let config = ScanConfig::default()
                .with_block_size(block_size)
                .with_strict_versions(strict);
            cmd_parse(&path, format, config)
        }

        Commands::Timeline { path, format } => cmd_timeline(&path, format),
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

/// Parse command implementation
fn cmd_parse(path: &Path, format: OutputFormat, config: ScanConfig) -> usnjrnl::Result<()> {
    let start = Instant::now();
    let mut scanner = usn_journal_with_config(path, config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            let entries = scanner.by_ref().collect::<usnjrnl::Result<Vec<JournalEntry>>>()?;
            serde_json::to_writer_pretty(&mut out, &entries).map_err(std::io::Error::from)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for entry in scanner.by_ref() {
                writeln!(out, "{}", format_entry(&entry?))?;
            }
        }
    }

    let stats = scanner.stats();
    eprintln!(
        "{} {} records, {} corrupted ({} unsupported version) in {:.2}s",
        style("✓").green().bold(),
        style(stats.records).cyan(),
        if stats.corrupted > 0 {
            style(stats.corrupted).red()
        } else {
            style(stats.corrupted).dim()
        },
        stats.unsupported,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Timeline command implementation
fn cmd_timeline(path: &Path, format: OutputFormat) -> usnjrnl::Result<()> {
    let scanner = usn_journal_with_config(path, ScanConfig::default())?;
    let entries = scanner.collect::<usnjrnl::Result<Vec<JournalEntry>>>()?;
    let (events, stats) = coalesce_events(entries);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &events).map_err(std::io::Error::from)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for event in &events {
                writeln!(
                    out,
                    "{}  {:>12}  {}  [{}]  [{}]",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
                    event.file_reference_number,
                    event.file_name,
                    event.reasons.join(", "),
                    event.file_attributes.join(", ")
                )?;
            }
        }
    }

    if stats.corrupted > 0 {
        eprintln!(
            "{} {} corrupted records skipped, some events might be missing",
            style("!").yellow().bold(),
            stats.corrupted
        );
    }
    eprintln!(
        "{} {} events from {} records",
        style("✓").green().bold(),
        style(stats.events).cyan(),
        stats.records
    );

    Ok(())
}

fn format_entry(entry: &JournalEntry) -> String {
    match entry {
        JournalEntry::Record { index, record } => format!(
            "{:>8}  {}  usn={}  frn={}/{}  parent={}/{}  v{}  {}  [{}]  [{}]",
            index,
            record.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
            record.update_sequence_number,
            record.file_reference_number,
            record.file_reference_number_sequence,
            record.parent_file_reference_number,
            record.parent_file_reference_number_sequence,
            record.version,
            record.file_name,
            record.reasons.join(", "),
            record.file_attributes.join(", ")
        ),
        JournalEntry::Corrupted(marker) => format!("{:>8}  <corrupted record>", marker.index),
    }
}
