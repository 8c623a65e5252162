//! seglog CLI
//!
//! Command-line interface for appending to and reading from a log directory.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use seglog::segment::{self, TailDefect};
use seglog::{Headers, Log, LogConfig, Record, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// seglog CLI
#[derive(Parser, Debug)]
#[command(name = "seglog")]
#[command(about = "Append-only segmented commit log")]
#[command(version)]
struct Args {
    /// Log directory
    #[arg(short, long, default_value = "./seglog_data")]
    dir: PathBuf,

    /// Segment size in bytes before rollover
    #[arg(short, long, default_value = "1048576")]
    max_segment_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a record
    Append {
        /// Topic of the record
        topic: String,

        /// Value of the record
        value: String,

        /// Header as key=value (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Read the record at an offset
    Read {
        /// The offset to read
        offset: u64,
    },

    /// Print consecutive records
    Scan {
        /// First offset to print
        #[arg(short, long, default_value = "0")]
        from: u64,

        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show segments and offsets
    Stat,

    /// Check segment files without modifying them
    Verify,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,seglog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> seglog::Result<()> {
    // Opening the log repairs torn tails, so verify works on the raw files
    let command = match args.command {
        Commands::Verify => return verify(&args.dir),
        command => command,
    };

    let config = LogConfig::builder()
        .dir(&args.dir)
        .max_segment_size(args.max_segment_size)
        .sync_strategy(SyncStrategy::EveryWrite)
        .build()?;
    let log = Log::open_with_config(config)?;

    let result = execute(&log, command);
    match (result, log.close()) {
        (Err(e), Err(close_err)) => {
            tracing::error!("Failed to close log after command error: {}", close_err);
            Err(e)
        }
        (result, close) => result.and(close),
    }
}

fn execute(log: &Log, command: Commands) -> seglog::Result<()> {
    match command {
        Commands::Append {
            topic,
            value,
            headers,
        } => {
            let record = Record::new(topic, value).with_headers(headers.into_iter().collect::<Headers>());
            let offset = log.append(record)?;
            println!("Appended record at offset {}", offset);
            Ok(())
        }
        Commands::Read { offset } => {
            print_record(&log.read(offset)?);
            Ok(())
        }
        Commands::Scan { from, limit } => {
            for record in log.iter_from(from).take(limit.unwrap_or(usize::MAX)) {
                print_record(&record?);
            }
            Ok(())
        }
        Commands::Stat => {
            println!("next offset: {}", log.next_offset()?);
            for info in log.segments() {
                println!(
                    "{}  offsets [{}, {})  {} bytes",
                    info.path.display(),
                    info.base_offset,
                    info.next_offset,
                    info.size
                );
            }
            Ok(())
        }
        Commands::Verify => verify(log.dir()),
    }
}

fn verify(dir: &Path) -> seglog::Result<()> {
    for (base_offset, path) in segment::list_segment_files(dir)? {
        let report = segment::verify(&path, base_offset)?;
        let status = match report.defect {
            None => "ok".to_string(),
            Some(TailDefect::ChecksumMismatch) => {
                format!("checksum mismatch, {} bytes past last valid frame", report.truncated_bytes)
            }
            Some(defect) => format!("torn tail ({:?}), {} bytes", defect, report.truncated_bytes),
        };
        println!(
            "{}  {} frames  {}",
            path.display(),
            report.frames_recovered,
            status
        );
    }
    Ok(())
}

fn print_record(record: &Record) {
    let headers = record
        .headers
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");
    println!(
        "offset={} topic={} timestamp={} headers=[{}] value={}",
        record.offset,
        record.topic,
        record.timestamp,
        headers,
        String::from_utf8_lossy(&record.value)
    );
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("header must be key=value, got {:?}", raw))
}
