//! Command-line front end: build or load a working schedule, feed it busy
//! ranges, cut the open time into blocks, and save it back.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::anyhow;
use chrono::Utc;
use clap::Parser;
use tracing::warn;

use openslot::duration::parse_duration;
use openslot::range::{justify, parse_datetime};
use openslot::store::{self, StoreError};
use openslot::{Justify, Schedule, TileCount, TimeRange, Timestamp};

const DEFAULT_DURATION: i64 = 12 * 60 * 60;

// errno-style exit codes
const EXIT_INVALID: u8 = 22; // EINVAL
const EXIT_NOENT: u8 = 2; // ENOENT
const EXIT_IO: u8 = 5; // EIO

/// Track busy time inside a scheduling period and hand out the open blocks.
#[derive(Parser)]
#[command(name = "openslot", version)]
struct Cli {
    /// Initialize a new working schedule with the given scheduling period
    #[arg(short, long, value_name = "PERIOD")]
    init: Option<String>,

    /// Load the working schedule from the given file
    #[arg(short, long, value_name = "FILE")]
    load: Option<PathBuf>,

    /// Save the working schedule; without a file, the file it was loaded
    /// from is reused
    #[arg(short, long, value_name = "FILE", num_args = 0..=1)]
    save: Option<Option<PathBuf>>,

    /// Summarize the working schedule on stdout
    #[arg(short, long)]
    print: bool,

    /// Do not hand out time at or after this date-time (default: now)
    #[arg(short, long, value_name = "DATE-TIME")]
    before: Option<String>,

    /// Cut open time into blocks of this length (default: 12 hours)
    #[arg(short, long, value_name = "DUR")]
    duration: Option<String>,

    /// Print up to N open blocks, marking each one busy
    #[arg(short, long, value_name = "N")]
    next: Option<u32>,

    /// Mark a time range busy (repeatable)
    #[arg(short = 'a', long, value_name = "RANGE")]
    add_range: Vec<String>,

    /// Mark busy every range read from a file, one per line; `-` reads
    /// standard input (repeatable)
    #[arg(short = 'f', long, value_name = "FILE")]
    add_file: Vec<PathBuf>,
}

struct CliError {
    code: u8,
    source: anyhow::Error,
}

impl CliError {
    fn new(code: u8, source: anyhow::Error) -> Self {
        CliError { code, source }
    }
}

fn invalid(source: anyhow::Error) -> CliError {
    CliError::new(EXIT_INVALID, source)
}

fn no_schedule() -> CliError {
    invalid(anyhow!("no working schedule"))
}

fn store_failure(err: StoreError) -> CliError {
    let code = match &err {
        StoreError::Open { .. } | StoreError::NotAFile { .. } => EXIT_NOENT,
        _ => EXIT_IO,
    };
    CliError::new(code, err.into())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openslot=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR:  {:#}", err.source);
            ExitCode::from(err.code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut schedule: Option<Schedule> = None;
    let mut schedule_file: Option<PathBuf> = None;

    if let Some(text) = &cli.init {
        let period = TimeRange::parse(text);
        if !period.is_valid() {
            return Err(invalid(anyhow!("invalid scheduling time period: {text}")));
        }
        schedule = Some(Schedule::new(period));
    }
    if let Some(path) = &cli.load {
        schedule = Some(store::load_trusted(path).map_err(store_failure)?);
        schedule_file = Some(path.clone());
    }

    for text in &cli.add_range {
        let sched = schedule.as_mut().ok_or_else(no_schedule)?;
        add_range(sched, text)?;
    }
    for path in &cli.add_file {
        let sched = schedule.as_mut().ok_or_else(no_schedule)?;
        if path.as_os_str() == "-" {
            add_ranges_from(sched, std::io::stdin().lock())?;
        } else {
            let file = File::open(path).map_err(|err| {
                CliError::new(
                    EXIT_NOENT,
                    anyhow!(
                        "unable to open `{}` for reading time ranges: {err}",
                        path.display()
                    ),
                )
            })?;
            add_ranges_from(sched, BufReader::new(file))?;
        }
    }

    if let Some(count) = cli.next {
        let sched = schedule.as_mut().ok_or_else(no_schedule)?;
        let duration = match &cli.duration {
            Some(text) => parse_duration(text)
                .map_err(|err| invalid(anyhow!("invalid duration `{text}`: {err}")))?,
            None => DEFAULT_DURATION,
        };
        let cutoff = match &cli.before {
            Some(text) => parse_datetime(text)
                .ok_or_else(|| invalid(anyhow!("invalid date/time: {text}")))?,
            None => Utc::now().timestamp(),
        };
        emit_open_blocks(sched, count, duration, cutoff);
    }

    if cli.print {
        if let Some(sched) = &schedule {
            println!("{sched}");
        }
    }

    if let Some(save_arg) = &cli.save {
        let sched = schedule.as_mut().ok_or_else(no_schedule)?;
        let target = save_arg
            .clone()
            .or_else(|| schedule_file.clone())
            .ok_or_else(|| {
                invalid(anyhow!("no filename to which to save the working schedule"))
            })?;
        store::save(sched, &target).map_err(store_failure)?;
    }

    Ok(())
}

fn add_range(schedule: &mut Schedule, text: &str) -> Result<(), CliError> {
    let range = TimeRange::parse(text);
    if !range.is_valid() {
        return Err(invalid(anyhow!("invalid time range for addition: {text}")));
    }
    if !schedule.insert(range) {
        warn!(%range, "range does not overlap the scheduling period, ignored");
    }
    Ok(())
}

fn add_ranges_from(schedule: &mut Schedule, reader: impl BufRead) -> Result<(), CliError> {
    for line in reader.lines() {
        let line = line.map_err(|err| {
            CliError::new(EXIT_IO, anyhow!("unable to read time ranges: {err}"))
        })?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            add_range(schedule, trimmed)?;
        }
    }
    Ok(())
}

// Justify the cutoff down to whole minutes, hours, or days depending on
// the block length, then peel tiles off each open gap in turn, printing
// and reserving them as we go.
fn emit_open_blocks(schedule: &mut Schedule, count: u32, duration: i64, cutoff: Timestamp) {
    let justify_to = if duration >= 86_400 {
        Justify::Days
    } else if duration >= 3_600 {
        Justify::Hours
    } else {
        Justify::Minutes
    };
    let cutoff = justify(cutoff, justify_to, false);

    let mut remaining = count;
    while remaining > 0 && !schedule.is_full() {
        let Some(gap) = schedule.next_open_gap_before(cutoff) else {
            break;
        };
        if gap.tile_count(duration) == TileCount::Finite(0) {
            break;
        }
        let mut index = 0u64;
        let mut emitted = false;
        while remaining > 0 {
            let Some(tile) = gap.tile_at(duration, index) else {
                break;
            };
            println!("{tile}");
            schedule.insert(tile);
            remaining -= 1;
            index += 1;
            emitted = true;
        }
        if !emitted {
            break;
        }
    }
}
