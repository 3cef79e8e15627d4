//! Loading of normalized observation files.
//!
//! One reading per line:
//!
//! ```text
//! # comment
//! 2021-04-12T09:15:00,BM01,2345.678,0.005
//! 2021-04-12T09:25:00,BM02,2345.731,0.006,0.012,false
//! ```
//!
//! Columns are `time,benchmark,value,error` with optional `tide,applied`.
//! Timestamps without an offset are read as UTC. Rows without tide columns are
//! treated as already tide corrected with a zero correction.
//!
//! Design goals (same as any other ingest in this crate):
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (stable sort by time, no guessing)
//! - **Separation of concerns**: no inversion logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::Observation;
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Summary stats about the loaded readings.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_observations: usize,
    pub n_benchmarks: usize,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// Ingest output: readings in time order + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Vec<Observation>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a normalized observation file from disk.
pub fn load_observations(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open observations '{}': {e}", path.display())))?;
    let data = read_observations(file)?;
    info!(
        path = %path.display(),
        observations = data.observations.len(),
        skipped = data.row_errors.len(),
        "observations loaded"
    );
    Ok(data)
}

/// Parse normalized observation rows from any reader.
pub fn read_observations<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for result in reader.records() {
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line() as usize).unwrap_or(rows_read);
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line() as usize).unwrap_or(rows_read);

        if record.iter().all(str::is_empty) {
            rows_read -= 1;
            continue;
        }

        match parse_row(&record) {
            Ok(observation) => observations.push(observation),
            Err(message) => {
                warn!(line, %message, "skipping observation row");
                row_errors.push(RowError { line, message });
            }
        }
    }

    // Parsers emit time-ordered data; enforce it without reordering equal stamps.
    observations.sort_by_key(|o| o.time);

    let stats = compute_stats(&observations)
        .ok_or_else(|| AppError::new(3, "No valid observations remain after parsing."))?;

    Ok(IngestedData {
        observations,
        stats,
        row_errors,
        rows_read,
    })
}

fn parse_row(record: &StringRecord) -> Result<Observation, String> {
    if record.len() < 4 {
        return Err(format!(
            "Expected at least 4 columns (time,benchmark,value,error), found {}.",
            record.len()
        ));
    }

    let time = parse_time(field(record, 0, "time")?)?;
    let benchmark = field(record, 1, "benchmark")?.to_string();
    let value = parse_finite(field(record, 2, "value")?, "value")?;
    let error = parse_finite(field(record, 3, "error")?, "error")?;
    if error <= 0.0 {
        return Err(format!("Invalid `error` {error} (must be > 0)."));
    }

    let observation = Observation::new(time, benchmark, value, error);

    match (record.get(4).filter(|s| !s.is_empty()), record.get(5).filter(|s| !s.is_empty())) {
        (None, None) => Ok(observation),
        (Some(tide), applied) => {
            let tide = parse_finite(tide, "tide")?;
            let applied = match applied {
                Some(s) => parse_bool(s)?,
                None => false,
            };
            Ok(observation.with_tide(applied, tide))
        }
        (None, Some(_)) => Err("Column `applied` given without `tide`.".to_string()),
    }
}

fn field<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    const FMTS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in FMTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!(
        "Invalid time '{s}'. Expected ISO-8601, e.g. 2021-04-12T09:15:00 (UTC) or RFC 3339."
    ))
}

fn parse_finite(s: &str, name: &str) -> Result<f64, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("Invalid `{name}` '{s}' (not a number)."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Invalid `{name}` '{s}' (not finite)."))
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(format!("Invalid `applied` '{s}' (expected true/false).")),
    }
}

fn compute_stats(observations: &[Observation]) -> Option<DatasetStats> {
    let first = observations.first()?.time;
    let last = observations.last()?.time;

    let mut labels: Vec<&str> = observations.iter().map(|o| o.benchmark.as_str()).collect();
    labels.sort_unstable();
    labels.dedup();

    Some(DatasetStats {
        n_observations: observations.len(),
        n_benchmarks: labels.len(),
        first,
        last,
    })
}
