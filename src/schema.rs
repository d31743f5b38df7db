//! Column layout of position report batches and visit tables.
//!
//! Names the columns the pipeline reads and writes, checks batches for the
//! required subset, and parses the `BaseDateTime` field into epoch
//! milliseconds.

use crate::error::{AisError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::DataFrame;

pub mod columns {
    pub const MMSI: &str = "MMSI";
    pub const BASE_DATE_TIME: &str = "BaseDateTime";
    pub const LAT: &str = "LAT";
    pub const LON: &str = "LON";
    pub const VESSEL_TYPE: &str = "VesselType";
    pub const STATUS: &str = "Status";

    /// Added by the port resolver
    pub const PORT_NAME: &str = "PortName";

    pub const ARRIVAL_TIME: &str = "ArrivalTime";
    pub const DEPARTURE_TIME: &str = "DepartureTime";
}

/// Columns every position report batch must carry
pub const REQUIRED_COLUMNS: &[&str] = &[
    columns::MMSI,
    columns::BASE_DATE_TIME,
    columns::LAT,
    columns::LON,
    columns::VESSEL_TYPE,
];

/// Columns read from archives; everything else is dropped on load
pub const PIPELINE_COLUMNS: &[&str] = &[
    columns::MMSI,
    columns::BASE_DATE_TIME,
    columns::LAT,
    columns::LON,
    columns::VESSEL_TYPE,
    columns::STATUS,
];

/// Required columns absent from a set of column names, in declaration order
pub fn missing_required<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let present: Vec<&str> = names.into_iter().collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !present.contains(required))
        .map(|required| required.to_string())
        .collect()
}

/// Fail with a schema mismatch when `df` lacks a required column
pub fn ensure_required_columns(df: &DataFrame, unit: &str) -> Result<()> {
    let missing = missing_required(df.get_column_names().into_iter().map(|name| name.as_str()));
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AisError::schema_mismatch(unit, missing))
    }
}

/// Whether the batch schema carries a navigational status column
pub fn has_status(df: &DataFrame) -> bool {
    df.get_column_index(columns::STATUS).is_some()
}

/// Parse an ISO-8601 style timestamp into epoch milliseconds.
///
/// Zone-less values are taken as UTC, which is how the NOAA archives
/// publish `BaseDateTime`. Returns `None` for anything unparseable.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}
