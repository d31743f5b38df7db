//! Core data structures and types for AIS processing.
//!
//! Defines annotated position reports, visit records, the deduplicated
//! visit table, and the statistics and failure reports of a processing run.

use crate::error::Result;
use crate::schema::columns;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// A retained position report with its resolved region
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedReport {
    pub mmsi: i64,
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub region: String,
}

/// A vessel's first arrival at a port and, when seen, its first departure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub mmsi: i64,
    pub region: String,
    pub arrival: DateTime<Utc>,
    pub departure: Option<DateTime<Utc>>,
}

/// One visit per vessel, in first-encountered order.
///
/// Inserting a vessel that is already present is a no-op, so merging tables
/// in processing order keeps the record that was produced first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitTable {
    records: Vec<VisitRecord>,
    index: HashMap<i64, usize>,
}

impl VisitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records, keeping the first record per vessel
    pub fn from_records(records: impl IntoIterator<Item = VisitRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.insert_if_absent(record);
        }
        table
    }

    /// Add a record unless the vessel already has one; returns whether it was added
    pub fn insert_if_absent(&mut self, record: VisitRecord) -> bool {
        if self.index.contains_key(&record.mmsi) {
            return false;
        }
        self.index.insert(record.mmsi, self.records.len());
        self.records.push(record);
        true
    }

    /// Combine with a table produced later in processing order
    pub fn merge(mut self, later: VisitTable) -> Self {
        for record in later.records {
            self.insert_if_absent(record);
        }
        self
    }

    pub fn get(&self, mmsi: i64) -> Option<&VisitRecord> {
        self.index.get(&mmsi).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[VisitRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &VisitRecord> {
        self.records.iter()
    }

    /// Drop visits resolved to the fallback region
    pub fn without_region(self, fallback: &str) -> Self {
        Self::from_records(self.records.into_iter().filter(|r| r.region != fallback))
    }

    /// Columnar form: `MMSI`, `PortName`, `ArrivalTime`, `DepartureTime`
    pub fn to_frame(&self) -> Result<DataFrame> {
        let datetime = DataType::Datetime(TimeUnit::Milliseconds, None);

        let mmsi: Vec<i64> = self.records.iter().map(|r| r.mmsi).collect();
        let ports: Vec<&str> = self.records.iter().map(|r| r.region.as_str()).collect();
        let arrivals: Vec<i64> = self
            .records
            .iter()
            .map(|r| r.arrival.timestamp_millis())
            .collect();
        let departures: Vec<Option<i64>> = self
            .records
            .iter()
            .map(|r| r.departure.map(|d| d.timestamp_millis()))
            .collect();

        let df = DataFrame::new(vec![
            Column::new(columns::MMSI.into(), mmsi),
            Column::new(columns::PORT_NAME.into(), ports),
            Column::new(columns::ARRIVAL_TIME.into(), arrivals).cast(&datetime)?,
            Column::new(columns::DEPARTURE_TIME.into(), departures).cast(&datetime)?,
        ])?;

        Ok(df)
    }
}

/// A unit of work that was skipped, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUnit {
    pub archive: String,
    /// `None` when the whole archive was skipped
    pub batch: Option<usize>,
    pub cause: String,
}

impl fmt::Display for SkippedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.batch {
            Some(batch) => write!(f, "{} [batch {}]: {}", self.archive, batch, self.cause),
            None => write!(f, "{}: {}", self.archive, self.cause),
        }
    }
}

/// Processing statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub archives_processed: usize,
    pub archives_failed: usize,
    pub batches_processed: usize,
    pub batches_failed: usize,
    pub rows_read: usize,
    pub rows_retained: usize,
    pub visits_found: usize,
    pub processing_time_ms: u128,
}

impl ProcessingStats {
    /// Fold another unit's counters into this one
    pub fn absorb(&mut self, other: &ProcessingStats) {
        self.archives_processed += other.archives_processed;
        self.archives_failed += other.archives_failed;
        self.batches_processed += other.batches_processed;
        self.batches_failed += other.batches_failed;
        self.rows_read += other.rows_read;
        self.rows_retained += other.rows_retained;
        self.visits_found += other.visits_found;
    }
}

/// Outcome of a processing run: best-effort visits plus what was skipped
#[derive(Debug, Default)]
pub struct RunReport {
    pub visits: VisitTable,
    pub stats: ProcessingStats,
    pub skipped: Vec<SkippedUnit>,
    /// Set once the visit table has been written
    pub output_path: Option<PathBuf>,
}
