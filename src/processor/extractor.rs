//! Visit extraction from port-annotated position reports
//!
//! Each vessel's reports are replayed in time order through a small state
//! machine:
//!
//! ```text
//! SeekingArrival --(first report in a named region)--> Arrived
//! Arrived --(first later report in the fallback region)--> Departed
//! ```
//!
//! A vessel that never leaves `SeekingArrival` has no visit. A vessel still
//! `Arrived` when its reports run out has a visit without a departure. Only
//! the first visit is kept; later port calls of the same vessel are ignored.

use crate::config::ExtractionMode;
use crate::error::Result;
use crate::models::{AnnotatedReport, VisitRecord};
use crate::schema::columns;
use chrono::{DateTime, Utc};
use polars::prelude::*;

#[derive(Debug, Clone, PartialEq)]
enum VisitState {
    SeekingArrival,
    Arrived {
        region: String,
        arrival: DateTime<Utc>,
    },
    Departed {
        region: String,
        arrival: DateTime<Utc>,
        departure: DateTime<Utc>,
    },
}

/// Replays one vessel's time-ordered reports
#[derive(Debug)]
struct VisitTracker<'a> {
    mmsi: i64,
    fallback: &'a str,
    mode: ExtractionMode,
    state: VisitState,
}

impl<'a> VisitTracker<'a> {
    fn new(mmsi: i64, fallback: &'a str, mode: ExtractionMode) -> Self {
        Self {
            mmsi,
            fallback,
            mode,
            state: VisitState::SeekingArrival,
        }
    }

    fn observe(&mut self, report: &AnnotatedReport) {
        let in_port = report.region != self.fallback;

        match &self.state {
            VisitState::SeekingArrival if in_port => {
                self.state = VisitState::Arrived {
                    region: report.region.clone(),
                    arrival: report.timestamp,
                };
            }
            VisitState::Arrived { region, arrival }
                if !in_port && report.timestamp > *arrival =>
            {
                self.state = VisitState::Departed {
                    region: region.clone(),
                    arrival: *arrival,
                    departure: report.timestamp,
                };
            }
            _ => {}
        }
    }

    /// No further report can change the outcome
    fn is_settled(&self) -> bool {
        match self.state {
            VisitState::SeekingArrival => false,
            VisitState::Arrived { .. } => !self.mode.tracks_departures(),
            VisitState::Departed { .. } => true,
        }
    }

    fn finish(self) -> Option<VisitRecord> {
        match self.state {
            VisitState::SeekingArrival => None,
            VisitState::Arrived { region, arrival } => Some(VisitRecord {
                mmsi: self.mmsi,
                region,
                arrival,
                departure: None,
            }),
            VisitState::Departed {
                region,
                arrival,
                departure,
            } => Some(VisitRecord {
                mmsi: self.mmsi,
                region,
                arrival,
                departure: Some(departure),
            }),
        }
    }
}

/// At most one visit per vessel from a filtered, port-annotated batch
pub fn extract_visits(
    batch: &DataFrame,
    fallback: &str,
    mode: ExtractionMode,
) -> Result<Vec<VisitRecord>> {
    let reports = reports_from_frame(batch)?;
    Ok(extract_from_reports(reports, fallback, mode))
}

/// Run the visit state machine over each vessel's reports.
///
/// Reports are stably sorted by vessel then timestamp first, so reports
/// sharing a timestamp are seen in input order. Output is ordered by vessel id.
pub fn extract_from_reports(
    mut reports: Vec<AnnotatedReport>,
    fallback: &str,
    mode: ExtractionMode,
) -> Vec<VisitRecord> {
    reports.sort_by_key(|report| (report.mmsi, report.timestamp));

    reports
        .chunk_by(|a, b| a.mmsi == b.mmsi)
        .filter_map(|vessel_reports| {
            let mut tracker = VisitTracker::new(vessel_reports[0].mmsi, fallback, mode);
            for report in vessel_reports {
                tracker.observe(report);
                if tracker.is_settled() {
                    break;
                }
            }
            tracker.finish()
        })
        .collect()
}

/// Typed reports from a batch with `MMSI`, `BaseDateTime` (epoch ms), `LAT`,
/// `LON` and `PortName`. Rows with a null in any of them are skipped.
pub fn reports_from_frame(batch: &DataFrame) -> Result<Vec<AnnotatedReport>> {
    let mmsi = batch.column(columns::MMSI)?.cast(&DataType::Int64)?;
    let timestamp = batch
        .column(columns::BASE_DATE_TIME)?
        .cast(&DataType::Int64)?;
    let lat = batch.column(columns::LAT)?.cast(&DataType::Float64)?;
    let lon = batch.column(columns::LON)?.cast(&DataType::Float64)?;
    let port = batch.column(columns::PORT_NAME)?;

    let reports = mmsi
        .i64()?
        .into_iter()
        .zip(timestamp.i64()?)
        .zip(lat.f64()?)
        .zip(lon.f64()?)
        .zip(port.str()?)
        .filter_map(|((((mmsi, millis), lat), lon), region)| {
            Some(AnnotatedReport {
                mmsi: mmsi?,
                timestamp: DateTime::from_timestamp_millis(millis?)?,
                lat: lat?,
                lon: lon?,
                region: region?.to_string(),
            })
        })
        .collect();

    Ok(reports)
}
