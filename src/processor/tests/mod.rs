//! Integration tests for the processor module
//!
//! Runs the full archive pipeline over in-memory frames and small CSV
//! directories.


use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::processor::VisitProcessor;
use crate::processor::source::{ArchiveSource, FrameArchive};
use crate::regions::RegionCatalog;
use polars::prelude::*;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// Open sea, resolves to the fallback region
pub const SEA: (f64, f64) = (20.0, -140.0);
pub const LOS_ANGELES: (f64, f64) = (33.75, -118.25);
pub const HOUSTON: (f64, f64) = (29.7, -95.0);

/// One cargo vessel report `minutes` after 2020-01-01T00:00:00
pub type Ping = (i64, i64, (f64, f64));

pub fn timestamp(minutes: i64) -> String {
    format!("2020-01-01T{:02}:{:02}:00", minutes / 60, minutes % 60)
}

/// Position report frame with every pipeline column, all rows retainable
pub fn report_frame(pings: &[Ping]) -> DataFrame {
    let mmsi: Vec<i64> = pings.iter().map(|p| p.0).collect();
    let times: Vec<String> = pings.iter().map(|p| timestamp(p.1)).collect();
    let lat: Vec<f64> = pings.iter().map(|p| (p.2).0).collect();
    let lon: Vec<f64> = pings.iter().map(|p| (p.2).1).collect();

    df!(
        "MMSI" => mmsi,
        "BaseDateTime" => times,
        "LAT" => lat,
        "LON" => lon,
        "VesselType" => vec![70i64; pings.len()],
        "Status" => vec![5i64; pings.len()],
    )
    .unwrap()
}

pub fn frame_archive(name: &str, pings: &[Ping]) -> Box<dyn ArchiveSource> {
    Box::new(FrameArchive::new(name, report_frame(pings)))
}

pub fn test_processor(config: ProcessorConfig) -> VisitProcessor {
    VisitProcessor::new(config.without_progress(), RegionCatalog::us_ports()).unwrap()
}

/// CSV text for an archive file with the full AIS header
pub fn csv_archive(pings: &[Ping]) -> String {
    let mut content = String::from(
        "MMSI,BaseDateTime,LAT,LON,SOG,COG,Heading,VesselName,IMO,CallSign,VesselType,Status,Length,Width,Draft,Cargo,TransceiverClass\n",
    );
    for (mmsi, minutes, (lat, lon)) in pings {
        content.push_str(&format!(
            "{mmsi},{},{lat},{lon},0.1,0,511,VESSEL,,,70,5,100,20,5,70,A\n",
            timestamp(*minutes)
        ));
    }
    content
}

/// Archive serving pre-scripted batch results in order.
///
/// Once the script runs out it cancels `cancel_when_exhausted`, if set, and
/// reports the end of the archive.
pub struct ScriptedArchive {
    pub name: String,
    pub steps: VecDeque<Result<DataFrame>>,
    pub cancel_when_exhausted: Option<CancellationToken>,
}

impl ScriptedArchive {
    pub fn new(name: &str, steps: Vec<Result<DataFrame>>) -> Self {
        Self {
            name: name.to_string(),
            steps: steps.into(),
            cancel_when_exhausted: None,
        }
    }
}

impl ArchiveSource for ScriptedArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_batch(&mut self, _max_rows: usize) -> Result<Option<DataFrame>> {
        match self.steps.pop_front() {
            Some(step) => step.map(Some),
            None => {
                if let Some(token) = &self.cancel_when_exhausted {
                    token.cancel();
                }
                Ok(None)
            }
        }
    }
}
