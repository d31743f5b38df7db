//! AIS Processor Library
//!
//! Extracts the first port visit of every vessel from AIS position report
//! archives. Archives are streamed in bounded batches through a fixed
//! pipeline:
//!
//! - **Record filter**: keep cargo, tanker, towing and tug vessels with
//!   valid coordinates and timestamps (and an at-anchor or moored status
//!   where the archive reports one)
//! - **Port resolution**: label each report with the first matching port
//!   area, widened by a tolerance, or the fallback region
//! - **Visit extraction**: per vessel, the first arrival into a port and
//!   the first departure after it
//! - **Merge**: combine batch and archive results, keeping the first record
//!   encountered for each vessel
//!
//! ```no_run
//! use ais_processor::{ProcessorConfig, RegionCatalog, VisitProcessor};
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> ais_processor::Result<()> {
//! let processor = VisitProcessor::new(ProcessorConfig::default(), RegionCatalog::us_ports())?;
//! let report = processor
//!     .process_directory(
//!         Path::new("data/ais"),
//!         (None, None),
//!         Path::new("port_visits.parquet"),
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! println!("{} visits", report.visits.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod processor;
pub mod regions;
pub mod schema;

pub use config::{CompressionAlgorithm, ExtractionMode, ProcessorConfig};
pub use error::{AisError, Result};
pub use models::{ProcessingStats, RunReport, SkippedUnit, VisitRecord, VisitTable};
pub use processor::VisitProcessor;
pub use processor::source::{ArchiveSource, CsvArchive, FrameArchive};
pub use regions::{BoundingBox, Region, RegionCatalog};
