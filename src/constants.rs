//! Application constants for the AIS processor
//!
//! This module contains processing defaults, AIS code tables and naming
//! conventions used throughout the AIS processor application.

// =============================================================================
// Processing Defaults
// =============================================================================

/// Margin in degrees added to every port rectangle before containment tests
pub const DEFAULT_TOLERANCE_DEGREES: f64 = 1.3;

/// Maximum number of position reports held in one batch
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100_000;

/// Default number of archives processed concurrently
pub const DEFAULT_WORKERS: usize = 4;

/// Memory usage fraction above which concurrency is halved
pub const DEFAULT_MEMORY_THRESHOLD: f64 = 0.8;

/// Name of the catch-all region for positions outside every port area
pub const FALLBACK_REGION: &str = "Unknown";

// =============================================================================
// AIS Code Tables
// =============================================================================

/// Vessel type codes relevant to port calls
pub mod vessel_types {
    /// Towing vessels
    pub const TOWING: i64 = 30;

    /// Tugs
    pub const TUG: i64 = 52;

    /// First cargo class code (inclusive)
    pub const CARGO_TANKER_START: i64 = 70;

    /// End of the tanker class codes (exclusive)
    pub const CARGO_TANKER_END: i64 = 90;

    /// Whether a vessel type code is retained for visit inference
    pub fn is_port_calling(code: i64) -> bool {
        code == TOWING || code == TUG || (CARGO_TANKER_START..CARGO_TANKER_END).contains(&code)
    }
}

/// Navigational status codes signalling a stationary vessel
pub mod nav_status {
    /// At anchor
    pub const AT_ANCHOR: i64 = 1;

    /// Moored
    pub const MOORED: i64 = 5;

    /// All stationary status values
    pub const STATIONARY: &[i64] = &[AT_ANCHOR, MOORED];

    /// Whether a status code marks the vessel as stationary
    pub fn is_stationary(code: i64) -> bool {
        STATIONARY.contains(&code)
    }
}

// =============================================================================
// Archive Naming
// =============================================================================

/// File extension of position report archives
pub const ARCHIVE_EXTENSION: &str = "csv";

/// Pattern of dated archive names, e.g. `AIS_2020_01_31.csv`
pub const ARCHIVE_DATE_PATTERN: &str = r"AIS_(\d{4})_(\d{2})_(\d{2})";

/// Default file name of the written visit table
pub const DEFAULT_OUTPUT_FILE: &str = "port_visits.parquet";
