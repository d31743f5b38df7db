//! Configuration management and validation.
//!
//! Provides the run configuration for visit extraction: region tolerance,
//! batch sizing, worker concurrency, extraction mode and output settings.

use crate::constants::{
    DEFAULT_MAX_BATCH_SIZE, DEFAULT_MEMORY_THRESHOLD, DEFAULT_TOLERANCE_DEGREES, DEFAULT_WORKERS,
};
use crate::error::{AisError, Result};
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How much of a vessel's history the extractor keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// First arrival plus the first departure after it
    #[default]
    ArrivalDeparture,
    /// First arrival only; departure is never recorded
    FirstArrival,
}

impl ExtractionMode {
    pub fn tracks_departures(&self) -> bool {
        matches!(self, ExtractionMode::ArrivalDeparture)
    }
}

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = AisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "snappy" => Ok(CompressionAlgorithm::Snappy),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "none" | "uncompressed" => Ok(CompressionAlgorithm::Uncompressed),
            other => Err(AisError::configuration(format!(
                "unknown compression '{other}' (expected snappy, zstd, lz4 or none)"
            ))),
        }
    }
}

/// Global configuration for a visit extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Degrees added to every port rectangle edge
    pub tolerance_degrees: f64,

    /// Maximum position reports per batch
    pub max_batch_size: usize,

    /// Archives processed concurrently
    pub workers: usize,

    pub extraction_mode: ExtractionMode,

    /// Keep visits resolved to the fallback region in the written table
    pub include_unknown: bool,

    pub compression: CompressionAlgorithm,

    /// Draw progress bars
    pub show_progress: bool,

    /// Memory usage fraction above which worker count is halved
    pub memory_threshold: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            tolerance_degrees: DEFAULT_TOLERANCE_DEGREES,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            workers: DEFAULT_WORKERS.min(num_cpus::get()).max(1),
            extraction_mode: ExtractionMode::default(),
            include_unknown: false,
            compression: CompressionAlgorithm::default(),
            show_progress: true,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
        }
    }
}

impl ProcessorConfig {
    /// Create configuration with custom tolerance
    pub fn with_tolerance(mut self, tolerance_degrees: f64) -> Self {
        self.tolerance_degrees = tolerance_degrees;
        self
    }

    /// Create configuration with custom batch size
    pub fn with_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Create configuration with custom worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_extraction_mode(mut self, mode: ExtractionMode) -> Self {
        self.extraction_mode = mode;
        self
    }

    pub fn with_include_unknown(mut self, include_unknown: bool) -> Self {
        self.include_unknown = include_unknown;
        self
    }

    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    /// Disable progress bars (tests, non-interactive runs)
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Check values the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_degrees.is_finite() || self.tolerance_degrees < 0.0 {
            return Err(AisError::configuration(format!(
                "tolerance_degrees must be a finite value >= 0, got {}",
                self.tolerance_degrees
            )));
        }
        if self.max_batch_size == 0 {
            return Err(AisError::configuration("max_batch_size must be positive"));
        }
        if self.workers == 0 {
            return Err(AisError::configuration("workers must be positive"));
        }
        if !(self.memory_threshold > 0.0 && self.memory_threshold <= 1.0) {
            return Err(AisError::configuration(format!(
                "memory_threshold must be in (0, 1], got {}",
                self.memory_threshold
            )));
        }
        Ok(())
    }
}
