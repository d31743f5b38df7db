//! Error handling for AIS processing operations.
//!
//! Provides error types with context for archive reading, schema
//! validation, region catalog construction and run configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive not found at path: {path}")]
    ArchiveNotFound { path: PathBuf },

    #[error("Schema mismatch in {unit}: missing required columns [{}]", missing.join(", "))]
    SchemaMismatch { unit: String, missing: Vec<String> },

    #[error("Column '{column}' has unsupported type {dtype}")]
    InvalidColumnType { column: String, dtype: String },

    #[error("Invalid region '{name}': {reason}")]
    InvalidRegion { name: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing failed for archive: {archive} - {reason}")]
    ProcessingFailed { archive: String, reason: String },

    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

impl AisError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a schema mismatch error for a named unit of work
    pub fn schema_mismatch(unit: impl Into<String>, missing: Vec<String>) -> Self {
        Self::SchemaMismatch {
            unit: unit.into(),
            missing,
        }
    }

    /// Create a processing interrupted error
    pub fn processing_interrupted(reason: impl Into<String>) -> Self {
        Self::ProcessingInterrupted {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AisError>;
