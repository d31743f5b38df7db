//! Parquet output for visit tables

use crate::config::CompressionAlgorithm;
use crate::error::Result;
use crate::models::VisitTable;

use polars::prelude::ParquetWriter as PolarsParquetWriter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes a visit table to a single Parquet file
#[derive(Debug)]
pub struct VisitWriter {
    output_path: PathBuf,
    compression: CompressionAlgorithm,
}

impl VisitWriter {
    pub fn new(output_path: impl Into<PathBuf>, compression: CompressionAlgorithm) -> Self {
        Self {
            output_path: output_path.into(),
            compression,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write the table, creating parent directories; returns rows written
    pub fn write(&self, visits: &VisitTable) -> Result<usize> {
        if let Some(parent) = self.output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut df = visits.to_frame()?;
        let file = fs::File::create(&self.output_path)?;
        PolarsParquetWriter::new(file)
            .with_compression(self.compression.to_polars_compression())
            .finish(&mut df)?;

        debug!(
            "Wrote {} visits to {}",
            df.height(),
            self.output_path.display()
        );

        Ok(df.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VisitRecord;
    use chrono::{TimeZone, Utc};
    use polars::prelude::{ParquetReader, SerReader};
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out").join("visits.parquet");

        let table = VisitTable::from_records(vec![
            VisitRecord {
                mmsi: 367_000_001,
                region: "Houston".to_string(),
                arrival: Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap(),
                departure: Some(Utc.with_ymd_and_hms(2020, 1, 2, 6, 0, 0).unwrap()),
            },
            VisitRecord {
                mmsi: 367_000_002,
                region: "Mobile".to_string(),
                arrival: Utc.with_ymd_and_hms(2020, 1, 1, 7, 0, 0).unwrap(),
                departure: None,
            },
        ]);

        let writer = VisitWriter::new(&output, CompressionAlgorithm::Zstd);
        assert_eq!(writer.write(&table).unwrap(), 2);
        assert!(output.exists());

        let read_back = ParquetReader::new(fs::File::open(&output).unwrap())
            .finish()
            .unwrap();
        assert_eq!(read_back.height(), 2);
        assert_eq!(
            read_back.column("MMSI").unwrap().i64().unwrap().get(1),
            Some(367_000_002)
        );
        assert_eq!(read_back.column("DepartureTime").unwrap().null_count(), 1);
    }

    #[test]
    fn test_write_empty_table() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("empty.parquet");

        let writer = VisitWriter::new(&output, CompressionAlgorithm::Snappy);
        assert_eq!(writer.write(&VisitTable::new()).unwrap(), 0);
        assert!(output.exists());
    }
}
