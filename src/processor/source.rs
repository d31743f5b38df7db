//! Archive sources feeding bounded batches into the pipeline
//!
//! An archive is anything that can hand out position reports a batch at a
//! time. Two sources ship with the crate: [`CsvArchive`] streams a CSV file
//! from disk without ever holding more than one batch, and [`FrameArchive`]
//! slices in-memory polars frames.

use crate::error::{AisError, Result};
use crate::schema::{PIPELINE_COLUMNS, missing_required};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A named, sequential source of position report batches
pub trait ArchiveSource: Send {
    /// Identifier used for ordering and in failure reports
    fn name(&self) -> &str;

    /// Next batch of at most `max_rows` reports, `None` once exhausted
    fn next_batch(&mut self, max_rows: usize) -> Result<Option<DataFrame>>;
}

/// Streaming reader over a position report CSV file.
///
/// Only the pipeline columns are kept, as text; typing is left to the record
/// filter so a single bad value only costs its row. The file is opened on the
/// first call to [`ArchiveSource::next_batch`].
#[derive(Debug)]
pub struct CsvArchive {
    path: PathBuf,
    name: String,
    reader: Option<CsvBatchReader>,
}

#[derive(Debug)]
struct CsvBatchReader {
    records: csv::Reader<File>,
    /// (column name, field index) for each pipeline column in the header
    layout: Vec<(&'static str, usize)>,
    exhausted: bool,
}

impl CsvArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            reader: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<CsvBatchReader> {
        if !self.path.exists() {
            return Err(AisError::ArchiveNotFound {
                path: self.path.clone(),
            });
        }

        let mut records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let headers = records.headers()?.clone();
        let header_names: Vec<&str> = headers.iter().map(str::trim).collect();

        let missing = missing_required(header_names.iter().copied());
        if !missing.is_empty() {
            return Err(AisError::schema_mismatch(&self.name, missing));
        }

        let layout = PIPELINE_COLUMNS
            .iter()
            .filter_map(|&column| {
                header_names
                    .iter()
                    .position(|&header| header == column)
                    .map(|index| (column, index))
            })
            .collect();

        debug!("Opened archive {} with layout {:?}", self.name, layout);

        Ok(CsvBatchReader {
            records,
            layout,
            exhausted: false,
        })
    }
}

impl ArchiveSource for CsvArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_batch(&mut self, max_rows: usize) -> Result<Option<DataFrame>> {
        if self.reader.is_none() {
            self.reader = Some(self.open()?);
        }
        match self.reader.as_mut() {
            Some(reader) => reader.read_batch(max_rows),
            None => Ok(None),
        }
    }
}

impl CsvBatchReader {
    fn read_batch(&mut self, max_rows: usize) -> Result<Option<DataFrame>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut values: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(max_rows.min(8192)); self.layout.len()];
        let mut record = csv::ByteRecord::new();
        let mut rows = 0;

        while rows < max_rows {
            if !self.records.read_byte_record(&mut record)? {
                self.exhausted = true;
                break;
            }
            for (column, &(_, index)) in values.iter_mut().zip(&self.layout) {
                column.push(field_text(record.get(index)));
            }
            rows += 1;
        }

        if rows == 0 {
            return Ok(None);
        }

        let columns = self
            .layout
            .iter()
            .zip(values)
            .map(|(&(name, _), column)| Column::new(name.into(), column))
            .collect();

        Ok(Some(DataFrame::new(columns)?))
    }
}

/// Non-empty UTF-8 field text; short rows and invalid bytes read as missing
fn field_text(field: Option<&[u8]>) -> Option<String> {
    let text = std::str::from_utf8(field?).ok()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// In-memory archive over one or more polars frames.
///
/// Frames are served in order, each sliced into batches of at most
/// `max_rows`; a batch never spans two frames.
#[derive(Debug, Clone)]
pub struct FrameArchive {
    name: String,
    frames: Vec<DataFrame>,
    frame_index: usize,
    offset: usize,
}

impl FrameArchive {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self::from_frames(name, vec![frame])
    }

    pub fn from_frames(name: impl Into<String>, frames: Vec<DataFrame>) -> Self {
        Self {
            name: name.into(),
            frames,
            frame_index: 0,
            offset: 0,
        }
    }
}

impl ArchiveSource for FrameArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_batch(&mut self, max_rows: usize) -> Result<Option<DataFrame>> {
        while let Some(frame) = self.frames.get(self.frame_index) {
            if self.offset < frame.height() {
                let batch = frame.slice(self.offset as i64, max_rows);
                self.offset += batch.height();
                return Ok(Some(batch));
            }
            self.frame_index += 1;
            self.offset = 0;
        }
        Ok(None)
    }
}
