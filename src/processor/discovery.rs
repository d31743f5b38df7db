//! Archive discovery module for AIS position report directories
//!
//! Finds the CSV archives in an input directory, optionally restricted to a
//! date window, and returns them in the fixed order a run processes them.

use crate::constants::{ARCHIVE_DATE_PATTERN, ARCHIVE_EXTENSION};
use crate::error::{AisError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Archive discovery component
#[derive(Debug)]
pub struct ArchiveDiscovery {
    input_dir: PathBuf,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    date_pattern: Regex,
}

impl ArchiveDiscovery {
    /// Create a new archive discovery instance
    pub fn new(input_dir: impl Into<PathBuf>) -> Result<Self> {
        let date_pattern = Regex::new(ARCHIVE_DATE_PATTERN)
            .map_err(|e| AisError::configuration(format!("invalid archive pattern: {e}")))?;
        Ok(Self {
            input_dir: input_dir.into(),
            start: None,
            end: None,
            date_pattern,
        })
    }

    /// Keep only archives dated within `[start, end]` (either bound optional)
    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    fn has_date_bounds(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Discover archives directly inside the input directory, sorted by file name.
    ///
    /// With a date window, archives whose name carries no `AIS_YYYY_MM_DD`
    /// date are left out.
    pub fn discover_archives(&self) -> Result<Vec<PathBuf>> {
        if !self.input_dir.is_dir() {
            return Err(AisError::ArchiveNotFound {
                path: self.input_dir.clone(),
            });
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(AisError::configuration(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }

        debug!("Searching for archives in: {}", self.input_dir.display());

        let mut archives = Vec::new();
        for entry in WalkDir::new(&self.input_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| AisError::Io(e.into()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_archive_file(path) {
                continue;
            }
            if self.in_window(path) {
                archives.push(path.to_path_buf());
            }
        }

        archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!("Found {} archives", archives.len());

        Ok(archives)
    }

    fn in_window(&self, path: &Path) -> bool {
        if !self.has_date_bounds() {
            return true;
        }
        match self.archive_date(path) {
            Some(date) => {
                self.start.is_none_or(|start| date >= start)
                    && self.end.is_none_or(|end| date <= end)
            }
            None => false,
        }
    }

    /// Date embedded in an archive file name such as `AIS_2020_01_31.csv`
    pub fn archive_date(&self, path: &Path) -> Option<NaiveDate> {
        let name = path.file_name()?.to_str()?;
        let captures = self.date_pattern.captures(name)?;
        let year = captures.get(1)?.as_str().parse().ok()?;
        let month = captures.get(2)?.as_str().parse().ok()?;
        let day = captures.get(3)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Check if a path is an archive file
fn is_archive_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Helper to create an input directory with a mix of archives
    fn create_input_dir(temp_dir: &TempDir) -> PathBuf {
        let input = temp_dir.path().join("ais");
        fs::create_dir_all(input.join("nested")).unwrap();

        for name in [
            "AIS_2020_01_03.csv",
            "AIS_2020_01_01.csv",
            "AIS_2020_01_02.csv",
            "AIS_2020_02_30.csv",
            "harbour_sample.csv",
            "notes.txt",
        ] {
            fs::write(input.join(name), "MMSI\n").unwrap();
        }
        fs::write(input.join("nested").join("AIS_2020_01_04.csv"), "MMSI\n").unwrap();

        input
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_discover_sorted_csv_archives() {
        let temp_dir = TempDir::new().unwrap();
        let discovery = ArchiveDiscovery::new(create_input_dir(&temp_dir)).unwrap();

        let archives = discovery.discover_archives().unwrap();
        assert_eq!(
            names(&archives),
            vec![
                "AIS_2020_01_01.csv",
                "AIS_2020_01_02.csv",
                "AIS_2020_01_03.csv",
                "AIS_2020_02_30.csv",
                "harbour_sample.csv",
            ]
        );
    }

    #[test]
    fn test_date_window_is_inclusive() {
        let temp_dir = TempDir::new().unwrap();
        let discovery = ArchiveDiscovery::new(create_input_dir(&temp_dir))
            .unwrap()
            .with_date_range(Some(date(2020, 1, 2)), Some(date(2020, 1, 3)));

        let archives = discovery.discover_archives().unwrap();
        assert_eq!(names(&archives), vec!["AIS_2020_01_02.csv", "AIS_2020_01_03.csv"]);
    }

    #[test]
    fn test_open_ended_window() {
        let temp_dir = TempDir::new().unwrap();
        let discovery = ArchiveDiscovery::new(create_input_dir(&temp_dir))
            .unwrap()
            .with_date_range(None, Some(date(2020, 1, 1)));

        let archives = discovery.discover_archives().unwrap();
        assert_eq!(names(&archives), vec!["AIS_2020_01_01.csv"]);
    }

    #[test]
    fn test_archive_date_parsing() {
        let discovery = ArchiveDiscovery::new("unused").unwrap();
        assert_eq!(
            discovery.archive_date(Path::new("/data/AIS_2020_12_31.csv")),
            Some(date(2020, 12, 31))
        );
        assert_eq!(discovery.archive_date(Path::new("AIS_2020_02_30.csv")), None);
        assert_eq!(discovery.archive_date(Path::new("harbour_sample.csv")), None);
    }

    #[test]
    fn test_missing_input_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let result = ArchiveDiscovery::new(missing.clone())
            .unwrap()
            .discover_archives();

        match result.unwrap_err() {
            AisError::ArchiveNotFound { path } => assert_eq!(path, missing),
            other => panic!("Expected ArchiveNotFound error, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let discovery = ArchiveDiscovery::new(create_input_dir(&temp_dir))
            .unwrap()
            .with_date_range(Some(date(2020, 2, 1)), Some(date(2020, 1, 1)));
        assert!(matches!(
            discovery.discover_archives(),
            Err(AisError::Configuration { .. })
        ));
    }

    #[test]
    fn test_is_archive_file() {
        assert!(is_archive_file(Path::new("AIS_2020_01_01.csv")));
        assert!(!is_archive_file(Path::new("AIS_2020_01_01.zip")));
        assert!(!is_archive_file(Path::new("test.CSV"))); // Case sensitive
    }
}
