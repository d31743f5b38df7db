//! Chunked archive processing engine.
//!
//! Drives every archive of a run through the batch pipeline
//! (filter → port annotation → visit extraction) and merges the partial
//! visit tables into one deduplicated table. Archives are handed to blocking
//! worker threads, but results are folded strictly in archive-name order, so
//! the first-encountered visit per vessel is the same whichever worker
//! finishes first.

pub mod discovery;
pub mod extractor;
pub mod filter;
pub mod resolver;
pub mod source;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::discovery::ArchiveDiscovery;
use self::extractor::extract_visits;
use self::filter::filter_reports;
use self::resolver::annotate_ports;
use self::source::{ArchiveSource, CsvArchive};
use self::writer::VisitWriter;

use crate::config::ProcessorConfig;
use crate::error::{AisError, Result};
use crate::models::{ProcessingStats, RunReport, SkippedUnit, VisitRecord, VisitTable};
use crate::regions::RegionCatalog;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::DataFrame;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::System;
use tokio::sync::Mutex;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of running the pipeline over one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub rows_in: usize,
    pub rows_retained: usize,
    pub visits: Vec<VisitRecord>,
}

/// Filter, annotate and extract one in-memory batch
pub fn process_batch(
    batch: DataFrame,
    unit: &str,
    catalog: &RegionCatalog,
    config: &ProcessorConfig,
) -> Result<BatchResult> {
    let rows_in = batch.height();
    let filtered = filter_reports(batch, unit)?;
    let rows_retained = filtered.height();

    if rows_retained == 0 {
        return Ok(BatchResult {
            rows_in,
            rows_retained,
            visits: Vec::new(),
        });
    }

    let annotated = annotate_ports(filtered, catalog, config.tolerance_degrees)?;
    let visits = extract_visits(&annotated, catalog.fallback(), config.extraction_mode)?;

    Ok(BatchResult {
        rows_in,
        rows_retained,
        visits,
    })
}

/// Everything one archive contributed to a run
#[derive(Debug, Default)]
struct ArchiveOutcome {
    visits: VisitTable,
    stats: ProcessingStats,
    skipped: Vec<SkippedUnit>,
}

/// Process every batch of one archive, isolating batch failures.
///
/// Returns `Err` only when the run was cancelled.
fn process_archive(
    mut archive: Box<dyn ArchiveSource>,
    catalog: &RegionCatalog,
    config: &ProcessorConfig,
    cancel: &CancellationToken,
) -> Result<ArchiveOutcome> {
    let name = archive.name().to_string();
    let mut outcome = ArchiveOutcome::default();
    let mut batch_index = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(AisError::processing_interrupted(format!(
                "cancelled while reading {name}"
            )));
        }

        let batch = match archive.next_batch(config.max_batch_size) {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(e) => {
                // Nothing after a read failure can be trusted; the rest of the archive is lost
                warn!("Failed to read {} at batch {}: {}", name, batch_index, e);
                outcome.skipped.push(SkippedUnit {
                    archive: name.clone(),
                    batch: (batch_index > 0).then_some(batch_index),
                    cause: e.to_string(),
                });
                if batch_index == 0 {
                    outcome.stats.archives_failed = 1;
                    return Ok(outcome);
                }
                break;
            }
        };

        let unit = format!("{name} batch {batch_index}");
        let rows = batch.height();

        match process_batch(batch, &unit, catalog, config) {
            Ok(result) => {
                debug!(
                    "{}: {} rows, {} retained, {} visits",
                    unit,
                    result.rows_in,
                    result.rows_retained,
                    result.visits.len()
                );
                outcome.stats.batches_processed += 1;
                outcome.stats.rows_read += result.rows_in;
                outcome.stats.rows_retained += result.rows_retained;
                outcome.visits =
                    std::mem::take(&mut outcome.visits).merge(VisitTable::from_records(result.visits));
            }
            Err(e) => {
                warn!("Skipping {}: {}", unit, e);
                outcome.stats.batches_failed += 1;
                outcome.stats.rows_read += rows;
                outcome.skipped.push(SkippedUnit {
                    archive: name.clone(),
                    batch: Some(batch_index),
                    cause: e.to_string(),
                });
            }
        }

        batch_index += 1;
    }

    outcome.stats.archives_processed = 1;
    outcome.stats.visits_found = outcome.visits.len();
    Ok(outcome)
}

/// Main processor for visit extraction runs
#[derive(Debug)]
pub struct VisitProcessor {
    config: ProcessorConfig,
    catalog: Arc<RegionCatalog>,
    system_monitor: Arc<Mutex<System>>,
}

impl VisitProcessor {
    /// Create a processor; fails on an invalid configuration
    pub fn new(config: ProcessorConfig, catalog: RegionCatalog) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            system_monitor: Arc::new(Mutex::new(System::new())),
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    /// Check if system is under memory pressure
    pub async fn check_memory_pressure(&self) -> bool {
        let mut system = self.system_monitor.lock().await;
        system.refresh_memory();

        let used_memory = system.used_memory() as f64;
        let total_memory = system.total_memory() as f64;

        if total_memory == 0.0 {
            return false;
        }

        let memory_usage = used_memory / total_memory;
        let is_pressure = memory_usage > self.config.memory_threshold;

        if is_pressure {
            debug!(
                "Memory pressure detected: {:.1}% usage (threshold: {:.1}%)",
                memory_usage * 100.0,
                self.config.memory_threshold * 100.0
            );
        }

        is_pressure
    }

    /// Run the pipeline over all archives and merge their visits.
    ///
    /// Archives are ordered by name before processing; that order decides
    /// which record survives when a vessel appears in several archives.
    /// Failing archives and batches are reported in [`RunReport::skipped`].
    /// Cancellation before the last archive is merged discards all partial
    /// results and returns [`AisError::ProcessingInterrupted`].
    pub async fn process_archives(
        &self,
        mut archives: Vec<Box<dyn ArchiveSource>>,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let start_time = Instant::now();
        archives.sort_by(|a, b| a.name().cmp(b.name()));

        let mut report = RunReport::default();
        if archives.is_empty() {
            info!("No archives to process");
            return Ok(report);
        }

        let mut workers = self.config.workers.min(archives.len()).max(1);
        if self.check_memory_pressure().await {
            workers = (workers / 2).max(1);
            debug!("Memory pressure detected, reducing workers to {}", workers);
        }
        debug!("Processing {} archives with {} workers", archives.len(), workers);

        let total = archives.len();
        let progress = self.progress_bar(total as u64);

        let outcomes = stream::iter(archives)
            .map(|archive| {
                let catalog = Arc::clone(&self.catalog);
                let config = self.config.clone();
                let cancel = cancel.clone();
                let progress = progress.clone();
                let name = archive.name().to_string();
                async move {
                    progress.set_message(format!("Processing: {name}"));
                    let joined = task::spawn_blocking(move || {
                        process_archive(archive, &catalog, &config, &cancel)
                    })
                    .await;
                    progress.inc(1);
                    (name, joined)
                }
            })
            // `buffered` yields in submission order, keeping the merge deterministic
            .buffered(workers);
        let mut outcomes = pin!(outcomes);

        let mut visits = VisitTable::new();
        let mut received = 0usize;
        while let Some((name, joined)) = outcomes.next().await {
            received += 1;
            let outcome = match joined {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    progress.abandon_with_message("Cancelled");
                    return Err(e);
                }
                Err(join_error) => {
                    warn!("Worker for {} failed: {}", name, join_error);
                    report.stats.archives_failed += 1;
                    let cause = AisError::ProcessingFailed {
                        archive: name.clone(),
                        reason: join_error.to_string(),
                    };
                    report.skipped.push(SkippedUnit {
                        archive: name,
                        batch: None,
                        cause: cause.to_string(),
                    });
                    continue;
                }
            };

            debug!(
                "Merging {} visits from {} ({} skipped units)",
                outcome.visits.len(),
                name,
                outcome.skipped.len()
            );
            report.stats.absorb(&outcome.stats);
            report.skipped.extend(outcome.skipped);
            visits = visits.merge(outcome.visits);

            // A run whose last archive is already merged is complete
            if received < total && cancel.is_cancelled() {
                progress.abandon_with_message("Cancelled");
                return Err(AisError::processing_interrupted(format!(
                    "cancelled after {name}"
                )));
            }
        }

        progress.finish_with_message("All archives processed");

        report.stats.visits_found = visits.len();
        report.stats.processing_time_ms = start_time.elapsed().as_millis();
        report.visits = visits;

        info!(
            "Processed {} archives ({} failed): {} of {} reports retained, {} visits",
            report.stats.archives_processed,
            report.stats.archives_failed,
            report.stats.rows_retained,
            report.stats.rows_read,
            report.stats.visits_found
        );

        Ok(report)
    }

    /// Discover the CSV archives of a directory, extract their visits and
    /// write the table to `output_path` as Parquet.
    ///
    /// Visits in the fallback region are dropped before writing unless
    /// `include_unknown` is set.
    pub async fn process_directory(
        &self,
        input_dir: &Path,
        date_range: (Option<NaiveDate>, Option<NaiveDate>),
        output_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let (start, end) = date_range;
        let paths = ArchiveDiscovery::new(input_dir)?
            .with_date_range(start, end)
            .discover_archives()?;
        info!("Found {} archives in {}", paths.len(), input_dir.display());

        let archives: Vec<Box<dyn ArchiveSource>> = paths
            .into_iter()
            .map(|path| Box::new(CsvArchive::new(path)) as Box<dyn ArchiveSource>)
            .collect();

        let mut report = self.process_archives(archives, cancel).await?;

        if !self.config.include_unknown {
            let before = report.visits.len();
            report.visits = std::mem::take(&mut report.visits).without_region(self.catalog.fallback());
            if report.visits.len() < before {
                debug!(
                    "Dropped {} visits in region {}",
                    before - report.visits.len(),
                    self.catalog.fallback()
                );
            }
        }

        let writer = VisitWriter::new(output_path, self.config.compression);
        let written = writer.write(&report.visits)?;
        info!("Wrote {} visits to {}", written, output_path.display());
        report.output_path = Some(output_path.to_path_buf());

        Ok(report)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
