//! Stale-but-available snapshot cache for dashboard refreshes.
//!
//! A refresh either replaces the whole snapshot or leaves the previous one
//! untouched. A newer refresh supersedes any older one still in flight.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use discharge_core::{
    aggregate, DashboardMetrics, FacilityDirectory, PatientPredictionRecord, PipelineConfig,
};
use serde::Serialize;
use serde_json::Value;

use crate::{process_admissions_value, AdmissionSource, FetchError, MalformedRecord};

/// Everything the dashboard shows for one successful sync.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineSnapshot {
    pub synced_at: DateTime<Utc>,
    pub records: Vec<PatientPredictionRecord>,
    pub skipped: usize,
    pub issues: Vec<MalformedRecord>,
    pub metrics: DashboardMetrics,
}

/// Last failed sync, kept until the next successful one.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncFailure {
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Handle for one refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Updated { records: usize, skipped: usize },
    /// Fetch failed; the previous snapshot (if any) is still shown.
    Stale { message: String },
    /// A newer refresh started before this one completed.
    Superseded,
}

pub struct SnapshotCache {
    config: PipelineConfig,
    directory: FacilityDirectory,
    snapshot: Option<Arc<PipelineSnapshot>>,
    last_error: Option<SyncFailure>,
    generation: u64,
}

impl SnapshotCache {
    pub fn new(config: PipelineConfig, directory: FacilityDirectory) -> Self {
        Self {
            config,
            directory,
            snapshot: None,
            last_error: None,
            generation: 0,
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<PipelineSnapshot>> {
        self.snapshot.as_ref()
    }

    pub fn last_successful_sync(&self) -> Option<DateTime<Utc>> {
        self.snapshot.as_ref().map(|snapshot| snapshot.synced_at)
    }

    pub fn last_error(&self) -> Option<&SyncFailure> {
        self.last_error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    /// Start a refresh; any ticket handed out earlier becomes stale.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        RefreshTicket {
            generation: self.generation,
        }
    }

    /// Apply the result of a fetch started with `ticket`.
    pub fn complete(
        &mut self,
        ticket: RefreshTicket,
        fetched: Result<Value, FetchError>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        if ticket.generation != self.generation {
            log::debug!(
                "Dropping refresh #{} superseded by #{}",
                ticket.generation,
                self.generation
            );
            return RefreshOutcome::Superseded;
        }

        let processed = fetched
            .map_err(|err| err.to_string())
            .and_then(|payload| {
                process_admissions_value(&payload, &self.config).map_err(|err| err.to_string())
            });

        match processed {
            Ok(batch) => {
                let metrics = aggregate(&batch.records, &self.directory);
                let outcome = RefreshOutcome::Updated {
                    records: batch.records.len(),
                    skipped: batch.skipped,
                };
                self.snapshot = Some(Arc::new(PipelineSnapshot {
                    synced_at: now,
                    records: batch.records,
                    skipped: batch.skipped,
                    issues: batch.issues,
                    metrics,
                }));
                self.last_error = None;
                outcome
            }
            Err(error) => {
                log::warn!("Sync failed, keeping previous snapshot: {error}");
                self.last_error = Some(SyncFailure {
                    error,
                    failed_at: now,
                });
                RefreshOutcome::Stale {
                    message: self.stale_message().unwrap_or_default(),
                }
            }
        }
    }

    /// Fetch from `source` and apply the result in one step.
    pub fn refresh(&mut self, source: &dyn AdmissionSource, now: DateTime<Utc>) -> RefreshOutcome {
        let ticket = self.begin_refresh();
        log::info!("Refreshing admissions from {}", source.describe());
        let fetched = source.fetch();
        self.complete(ticket, fetched, now)
    }

    /// User-facing banner text while the last sync is failing.
    pub fn stale_message(&self) -> Option<String> {
        self.last_error.as_ref()?;
        Some(match self.last_successful_sync() {
            Some(at) => format!(
                "sync failed, showing last known data as of {}",
                at.to_rfc3339()
            ),
            None => "sync failed, no data has been loaded yet".to_string(),
        })
    }
}
