// 🗂️ Jobs - storage collaborator contract + the runner that drives one job
//
// Lifecycle: pending → processing → completed | failed
// A failed job keeps the failure message as its current step and is never
// resumed; running the same file again creates a new job.

use crate::config::CleaningSettings;
use crate::data_quality::CleaningStatistics;
use crate::loader;
use crate::pipeline::CleaningPipeline;
use crate::record::Table;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

// ============================================================================
// JOB
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(status: &str) -> Option<JobStatus> {
        match status {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub file_id: String,
    pub status: JobStatus,
    pub progress: f64,
    pub current_step: String,
    pub settings: CleaningSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(file_id: &str, settings: &CleaningSettings) -> Self {
        let now = Utc::now();
        Job {
            id: uuid::Uuid::new_v4().to_string(),
            file_id: file_id.to_string(),
            status: JobStatus::Pending,
            progress: 0.0,
            current_step: "Queued".to_string(),
            settings: settings.clone(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

// ============================================================================
// STORAGE CONTRACT
// ============================================================================

/// What the runner needs from job storage. Implementations own the
/// representation; the runner only calls these as side effects.
pub trait JobStore {
    fn get_file_path(&self, file_id: &str) -> Result<PathBuf>;

    /// Create a pending job and return its id
    fn create_job(&mut self, file_id: &str, settings: &CleaningSettings) -> Result<String>;

    fn update_job_progress(
        &mut self,
        job_id: &str,
        fraction: f64,
        label: &str,
        status: JobStatus,
    ) -> Result<()>;

    fn save_results(&mut self, job_id: &str, table: &Table) -> Result<()>;

    fn save_statistics(&mut self, job_id: &str, statistics: &CleaningStatistics) -> Result<()>;

    fn complete_job(&mut self, job_id: &str) -> Result<()>;
}

// ============================================================================
// RUNNER
// ============================================================================

#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: String,
    pub statistics: CleaningStatistics,
}

pub struct JobRunner<S: JobStore> {
    store: S,
}

impl<S: JobStore> JobRunner<S> {
    pub fn new(store: S) -> Self {
        JobRunner { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Create a job for `file_id` and run it to a terminal state
    pub fn run(&mut self, file_id: &str, settings: CleaningSettings) -> Result<JobReport> {
        let job_id = self
            .store
            .create_job(file_id, &settings)
            .with_context(|| format!("Failed to create job for file {}", file_id))?;
        info!(job_id = %job_id, file_id = %file_id, "job created");

        let mut last_fraction = 0.0;
        match self.process(&job_id, file_id, settings, &mut last_fraction) {
            Ok(statistics) => {
                self.store.complete_job(&job_id)?;
                info!(job_id = %job_id, summary = %statistics.summary(), "job completed");
                Ok(JobReport { job_id, statistics })
            }
            Err(err) => {
                let reason = format!("{:#}", err);
                error!(job_id = %job_id, error = %reason, "job failed");
                self.store
                    .update_job_progress(&job_id, last_fraction, &reason, JobStatus::Failed)
                    .context("Failed to record job failure")?;
                Err(err.context(format!("Job {} failed", job_id)))
            }
        }
    }

    fn process(
        &mut self,
        job_id: &str,
        file_id: &str,
        settings: CleaningSettings,
        last_fraction: &mut f64,
    ) -> Result<CleaningStatistics> {
        self.store
            .update_job_progress(job_id, 0.0, "Loading file", JobStatus::Processing)?;

        let path = self.store.get_file_path(file_id)?;
        let table = loader::load_table(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;

        let pipeline = CleaningPipeline::new(settings);
        let store = &mut self.store;
        let mut forward = |fraction: f64, label: &str| {
            *last_fraction = fraction;
            let stored = store.update_job_progress(job_id, fraction, label, JobStatus::Processing);
            if let Err(err) = stored {
                warn!(job_id = %job_id, error = %err, "progress update not stored");
            }
        };
        let outcome = pipeline.run(table, &mut forward)?;

        self.store.save_results(job_id, &outcome.table)?;
        self.store.save_statistics(job_id, &outcome.statistics)?;
        Ok(outcome.statistics)
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub job_id: String,
    pub fraction: f64,
    pub label: String,
    pub status: JobStatus,
}

/// HashMap-backed store for tests and one-shot CLI runs
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    files: HashMap<String, PathBuf>,
    jobs: HashMap<String, Job>,
    results: HashMap<String, Table>,
    statistics: HashMap<String, CleaningStatistics>,
    history: Vec<ProgressEvent>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_file(&mut self, path: &Path) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.files.insert(id.clone(), path.to_path_buf());
        id
    }

    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.get(job_id)
    }

    pub fn results(&self, job_id: &str) -> Option<&Table> {
        self.results.get(job_id)
    }

    pub fn statistics(&self, job_id: &str) -> Option<&CleaningStatistics> {
        self.statistics.get(job_id)
    }

    /// Every progress update in arrival order
    pub fn history(&self) -> &[ProgressEvent] {
        &self.history
    }

    fn job_mut(&mut self, job_id: &str) -> Result<&mut Job> {
        self.jobs
            .get_mut(job_id)
            .ok_or_else(|| anyhow!("Unknown job: {}", job_id))
    }
}

impl JobStore for InMemoryJobStore {
    fn get_file_path(&self, file_id: &str) -> Result<PathBuf> {
        self.files
            .get(file_id)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown file: {}", file_id))
    }

    fn create_job(&mut self, file_id: &str, settings: &CleaningSettings) -> Result<String> {
        let job = Job::new(file_id, settings);
        let id = job.id.clone();
        self.jobs.insert(id.clone(), job);
        Ok(id)
    }

    fn update_job_progress(
        &mut self,
        job_id: &str,
        fraction: f64,
        label: &str,
        status: JobStatus,
    ) -> Result<()> {
        let job = self.job_mut(job_id)?;
        if job.status.is_terminal() {
            bail!("Job {} is already {}", job_id, job.status.as_str());
        }
        job.progress = fraction;
        job.current_step = label.to_string();
        job.status = status;
        job.updated_at = Utc::now();

        self.history.push(ProgressEvent {
            job_id: job_id.to_string(),
            fraction,
            label: label.to_string(),
            status,
        });
        Ok(())
    }

    fn save_results(&mut self, job_id: &str, table: &Table) -> Result<()> {
        self.job_mut(job_id)?;
        self.results.insert(job_id.to_string(), table.clone());
        Ok(())
    }

    fn save_statistics(&mut self, job_id: &str, statistics: &CleaningStatistics) -> Result<()> {
        self.job_mut(job_id)?;
        self.statistics.insert(job_id.to_string(), statistics.clone());
        Ok(())
    }

    fn complete_job(&mut self, job_id: &str) -> Result<()> {
        let job = self.job_mut(job_id)?;
        let now = Utc::now();
        job.status = JobStatus::Completed;
        job.progress = 1.0;
        job.current_step = "Completed".to_string();
        job.updated_at = now;
        job.completed_at = Some(now);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_job_runs_to_completion() {
        let file = csv_file("phone,email\n0501234567,ali@company.com\n911,info@company.com\n");
        let mut store = InMemoryJobStore::new();
        let file_id = store.register_file(file.path());

        let mut runner = JobRunner::new(store);
        let report = runner.run(&file_id, CleaningSettings::default()).unwrap();
        assert_eq!(report.statistics.processed_rows, 2);
        assert_eq!(report.statistics.valid_phones, 1);

        let store = runner.into_store();
        let job = store.job(&report.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
        assert!(job.completed_at.is_some());

        let results = store.results(&report.job_id).unwrap();
        assert_eq!(results.rows[0].text("phone_clean"), "966501234567");
        assert!(store.statistics(&report.job_id).is_some());

        let fractions: Vec<f64> = store.history().iter().map(|e| e.fraction).collect();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert!(store
            .history()
            .iter()
            .all(|e| e.status == JobStatus::Processing));
    }

    #[test]
    fn test_unreadable_input_fails_the_job() {
        let mut store = InMemoryJobStore::new();
        let file_id = store.register_file(Path::new("/nonexistent/contacts.csv"));

        let mut runner = JobRunner::new(store);
        let err = runner.run(&file_id, CleaningSettings::default()).unwrap_err();
        assert!(err.to_string().contains("failed"));

        let store = runner.into_store();
        let event = store.history().last().unwrap();
        assert_eq!(event.status, JobStatus::Failed);
        assert!(event.label.contains("Failed to load"));

        let job = store.job(&event.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(store.results(&job.id).is_none());
    }

    #[test]
    fn test_unknown_file_fails_the_job() {
        let mut runner = JobRunner::new(InMemoryJobStore::new());
        assert!(runner.run("missing", CleaningSettings::default()).is_err());

        let event = runner.store().history().last().unwrap();
        assert_eq!(event.status, JobStatus::Failed);
        assert!(event.label.contains("Unknown file"));
    }

    #[test]
    fn test_terminal_jobs_reject_progress() {
        let mut store = InMemoryJobStore::new();
        let id = store.create_job("f", &CleaningSettings::default()).unwrap();
        store.complete_job(&id).unwrap();

        let result = store.update_job_progress(&id, 0.5, "late", JobStatus::Processing);
        assert!(result.is_err());
        assert_eq!(store.job(&id).unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn test_status_strings() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("running"), None);
    }
}
