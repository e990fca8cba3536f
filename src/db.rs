// 🗄️ SQLite Job Store - files, jobs, cleaned rows and statistics
//
// Rows and statistics are stored as JSON text; job ids and file ids are UUIDs.

use crate::config::CleaningSettings;
use crate::data_quality::CleaningStatistics;
use crate::jobs::{Job, JobStatus, JobStore};
use crate::record::{Record, Table};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct SqliteJobStore {
    conn: Connection,
}

impl SqliteJobStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteJobStore { conn })
    }

    /// Register an uploaded file and return its id
    pub fn register_file(&mut self, path: &Path) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let original_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        self.conn.execute(
            "INSERT INTO files (id, path, original_name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, path.to_string_lossy(), original_name, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    pub fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, file_id, status, progress, current_step, settings,
                        created_at, updated_at, completed_at
                 FROM jobs WHERE id = ?1",
                params![job_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, Option<String>>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            id,
            file_id,
            status,
            progress,
            current_step,
            settings,
            created,
            updated,
            completed,
        )) = row
        else {
            return Ok(None);
        };

        let settings: CleaningSettings =
            serde_json::from_str(&settings).context("Corrupt job settings")?;
        let status =
            JobStatus::parse(&status).ok_or_else(|| anyhow!("Unknown job status: {}", status))?;

        Ok(Some(Job {
            id,
            file_id,
            status,
            progress,
            current_step,
            settings,
            created_at: parse_timestamp(&created)?,
            updated_at: parse_timestamp(&updated)?,
            completed_at: completed.as_deref().map(parse_timestamp).transpose()?,
        }))
    }

    /// Jobs created for one file, oldest first
    pub fn list_jobs(&self, file_id: &str) -> Result<Vec<Job>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM jobs WHERE file_id = ?1 ORDER BY created_at, rowid")?;
        let ids = stmt
            .query_map(params![file_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = self.get_job(&id)? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    pub fn get_statistics(&self, job_id: &str) -> Result<Option<CleaningStatistics>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM statistics WHERE job_id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|json| serde_json::from_str(&json).context("Corrupt statistics"))
            .transpose()
    }

    /// Cleaned table of a job, rows in original order
    pub fn get_results(&self, job_id: &str) -> Result<Option<Table>> {
        let columns: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT result_columns FROM jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(Some(columns)) = columns else {
            return Ok(None);
        };
        let columns: Vec<String> =
            serde_json::from_str(&columns).context("Corrupt result columns")?;

        let mut stmt = self
            .conn
            .prepare("SELECT data FROM results WHERE job_id = ?1 ORDER BY row_index")?;
        let rows = stmt
            .query_map(params![job_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let records = rows
            .iter()
            .map(|json| serde_json::from_str::<Record>(json).context("Corrupt result row"))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Table::new(columns, records)?))
    }

    fn ensure_job(&self, job_id: &str) -> Result<()> {
        let exists: Option<String> = self
            .conn
            .query_row("SELECT status FROM jobs WHERE id = ?1", params![job_id], |row| row.get(0))
            .optional()?;

        match exists.as_deref().and_then(JobStatus::parse) {
            Some(status) if status.is_terminal() => {
                bail!("Job {} is already {}", job_id, status.as_str())
            }
            Some(_) => Ok(()),
            None => bail!("Unknown job: {}", job_id),
        }
    }
}

impl JobStore for SqliteJobStore {
    fn get_file_path(&self, file_id: &str) -> Result<PathBuf> {
        let path: Option<String> = self
            .conn
            .query_row("SELECT path FROM files WHERE id = ?1", params![file_id], |row| row.get(0))
            .optional()?;

        path.map(PathBuf::from)
            .ok_or_else(|| anyhow!("Unknown file: {}", file_id))
    }

    fn create_job(&mut self, file_id: &str, settings: &CleaningSettings) -> Result<String> {
        let job = Job::new(file_id, settings);
        self.conn.execute(
            "INSERT INTO jobs (id, file_id, status, progress, current_step, settings, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job.id,
                job.file_id,
                job.status.as_str(),
                job.progress,
                job.current_step,
                serde_json::to_string(&job.settings)?,
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(job.id)
    }

    fn update_job_progress(
        &mut self,
        job_id: &str,
        fraction: f64,
        label: &str,
        status: JobStatus,
    ) -> Result<()> {
        self.ensure_job(job_id)?;
        self.conn.execute(
            "UPDATE jobs SET progress = ?2, current_step = ?3, status = ?4, updated_at = ?5
             WHERE id = ?1",
            params![job_id, fraction, label, status.as_str(), Utc::now().to_rfc3339()],
        )?;
        debug!(job_id = %job_id, fraction, label, "progress stored");
        Ok(())
    }

    fn save_results(&mut self, job_id: &str, table: &Table) -> Result<()> {
        self.ensure_job(job_id)?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM results WHERE job_id = ?1", params![job_id])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO results (job_id, row_index, data) VALUES (?1, ?2, ?3)")?;
            for (index, row) in table.rows.iter().enumerate() {
                stmt.execute(params![job_id, index as i64, serde_json::to_string(row)?])?;
            }
        }
        tx.execute(
            "UPDATE jobs SET result_columns = ?2 WHERE id = ?1",
            params![job_id, serde_json::to_string(&table.columns)?],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn save_statistics(&mut self, job_id: &str, statistics: &CleaningStatistics) -> Result<()> {
        self.ensure_job(job_id)?;
        self.conn.execute(
            "INSERT INTO statistics (job_id, data) VALUES (?1, ?2)
             ON CONFLICT(job_id) DO UPDATE SET data = excluded.data",
            params![job_id, serde_json::to_string(statistics)?],
        )?;
        Ok(())
    }

    fn complete_job(&mut self, job_id: &str) -> Result<()> {
        self.ensure_job(job_id)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE jobs SET status = ?2, progress = 1.0, current_step = 'Completed',
                    updated_at = ?3, completed_at = ?3
             WHERE id = ?1",
            params![job_id, JobStatus::Completed.as_str(), now],
        )?;
        Ok(())
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for concurrent readers while a job is writing progress
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            original_name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            file_id TEXT NOT NULL,
            status TEXT NOT NULL,
            progress REAL NOT NULL DEFAULT 0,
            current_step TEXT NOT NULL,
            settings TEXT NOT NULL,
            result_columns TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS results (
            job_id TEXT NOT NULL,
            row_index INTEGER NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (job_id, row_index)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS statistics (
            job_id TEXT PRIMARY KEY,
            data TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_jobs_file ON jobs(file_id)",
        [],
    )?;

    Ok(())
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("Invalid timestamp: {}", text))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn store() -> SqliteJobStore {
        SqliteJobStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_file_registration() {
        let mut store = store();
        let id = store.register_file(Path::new("/data/contacts.csv")).unwrap();

        assert_eq!(store.get_file_path(&id).unwrap(), PathBuf::from("/data/contacts.csv"));
        assert!(store.get_file_path("nope").is_err());
    }

    #[test]
    fn test_job_lifecycle() {
        let mut store = store();
        let settings = CleaningSettings::all_stages();
        let id = store.create_job("file-1", &settings).unwrap();

        let job = store.get_job(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.settings, settings);

        store
            .update_job_progress(&id, 0.4, "Cleaning emails", JobStatus::Processing)
            .unwrap();
        let job = store.get_job(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.current_step, "Cleaning emails");
        assert!((job.progress - 0.4).abs() < 1e-9);

        store.complete_job(&id).unwrap();
        let job = store.get_job(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
        assert!(job.completed_at.is_some());

        // Terminal jobs take no further updates
        assert!(store
            .update_job_progress(&id, 0.5, "late", JobStatus::Processing)
            .is_err());
        assert!(store.get_job("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_jobs_by_file() {
        let mut store = store();
        let first = store.create_job("file-1", &CleaningSettings::default()).unwrap();
        let second = store.create_job("file-1", &CleaningSettings::default()).unwrap();
        store.create_job("file-2", &CleaningSettings::default()).unwrap();

        let ids: Vec<String> = store
            .list_jobs("file-1")
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec![first, second]);
        assert!(store.list_jobs("file-3").unwrap().is_empty());
    }

    #[test]
    fn test_results_round_trip_keeps_order() {
        let mut store = store();
        let id = store.create_job("file-1", &CleaningSettings::default()).unwrap();

        let rows = vec![
            Record::new().with("phone", "0501234567").with("is_duplicate", false),
            Record::new().with("phone", Value::Null).with("is_duplicate", true),
        ];
        let table = Table::new(vec!["phone".into(), "is_duplicate".into()], rows).unwrap();
        store.save_results(&id, &table).unwrap();

        let loaded = store.get_results(&id).unwrap().unwrap();
        assert_eq!(loaded.columns, table.columns);
        assert_eq!(loaded.rows, table.rows);

        assert!(store.get_results("missing").unwrap().is_none());
    }

    #[test]
    fn test_statistics_are_replaced() {
        let mut store = store();
        let id = store.create_job("file-1", &CleaningSettings::default()).unwrap();
        let table = Table::default();

        let first = CleaningStatistics::collect(3, &table, &[], Utc::now());
        store.save_statistics(&id, &first).unwrap();
        let second = CleaningStatistics::collect(7, &table, &[], Utc::now());
        store.save_statistics(&id, &second).unwrap();

        let loaded = store.get_statistics(&id).unwrap().unwrap();
        assert_eq!(loaded.total_rows, 7);
        assert!(store.get_statistics("missing").unwrap().is_none());
    }

    #[test]
    fn test_unknown_job_is_rejected() {
        let mut store = store();
        assert!(store.save_results("missing", &Table::default()).is_err());
        assert!(store.complete_job("missing").is_err());
    }
}
