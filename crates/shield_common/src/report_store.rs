//! Report archive backed by SQLite.
//!
//! Append-only: a stored body never changes. Re-appending identical content
//! is a no-op and different content under a known id is refused. Reads go
//! back through the report contract, so a replayed report passes the same
//! checks as a freshly generated one.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use shield_shared::contract::ReportContract;
use shield_shared::error::{ShieldError, ShieldResult};
use shield_shared::report::{ArchiveSummary, StructuredReport};
use shield_shared::scenarios;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

fn storage_err(e: impl std::fmt::Display) -> ShieldError {
    ShieldError::Storage(e.to_string())
}

/// Shareable handle; clones point at the same connection
#[derive(Clone)]
pub struct ReportStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl ReportStore {
    /// Open or create the archive at `path`
    pub fn open(path: &Path) -> ShieldResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    storage_err(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| storage_err(format!("cannot open {}: {}", path.display(), e)))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> ShieldResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> ShieldResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ShieldError::Internal("report store lock poisoned".to_string()))
    }

    fn init_schema(&self) -> ShieldResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                body TEXT NOT NULL
            )
            "#,
            [],
        )
        .map_err(storage_err)?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reports_created ON reports(created_at_ms)",
            [],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    /// Archive a report; returns its id
    pub fn append(&self, report: &StructuredReport) -> ShieldResult<String> {
        self.insert(report).map(|_| report.id().to_string())
    }

    /// Returns true when a new row was written
    fn insert(&self, report: &StructuredReport) -> ShieldResult<bool> {
        let body = serde_json::to_string(&report.to_json())
            .map_err(|e| ShieldError::Internal(format!("cannot serialize report: {}", e)))?;
        let conn = self.lock()?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT body FROM reports WHERE id = ?1",
                params![report.id()],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err)?;

        match existing {
            Some(stored) if stored == body => {
                tracing::debug!("Report {} already archived", report.id());
                Ok(false)
            }
            Some(_) => Err(ShieldError::Storage(format!(
                "report {} is already archived with different content",
                report.id()
            ))),
            None => {
                conn.execute(
                    "INSERT INTO reports (id, title, created_at_ms, body) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        report.id(),
                        report.title(),
                        report.created_at().timestamp_millis(),
                        body
                    ],
                )
                .map_err(storage_err)?;
                tracing::info!("Archived report {} ({})", report.id(), report.title());
                Ok(true)
            }
        }
    }

    /// Replay an archived report
    pub fn get(&self, id: &str) -> ShieldResult<StructuredReport> {
        let body: Option<String> = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT body FROM reports WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err)?
        };
        let body = body.ok_or_else(|| ShieldError::NotFound(format!("report '{}'", id)))?;
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| storage_err(format!("stored report {} is corrupt: {}", id, e)))?;
        Ok(ReportContract::validate(&value)?)
    }

    /// Archive listing, newest first
    pub fn list(&self) -> ShieldResult<Vec<ArchiveSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, created_at_ms FROM reports ORDER BY created_at_ms DESC, seq DESC",
            )
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(storage_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (id, title, ms) = row.map_err(storage_err)?;
            let date: DateTime<Utc> = DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| storage_err(format!("report {} has an invalid date", id)))?;
            out.push(ArchiveSummary { id, title, date });
        }
        Ok(out)
    }

    pub fn len(&self) -> ShieldResult<usize> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))
            .map_err(storage_err)?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> ShieldResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Archive the canned scenarios; returns how many were new
    pub fn seed_scenarios(&self) -> ShieldResult<usize> {
        let mut added = 0;
        for report in scenarios::all()? {
            if self.insert(&report)? {
                added += 1;
            }
        }
        Ok(added)
    }
}
