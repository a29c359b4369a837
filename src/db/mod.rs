use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;

use crate::models::{MonitorSession, PostureReading, SessionStatus};
use crate::monitor::PostureStatus;
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn session_status_from_str(value: &str) -> Result<SessionStatus> {
    match value {
        "Running" => Ok(SessionStatus::Running),
        "Completed" => Ok(SessionStatus::Completed),
        "Cancelled" => Ok(SessionStatus::Cancelled),
        "Interrupted" => Ok(SessionStatus::Interrupted),
        _ => Err(anyhow!("unknown session status '{value}'")),
    }
}

fn posture_status_from_str(value: &str) -> Result<PostureStatus> {
    match value {
        "Good" => Ok(PostureStatus::Good),
        "Bad" => Ok(PostureStatus::Bad),
        "Unknown" => Ok(PostureStatus::Unknown),
        _ => Err(anyhow!("unknown posture status '{value}'")),
    }
}

// Raw session columns; datetime/status parsing happens outside the rusqlite
// closure so its error type stays anyhow-free.
type SessionRow = (
    String,
    String,
    Option<String>,
    String,
    Option<f32>,
    i64,
    i64,
    i64,
    String,
    String,
);

fn session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok((
        row.get("id")?,
        row.get("started_at")?,
        row.get("stopped_at")?,
        row.get("status")?,
        row.get("baseline")?,
        row.get("sample_count")?,
        row.get("bad_count")?,
        row.get("alert_count")?,
        row.get("created_at")?,
        row.get("updated_at")?,
    ))
}

fn session_from_row(raw: SessionRow) -> Result<MonitorSession> {
    let (
        id,
        started_at,
        stopped_at,
        status,
        baseline,
        sample_count,
        bad_count,
        alert_count,
        created_at,
        updated_at,
    ) = raw;

    Ok(MonitorSession {
        id,
        started_at: parse_datetime(&started_at)?,
        stopped_at: stopped_at.as_deref().map(parse_datetime).transpose()?,
        status: session_status_from_str(&status)?,
        baseline,
        sample_count: to_u64(sample_count)?,
        bad_count: to_u64(bad_count)?,
        alert_count: to_u64(alert_count)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("slouchguard-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_session(&self, session: &MonitorSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, started_at, stopped_at, status, baseline, sample_count, bad_count, alert_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    record.baseline,
                    to_i64(record.sample_count)?,
                    to_i64(record.bad_count)?,
                    to_i64(record.alert_count)?,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session")?;
            Ok(())
        })
        .await
    }

    pub async fn update_session_progress(
        &self,
        session_id: &str,
        sample_count: u64,
        bad_count: u64,
        alert_count: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET sample_count = ?1,
                     bad_count = ?2,
                     alert_count = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    to_i64(sample_count)?,
                    to_i64(bad_count)?,
                    to_i64(alert_count)?,
                    updated_at.to_rfc3339(),
                    session_id,
                ],
            )
            .with_context(|| "failed to update session progress")?;
            Ok(())
        })
        .await
    }

    pub async fn set_session_baseline(
        &self,
        session_id: &str,
        baseline: f32,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions SET baseline = ?1, updated_at = ?2 WHERE id = ?3",
                params![baseline, updated_at.to_rfc3339(), session_id],
            )
            .with_context(|| "failed to set session baseline")?;
            Ok(())
        })
        .await
    }

    pub async fn mark_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        sample_count: u64,
        bad_count: u64,
        alert_count: u64,
        stopped_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     sample_count = ?2,
                     bad_count = ?3,
                     alert_count = ?4,
                     stopped_at = ?5,
                     updated_at = ?6
                 WHERE id = ?7",
                params![
                    status.as_str(),
                    to_i64(sample_count)?,
                    to_i64(bad_count)?,
                    to_i64(alert_count)?,
                    stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    updated_at.to_rfc3339(),
                    session_id,
                ],
            )
            .with_context(|| "failed to mark session status")?;
            Ok(())
        })
        .await
    }

    /// A session still marked Running from a previous process, if any.
    pub async fn get_incomplete_session(&self) -> Result<Option<MonitorSession>> {
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, started_at, stopped_at, status, baseline, sample_count, bad_count, alert_count, created_at, updated_at
                     FROM sessions WHERE status = 'Running' ORDER BY started_at DESC LIMIT 1",
                    [],
                    session_row,
                )
                .optional()
                .with_context(|| "failed to query incomplete session")?;

            row.map(session_from_row).transpose()
        })
        .await
    }

    pub async fn mark_session_interrupted(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = 'Interrupted', stopped_at = ?1, updated_at = ?1
                 WHERE id = ?2",
                params![now.to_rfc3339(), session_id],
            )
            .with_context(|| "failed to mark session interrupted")?;
            Ok(())
        })
        .await
    }

    pub async fn list_sessions(&self) -> Result<Vec<MonitorSession>> {
        self.execute(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, started_at, stopped_at, status, baseline, sample_count, bad_count, alert_count, created_at, updated_at
                     FROM sessions ORDER BY started_at DESC",
                )
                .with_context(|| "failed to prepare session list query")?;

            let rows = stmt
                .query_map([], session_row)
                .with_context(|| "failed to query sessions")?;

            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(session_from_row(row?)?);
            }
            Ok(sessions)
        })
        .await
    }

    pub async fn insert_reading(&self, reading: &PostureReading) -> Result<()> {
        let record = reading.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO posture_readings (session_id, timestamp, shoulder_y, status, alerted)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.session_id,
                    record.timestamp.to_rfc3339(),
                    record.shoulder_y,
                    record.status.as_str(),
                    record.alerted as i64,
                ],
            )
            .with_context(|| "failed to insert posture reading")?;
            Ok(())
        })
        .await
    }

    pub async fn get_readings_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<PostureReading>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, session_id, timestamp, shoulder_y, status, alerted
                     FROM posture_readings WHERE session_id = ?1 ORDER BY timestamp ASC",
                )
                .with_context(|| "failed to prepare readings query")?;

            let rows = stmt
                .query_map(params![session_id], |row| {
                    let timestamp: String = row.get("timestamp")?;
                    let status: String = row.get("status")?;
                    let alerted: i64 = row.get("alerted")?;
                    Ok((
                        row.get::<_, Option<i64>>("id")?,
                        row.get::<_, String>("session_id")?,
                        timestamp,
                        row.get::<_, Option<f32>>("shoulder_y")?,
                        status,
                        alerted,
                    ))
                })
                .with_context(|| "failed to query readings")?;

            let mut readings = Vec::new();
            for row in rows {
                let (id, session_id, timestamp, shoulder_y, status, alerted) = row?;
                readings.push(PostureReading {
                    id,
                    session_id,
                    timestamp: parse_datetime(&timestamp)?,
                    shoulder_y,
                    status: posture_status_from_str(&status)?,
                    alerted: alerted != 0,
                });
            }
            Ok(readings)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn session(id: &str, status: SessionStatus) -> MonitorSession {
        let started = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        MonitorSession {
            id: id.to_string(),
            started_at: started,
            stopped_at: None,
            status,
            baseline: Some(204.5),
            sample_count: 0,
            bad_count: 0,
            alert_count: 0,
            created_at: started,
            updated_at: started,
        }
    }

    #[tokio::test]
    async fn session_roundtrip() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.sqlite3")).unwrap();

        db.insert_session(&session("s1", SessionStatus::Running))
            .await
            .unwrap();

        let stopped = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        db.mark_session_status("s1", SessionStatus::Completed, 120, 14, 3, Some(stopped), stopped)
            .await
            .unwrap();

        let sessions = db.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Completed);
        assert_eq!(sessions[0].sample_count, 120);
        assert_eq!(sessions[0].bad_count, 14);
        assert_eq!(sessions[0].alert_count, 3);
        assert_eq!(sessions[0].stopped_at, Some(stopped));
        assert_eq!(sessions[0].baseline, Some(204.5));
    }

    #[tokio::test]
    async fn incomplete_session_recovery() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.sqlite3")).unwrap();

        db.insert_session(&session("s1", SessionStatus::Running))
            .await
            .unwrap();

        let incomplete = db.get_incomplete_session().await.unwrap().unwrap();
        assert_eq!(incomplete.id, "s1");

        let now = Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap();
        db.mark_session_interrupted("s1", now).await.unwrap();
        assert!(db.get_incomplete_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn readings_roundtrip_in_timestamp_order() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.sqlite3")).unwrap();

        db.insert_session(&session("s1", SessionStatus::Running))
            .await
            .unwrap();

        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 1).unwrap();
        for (offset, (status, shoulder_y, alerted)) in [
            (PostureStatus::Good, Some(204.0), false),
            (PostureStatus::Bad, Some(230.0), true),
            (PostureStatus::Unknown, None, false),
        ]
        .into_iter()
        .enumerate()
        {
            db.insert_reading(&PostureReading {
                id: None,
                session_id: "s1".to_string(),
                timestamp: t0 + chrono::Duration::seconds(offset as i64),
                shoulder_y,
                status,
                alerted,
            })
            .await
            .unwrap();
        }

        let readings = db.get_readings_for_session("s1").await.unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].status, PostureStatus::Good);
        assert!(readings[1].alerted);
        assert_eq!(readings[2].shoulder_y, None);
    }
}
