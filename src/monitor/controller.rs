use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::alerts::{AlertEngineHandle, Notifier};
use crate::config::MonitorConfig;
use crate::db::Database;
use crate::models::{MonitorSession, SessionStatus};
use crate::pose::{PoseSample, PoseSource};

use super::evaluator::PostureMonitor;
use super::loop_worker::{sampling_loop, LoopContext};
use super::state::PostureStatus;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How many source polls a calibration attempt is willing to burn waiting for
/// a frame with a person in it.
const CALIBRATION_POLL_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Default)]
pub struct SessionTally {
    pub sample_count: u64,
    pub bad_count: u64,
    pub alert_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub tracking: bool,
    pub baseline: Option<f32>,
    pub session_id: Option<String>,
    pub sample_count: u64,
    pub bad_count: u64,
    pub alert_count: u64,
}

/// Everything the host needs to render, sound, or notify on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum MonitorEvent {
    Posture {
        session_id: String,
        timestamp: DateTime<Utc>,
        shoulder_y: Option<f32>,
        status: PostureStatus,
        alert: bool,
    },
    StateChanged {
        snapshot: MonitorSnapshot,
    },
    SessionCompleted {
        session: MonitorSession,
    },
}

struct ActiveSession {
    id: String,
    started_at: DateTime<Utc>,
    tally: Arc<Mutex<SessionTally>>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Orchestrates the posture monitor: owns the evaluator and the pose source,
/// runs one sampling loop per session, and fans results out to the alert
/// engine, the notifier, the database, and event subscribers.
#[derive(Clone)]
pub struct MonitorController {
    monitor: Arc<Mutex<PostureMonitor>>,
    source: Arc<Mutex<Box<dyn PoseSource>>>,
    db: Database,
    alerts: AlertEngineHandle,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<MonitorEvent>,
    config: MonitorConfig,
    session: Arc<Mutex<Option<ActiveSession>>>,
}

impl MonitorController {
    pub fn new(
        db: Database,
        source: Box<dyn PoseSource>,
        alerts: AlertEngineHandle,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            monitor: Arc::new(Mutex::new(PostureMonitor::new(config.clone()))),
            source: Arc::new(Mutex::new(source)),
            db,
            alerts,
            notifier,
            events,
            config,
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        let (tracking, baseline) = {
            let monitor = self.monitor.lock().await;
            (monitor.is_tracking(), monitor.baseline())
        };

        let (session_id, tally) = match self.session.lock().await.as_ref() {
            Some(active) => (Some(active.id.clone()), active.tally.lock().await.clone()),
            None => (None, SessionTally::default()),
        };

        MonitorSnapshot {
            tracking,
            baseline,
            session_id,
            sample_count: tally.sample_count,
            bad_count: tally.bad_count,
            alert_count: tally.alert_count,
        }
    }

    /// Calibrate from an explicit sample the host already has.
    pub async fn calibrate(&self, sample: &PoseSample) -> Result<f32> {
        let baseline = self
            .monitor
            .lock()
            .await
            .calibrate(sample)
            .context("calibration failed")?;

        info!("Calibrated baseline at shoulder height {baseline:.1}");

        if let Some(active) = self.session.lock().await.as_ref() {
            self.db
                .set_session_baseline(&active.id, baseline, Utc::now())
                .await?;
        }

        self.emit_state_changed().await;
        Ok(baseline)
    }

    /// Calibrate by polling the pose source until it produces a sample.
    /// Legal whether or not a session is running, like the original's
    /// calibrate button.
    pub async fn calibrate_from_source(&self) -> Result<f32> {
        for _ in 0..CALIBRATION_POLL_ATTEMPTS {
            let sample = self.source.lock().await.next_sample().await?;
            if let Some(sample) = sample {
                let sample = sample.confident(self.config.min_confidence);
                return self.calibrate(&sample).await;
            }
        }
        Err(anyhow!(
            "no pose detected after {CALIBRATION_POLL_ATTEMPTS} attempts"
        ))
    }

    /// Start tracking: insert a session row and spawn the sampling loop.
    /// A baseline is not required; evaluation reports Unknown until one is
    /// calibrated.
    pub async fn start_session(&self) -> Result<MonitorSession> {
        let mut session_guard = self.session.lock().await;
        if session_guard.is_some() {
            bail!("monitoring session already active");
        }

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let baseline = self.monitor.lock().await.baseline();

        let session = MonitorSession {
            id: session_id.clone(),
            started_at,
            stopped_at: None,
            status: SessionStatus::Running,
            baseline,
            sample_count: 0,
            bad_count: 0,
            alert_count: 0,
            created_at: started_at,
            updated_at: started_at,
        };

        self.db.insert_session(&session).await?;

        self.monitor.lock().await.start_tracking();

        let tally = Arc::new(Mutex::new(SessionTally::default()));
        let cancel_token = CancellationToken::new();

        let ctx = LoopContext {
            session_id: session_id.clone(),
            monitor: self.monitor.clone(),
            source: self.source.clone(),
            db: self.db.clone(),
            alerts: self.alerts.clone(),
            notifier: self.notifier.clone(),
            events: self.events.clone(),
            tally: tally.clone(),
            config: self.config.clone(),
        };

        let handle = tokio::spawn(sampling_loop(ctx, cancel_token.clone()));

        *session_guard = Some(ActiveSession {
            id: session_id.clone(),
            started_at,
            tally,
            cancel_token,
            handle,
        });
        drop(session_guard);

        info!("Monitoring session {session_id} started");
        self.emit_state_changed().await;

        Ok(session)
    }

    /// Stop tracking and finalize the session as Completed.
    pub async fn end_session(&self) -> Result<MonitorSession> {
        let active = self
            .session
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("no active session to end"))?;

        let session = self
            .finish_session(active, SessionStatus::Completed)
            .await?;

        let _ = self.events.send(MonitorEvent::SessionCompleted {
            session: session.clone(),
        });
        self.emit_state_changed().await;

        Ok(session)
    }

    /// Stop tracking and discard the session as Cancelled. A no-op when idle,
    /// matching the tracking flag's idempotence.
    pub async fn cancel_session(&self) -> Result<()> {
        let Some(active) = self.session.lock().await.take() else {
            return Ok(());
        };

        self.finish_session(active, SessionStatus::Cancelled).await?;
        self.emit_state_changed().await;
        Ok(())
    }

    async fn finish_session(
        &self,
        active: ActiveSession,
        status: SessionStatus,
    ) -> Result<MonitorSession> {
        self.monitor.lock().await.stop_tracking();

        active.cancel_token.cancel();
        active
            .handle
            .await
            .context("sampling loop task failed to join")?;

        let stopped_at = Utc::now();
        let tally = active.tally.lock().await.clone();

        self.db
            .mark_session_status(
                &active.id,
                status.clone(),
                tally.sample_count,
                tally.bad_count,
                tally.alert_count,
                Some(stopped_at),
                stopped_at,
            )
            .await?;

        info!(
            "Monitoring session {} finished as {:?}: {} samples, {} bad, {} alerts",
            active.id, status, tally.sample_count, tally.bad_count, tally.alert_count
        );

        Ok(MonitorSession {
            id: active.id,
            started_at: active.started_at,
            stopped_at: Some(stopped_at),
            status,
            baseline: self.monitor.lock().await.baseline(),
            sample_count: tally.sample_count,
            bad_count: tally.bad_count,
            alert_count: tally.alert_count,
            created_at: active.started_at,
            updated_at: stopped_at,
        })
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.snapshot().await;
        let _ = self.events.send(MonitorEvent::StateChanged { snapshot });
    }
}

/// Mark sessions left Running by a crashed process as Interrupted. Called
/// once at startup, before any new session begins.
pub async fn recover_interrupted_sessions(db: &Database) -> Result<()> {
    while let Some(session) = db.get_incomplete_session().await? {
        log::warn!(
            "Recovered incomplete session {}; marking as Interrupted",
            session.id
        );
        db.mark_session_interrupted(&session.id, Utc::now()).await?;
    }
    Ok(())
}
