use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::alerts::{AlertEngineHandle, Notifier};
use crate::config::MonitorConfig;
use crate::db::Database;
use crate::models::PostureReading;
use crate::pose::PoseSource;

use super::controller::{MonitorEvent, SessionTally};
use super::evaluator::PostureMonitor;
use super::state::PostureStatus;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const HEARTBEAT_EVERY_TICKS: u32 = 10;

const ALERT_TITLE: &str = "Fix your posture!";
const ALERT_BODY: &str = "Straighten your back";

pub(crate) struct LoopContext {
    pub session_id: String,
    pub monitor: Arc<Mutex<PostureMonitor>>,
    pub source: Arc<Mutex<Box<dyn PoseSource>>>,
    pub db: Database,
    pub alerts: AlertEngineHandle,
    pub notifier: Arc<dyn Notifier>,
    pub events: broadcast::Sender<MonitorEvent>,
    pub tally: Arc<Mutex<SessionTally>>,
    pub config: MonitorConfig,
}

/// Per-session sampling loop: poll the pose source, evaluate, persist, alert.
///
/// A failed poll or a non-evaluable sample never stops the loop; only the
/// cancellation token does. Observation timestamps are taken here and passed
/// into the evaluator explicitly, so they are monotone for the session.
pub(crate) async fn sampling_loop(ctx: LoopContext, cancel_token: CancellationToken) {
    let mut ticker =
        tokio::time::interval(Duration::from_millis(ctx.config.sample_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                ticks = ticks.wrapping_add(1);
                evaluate_tick(&ctx).await;

                if ticks % HEARTBEAT_EVERY_TICKS == 0 {
                    let tally = ctx.tally.lock().await.clone();
                    if let Err(err) = ctx
                        .db
                        .update_session_progress(
                            &ctx.session_id,
                            tally.sample_count,
                            tally.bad_count,
                            tally.alert_count,
                            Utc::now(),
                        )
                        .await
                    {
                        log_error!("heartbeat persist failed for session {}: {err:?}", ctx.session_id);
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down for session {}", ctx.session_id);
                break;
            }
        }
    }
}

async fn evaluate_tick(ctx: &LoopContext) {
    let sample = match ctx.source.lock().await.next_sample().await {
        Ok(Some(sample)) => sample,
        Ok(None) => {
            // No person in frame this tick; keep polling.
            return;
        }
        Err(err) => {
            log_warn!("pose source failed for session {}: {err:?}", ctx.session_id);
            return;
        }
    };

    let sample = sample.confident(ctx.config.min_confidence);
    let shoulder_y = sample.shoulder_y();
    let now = Utc::now();

    let event = ctx.monitor.lock().await.observe(&sample, now);

    {
        let mut tally = ctx.tally.lock().await;
        tally.sample_count += 1;
        if event.status == PostureStatus::Bad {
            tally.bad_count += 1;
        }
        if event.alert {
            tally.alert_count += 1;
        }
    }

    if event.alert {
        log_info!(
            "posture alert for session {} (shoulder_y {:?})",
            ctx.session_id,
            shoulder_y
        );
        if let Err(err) = ctx.alerts.play_warning() {
            log_warn!("warning tone failed: {err}");
        }
        ctx.notifier.notify(ALERT_TITLE, ALERT_BODY);
    }

    let reading = PostureReading {
        id: None,
        session_id: ctx.session_id.clone(),
        timestamp: now,
        shoulder_y,
        status: event.status,
        alerted: event.alert,
    };

    if let Err(err) = ctx.db.insert_reading(&reading).await {
        log_error!("failed to persist reading for session {}: {err:?}", ctx.session_id);
    }

    let _ = ctx.events.send(MonitorEvent::Posture {
        session_id: ctx.session_id.clone(),
        timestamp: now,
        shoulder_y,
        status: event.status,
        alert: event.alert,
    });
}
