use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use slouchguard::{
    recover_interrupted_sessions, AlertEngineHandle, Database, DriftSource, LogNotifier,
    MonitorConfig, MonitorController, MonitorEvent, Notifier, PostureStatus, SettingsStore,
    SilentNotifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("slouchguard starting up...");

    let data_dir = dirs::data_dir()
        .context("no data directory available on this platform")?
        .join("slouchguard");
    std::fs::create_dir_all(&data_dir)?;

    let database = Database::new(data_dir.join("slouchguard.sqlite3"))?;
    recover_interrupted_sessions(&database).await?;

    let settings = SettingsStore::new(data_dir.join("settings.json"))?;
    let alert_settings = settings.alerts();

    let alerts = AlertEngineHandle::new();
    if let Err(err) = alerts.set_enabled(alert_settings.audio_enabled) {
        warn!("Failed to configure alert audio: {err}");
    }
    if let Err(err) = alerts.set_volume(alert_settings.volume) {
        warn!("Failed to set alert volume: {err}");
    }

    let notifier: Arc<dyn Notifier> = if alert_settings.notifications_enabled {
        Arc::new(LogNotifier)
    } else {
        Arc::new(SilentNotifier)
    };

    let controller = MonitorController::new(
        database,
        // Synthetic sitter; swap in a camera-backed source to monitor a real
        // person.
        Box::new(DriftSource::default()),
        alerts.clone(),
        notifier,
        MonitorConfig::default(),
    );

    spawn_event_printer(&controller);

    println!("Commands: calibrate | start | stop | cancel | status | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(line.trim(), &controller).await {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    // Leave no session dangling as Running.
    controller.cancel_session().await?;
    alerts.stop().ok();
    info!("slouchguard shut down");
    Ok(())
}

/// Returns false when the loop should exit.
async fn handle_command(command: &str, controller: &MonitorController) -> bool {
    match command {
        "calibrate" => match controller.calibrate_from_source().await {
            Ok(baseline) => println!("Calibrated: baseline shoulder height {baseline:.1}"),
            Err(err) => println!("Calibration failed: {err}"),
        },
        "start" => match controller.start_session().await {
            Ok(session) => println!("Tracking started (session {})", session.id),
            Err(err) => println!("Could not start: {err}"),
        },
        "stop" => match controller.end_session().await {
            Ok(session) => println!(
                "Tracking stopped: {} samples, {} slouched, {} alerts",
                session.sample_count, session.bad_count, session.alert_count
            ),
            Err(err) => println!("Could not stop: {err}"),
        },
        "cancel" => match controller.cancel_session().await {
            Ok(()) => println!("Session cancelled"),
            Err(err) => println!("Could not cancel: {err}"),
        },
        "status" => {
            let snapshot = controller.snapshot().await;
            println!(
                "tracking: {}, baseline: {}, session: {}",
                snapshot.tracking,
                snapshot
                    .baseline
                    .map_or("uncalibrated".to_string(), |b| format!("{b:.1}")),
                snapshot.session_id.as_deref().unwrap_or("none"),
            );
        }
        "quit" | "exit" => return false,
        "" => {}
        other => println!("Unknown command: {other}"),
    }
    true
}

/// Prints posture transitions so a headless run is still observable.
fn spawn_event_printer(controller: &MonitorController) {
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        let mut last_status: Option<PostureStatus> = None;
        while let Ok(event) = events.recv().await {
            match event {
                MonitorEvent::Posture { status, alert, .. } => {
                    if last_status != Some(status) {
                        match status {
                            PostureStatus::Good => println!("Posture: good"),
                            PostureStatus::Bad => println!("Posture: straighten your back!"),
                            PostureStatus::Unknown => println!("Posture: not visible"),
                        }
                        last_status = Some(status);
                    } else if alert {
                        println!("Posture: still slouching");
                    }
                }
                MonitorEvent::SessionCompleted { session } => {
                    println!(
                        "Session complete: {} samples, {} slouched, {} alerts",
                        session.sample_count, session.bad_count, session.alert_count
                    );
                }
                MonitorEvent::StateChanged { .. } => {}
            }
        }
    });
}
