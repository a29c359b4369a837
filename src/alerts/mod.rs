pub mod notify;
pub mod tone;

pub use notify::{LogNotifier, Notifier, SilentNotifier};
pub use tone::WarningTone;

use rodio::{OutputStream, Sink};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

enum AlertCommand {
    PlayWarning,
    SetVolume(f32),
    SetEnabled(bool),
    Stop,
}

/// Handle to the warning-sound engine.
///
/// rodio's output objects are not Send, so they live on a dedicated thread
/// driven by a command channel; the handle is cheap to clone around the
/// controller and sampling loop.
#[derive(Clone)]
pub struct AlertEngineHandle {
    tx: Arc<Mutex<Option<Sender<AlertCommand>>>>,
    enabled: Arc<AtomicBool>,
}

impl AlertEngineHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AlertCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AlertCommand>();

        // Spawn dedicated audio thread holding non-Send audio objects
        thread::Builder::new()
            .name("alert-engine".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;
                let mut enabled = true;
                let mut volume: f32 = 1.0;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AlertCommand::PlayWarning => {
                            if !enabled {
                                continue;
                            }
                            if ensure_sink(&mut _stream, &mut sink).is_err() {
                                // No audio device; warnings fall back to log/notification.
                                continue;
                            }
                            if let Some(ref s) = sink {
                                s.set_volume(volume);
                                s.append(WarningTone::new());
                            }
                        }
                        AlertCommand::SetVolume(v) => {
                            volume = v.clamp(0.0, 1.0);
                            if let Some(ref s) = sink {
                                s.set_volume(volume);
                            }
                        }
                        AlertCommand::SetEnabled(value) => {
                            enabled = value;
                        }
                        AlertCommand::Stop => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    pub fn play_warning(&self) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(AlertCommand::PlayWarning).map_err(|e| e.to_string())
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(AlertCommand::SetVolume(volume))
            .map_err(|e| e.to_string())
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), String> {
        self.enabled.store(enabled, Ordering::SeqCst);
        let tx = self.ensure_thread()?;
        tx.send(AlertCommand::SetEnabled(enabled))
            .map_err(|e| e.to_string())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn stop(&self) -> Result<(), String> {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AlertCommand::Stop);
        }
        Ok(())
    }
}

impl Default for AlertEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}
