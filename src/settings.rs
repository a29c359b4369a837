use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    pub audio_enabled: bool,
    pub volume: f32,
    pub notifications_enabled: bool,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            volume: 1.0,
            notifications_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    alerts: AlertSettings,
}

/// JSON-backed user settings. Unreadable or missing files fall back to
/// defaults rather than failing startup.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn alerts(&self) -> AlertSettings {
        self.data.read().unwrap().alerts.clone()
    }

    pub fn update_alerts(&self, settings: AlertSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.alerts = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn settings_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        assert!(store.alerts().audio_enabled);

        store
            .update_alerts(AlertSettings {
                audio_enabled: false,
                volume: 0.4,
                notifications_enabled: true,
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert!(!reloaded.alerts().audio_enabled);
        assert_eq!(reloaded.alerts().volume, 0.4);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert!(store.alerts().audio_enabled);
    }
}
