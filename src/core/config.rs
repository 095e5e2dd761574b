use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::alerts::model::EscalationPolicy;
use super::alerts::triggers::ClassifierConfig;
use super::error::ConfigError;
use super::sink::sound::SoundSettings;
use super::sources::poller::PollSettings;

/// Application settings, stored as settings.json in the config directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Master switch for notification monitoring
    #[serde(default = "default_monitoring_enabled")]
    pub monitoring_enabled: bool,
    #[serde(default)]
    pub escalation: EscalationPolicy,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub sound: SoundSettings,
    /// HTTP poll source; disabled when absent
    #[serde(default)]
    pub poll: Option<PollSettings>,
}

fn default_monitoring_enabled() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitoring_enabled: default_monitoring_enabled(),
            escalation: EscalationPolicy::default(),
            classifier: ClassifierConfig::default(),
            sound: SoundSettings::default(),
            poll: None,
        }
    }
}

/// Default config directory: `$HOME/.config/alarm-watch`.
pub fn default_config_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config").join("alarm-watch")
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load(&self) -> Settings {
        if !self.config_path.exists() {
            return Settings::default();
        }
        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "Invalid settings at {}, using defaults: {}",
                    self.config_path.display(),
                    e
                );
                Settings::default()
            }
        }
    }

    fn try_load(&self) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(&self.config_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("nested"));

        let default = manager.load();
        assert_eq!(default, Settings::default());
        assert_eq!(default.escalation.max_escalations, 6);

        let mut settings = Settings::default();
        settings.monitoring_enabled = false;
        settings.escalation.repeat_interval_secs = 30;
        settings.poll = Some(PollSettings::new("http://localhost:9000/alerts"));
        settings.sound.volume = 0.5;

        manager.save(&settings).unwrap();
        assert!(manager.path().exists());
        assert_eq!(manager.load(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("settings.json"),
            r#"{"escalation":{"max_escalations":3}}"#,
        )
        .unwrap();

        let loaded = ConfigManager::new(dir.path().to_path_buf()).load();
        assert!(loaded.monitoring_enabled);
        assert_eq!(loaded.escalation.max_escalations, 3);
        assert_eq!(loaded.escalation.alert_duration_secs, 180);
        assert_eq!(loaded.classifier, ClassifierConfig::default());
        assert!(loaded.poll.is_none());
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        let loaded = ConfigManager::new(dir.path().to_path_buf()).load();
        assert_eq!(loaded, Settings::default());
    }
}
