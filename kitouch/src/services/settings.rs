//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::{BIRTHDAY_REMINDER_HOUR, MAX_PENDING_NOTIFICATIONS};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// How reminders are scheduled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    /// Local hour at which birthday reminders fire
    #[serde(default = "default_birthday_hour")]
    pub birthday_hour: u32,
    /// Match only the second of each trigger so reminders fire every minute.
    /// For manual testing.
    #[serde(default)]
    pub debug_second_granularity: bool,
}

fn default_birthday_hour() -> u32 {
    BIRTHDAY_REMINDER_HOUR
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            birthday_hour: default_birthday_hour(),
            debug_second_granularity: false,
        }
    }
}

impl ReminderSettings {
    pub fn validate(&self) -> Result<()> {
        if self.birthday_hour > 23 {
            return Err(AppError::Validation(format!(
                "Birthday hour must be between 0 and 23, got {}",
                self.birthday_hour
            )));
        }
        Ok(())
    }
}

/// Local notification center limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySettings {
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    /// Ask for notification permission on start-up
    #[serde(default = "default_true")]
    pub request_authorization_on_start: bool,
}

fn default_max_pending() -> usize {
    MAX_PENDING_NOTIFICATIONS
}

fn default_true() -> bool {
    true
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
            request_authorization_on_start: true,
        }
    }
}

impl DeliverySettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_pending == 0 {
            return Err(AppError::Validation(
                "Pending notification limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub reminders: ReminderSettings,
    #[serde(default)]
    pub delivery: DeliverySettings,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join("settings.json"),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    pub async fn get_reminders(&self) -> Result<ReminderSettings> {
        let settings = self.load().await?;
        Ok(settings.reminders)
    }

    /// Update reminder settings. Takes effect for the next reconciliation.
    pub async fn update_reminders(&self, reminders: ReminderSettings) -> Result<()> {
        reminders.validate()?;
        let mut settings = self.load().await?;
        settings.reminders = reminders;
        self.save(&settings).await?;
        Ok(())
    }

    pub async fn get_delivery(&self) -> Result<DeliverySettings> {
        let settings = self.load().await?;
        Ok(settings.delivery)
    }

    pub async fn update_delivery(&self, delivery: DeliverySettings) -> Result<()> {
        delivery.validate()?;
        let mut settings = self.load().await?;
        settings.delivery = delivery;
        self.save(&settings).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (SettingsService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());
        (service, temp_dir)
    }

    #[tokio::test]
    async fn test_default_settings_created_on_load() {
        let (service, temp) = create_test_service();

        let settings = service.load().await.unwrap();

        assert_eq!(settings.reminders.birthday_hour, 10);
        assert!(!settings.reminders.debug_second_granularity);
        assert_eq!(settings.delivery.max_pending, 64);
        assert!(settings.delivery.request_authorization_on_start);
        assert!(temp.path().join("settings.json").exists());
    }

    #[tokio::test]
    async fn test_reminder_settings_get_and_update() {
        let (service, _temp) = create_test_service();

        let updated = ReminderSettings {
            birthday_hour: 8,
            debug_second_granularity: true,
        };
        service.update_reminders(updated.clone()).await.unwrap();

        assert_eq!(service.get_reminders().await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected() {
        let (service, _temp) = create_test_service();

        let result = service
            .update_reminders(ReminderSettings {
                birthday_hour: 24,
                ..ReminderSettings::default()
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = service
            .update_delivery(DeliverySettings {
                max_pending: 0,
                ..DeliverySettings::default()
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert_eq!(service.load().await.unwrap(), AppSettings::default());
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().to_path_buf();

        {
            let service = SettingsService::new(settings_path.clone());
            let delivery = DeliverySettings {
                max_pending: 16,
                request_authorization_on_start: false,
            };
            service.update_delivery(delivery).await.unwrap();
        }

        {
            let service = SettingsService::new(settings_path);
            let loaded = service.get_delivery().await.unwrap();
            assert_eq!(loaded.max_pending, 16);
            assert!(!loaded.request_authorization_on_start);
            // Untouched sections keep their defaults
            assert_eq!(service.get_reminders().await.unwrap(), ReminderSettings::default());
        }
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let (service, temp) = create_test_service();
        std::fs::write(
            temp.path().join("settings.json"),
            r#"{"reminders":{"debug_second_granularity":true}}"#,
        )
        .unwrap();

        let settings = service.load().await.unwrap();
        assert!(settings.reminders.debug_second_granularity);
        assert_eq!(settings.reminders.birthday_hour, 10);
        assert_eq!(settings.delivery, DeliverySettings::default());
    }
}
