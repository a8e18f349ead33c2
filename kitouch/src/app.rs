//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::{APP_DIR_NAME, DATA_DIR_ENV};
use crate::database::{create_pool, Repository};
use crate::error::{AppError, Result};
use crate::services::{
    ContactsService, DeliveryPort, LocalNotificationCenter, PendingNavigationStore,
    RemindersService, ReminderPolicy, ScheduleReconciler, SettingsService,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub settings_service: SettingsService,
    pub contacts_service: ContactsService,
    pub reminders_service: RemindersService,
    pub pending_navigation: PendingNavigationStore,
    pub notification_center: Arc<LocalNotificationCenter>,
}

impl AppState {
    /// Open the store, load settings and build the services
    pub async fn initialize(app_data_dir: PathBuf) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("App data directory: {:?}", app_data_dir);

        std::fs::create_dir_all(&app_data_dir)?;

        let settings_service = SettingsService::new(app_data_dir.clone());
        let settings = settings_service.load().await?;
        settings.reminders.validate()?;
        settings.delivery.validate()?;

        let pool = create_pool(&app_data_dir.join("kitouch.db")).await?;
        let repo = Repository::new(pool);

        let notification_center =
            Arc::new(LocalNotificationCenter::new(settings.delivery.max_pending).await?);
        let port: Arc<dyn DeliveryPort> = notification_center.clone();
        let reconciler = ScheduleReconciler::new(port)
            .with_debug_second_granularity(settings.reminders.debug_second_granularity);

        let contacts_service = ContactsService::new(repo.clone());
        let reminders_service = RemindersService::new(
            contacts_service.clone(),
            reconciler,
            ReminderPolicy::new(settings.reminders.birthday_hour),
        );

        tracing::info!("Application initialized successfully");

        Ok(Self {
            app_data_dir,
            settings_service,
            contacts_service,
            reminders_service,
            pending_navigation: PendingNavigationStore::new(repo),
            notification_center,
        })
    }
}

/// Data directory from the environment, or the platform default
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| AppError::Generic("Failed to get app data dir".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AuthorizationStatus;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_initialize_creates_store_and_settings() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("nested");

        let state = AppState::initialize(data_dir.clone()).await.unwrap();

        assert!(data_dir.join("settings.json").exists());
        assert!(data_dir.join("kitouch.db").exists());
        assert!(state.contacts_service.list_contacts().await.unwrap().is_empty());
        assert_eq!(
            state.notification_center.authorization_status().await,
            AuthorizationStatus::NotDetermined
        );
    }
}
