//! Notification routing
//!
//! Turns the payload of an opened reminder back into a navigation intent.

use crate::config::NAVIGATION_CONTACT_DETAIL;
use crate::database::Repository;
use crate::error::Result;
use crate::services::content::ReminderPayload;
use crate::services::scheduler::DeliveredNotification;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

const PENDING_CONTACT_KEY: &str = "pending_contact_id";

/// Where the app should go after a reminder is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    OpenContactDetail { contact_id: Uuid },
}

pub struct NotificationRouter;

impl NotificationRouter {
    pub fn route(payload: &ReminderPayload) -> Option<NavigationIntent> {
        (payload.navigation_target == NAVIGATION_CONTACT_DETAIL).then_some(
            NavigationIntent::OpenContactDetail {
                contact_id: payload.contact_id,
            },
        )
    }

    /// Route a raw JSON payload; malformed payloads yield `None`
    pub fn route_json(user_info: &serde_json::Value) -> Option<NavigationIntent> {
        match serde_json::from_value::<ReminderPayload>(user_info.clone()) {
            Ok(payload) => Self::route(&payload),
            Err(e) => {
                tracing::debug!("Ignoring notification payload: {}", e);
                None
            }
        }
    }

    /// Forward intents for delivered reminders until either channel closes
    pub async fn run(
        mut delivered: broadcast::Receiver<DeliveredNotification>,
        intents: mpsc::Sender<NavigationIntent>,
    ) {
        tracing::info!("Notification router started");

        loop {
            let notification = match delivered.recv().await {
                Ok(notification) => notification,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Notification router skipped {} reminders", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let Some(intent) = Self::route(&notification.content.payload) else {
                continue;
            };

            if intents.send(intent).await.is_err() {
                break;
            }
        }

        tracing::info!("Notification router stopped");
    }
}

/// Keeps the contact of an opened reminder until the UI is ready for it
#[derive(Clone)]
pub struct PendingNavigationStore {
    repo: Repository,
}

impl PendingNavigationStore {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn stash(&self, intent: &NavigationIntent) -> Result<()> {
        let NavigationIntent::OpenContactDetail { contact_id } = intent;
        self.repo
            .set_setting(PENDING_CONTACT_KEY, &contact_id.to_string())
            .await
    }

    /// Take the stashed intent, clearing it
    pub async fn take(&self) -> Result<Option<NavigationIntent>> {
        let Some(value) = self.repo.get_setting(PENDING_CONTACT_KEY).await? else {
            return Ok(None);
        };
        self.repo.remove_setting(PENDING_CONTACT_KEY).await?;

        match Uuid::parse_str(&value) {
            Ok(contact_id) => Ok(Some(NavigationIntent::OpenContactDetail { contact_id })),
            Err(e) => {
                tracing::warn!("Dropping malformed pending contact id {}: {}", value, e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use crate::services::content::ReminderContent;
    use chrono::Utc;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_route_contact_detail() {
        let id = Uuid::new_v4();
        let payload = ReminderPayload::contact_detail(id);

        assert_eq!(
            NotificationRouter::route(&payload),
            Some(NavigationIntent::OpenContactDetail { contact_id: id })
        );
    }

    #[test]
    fn test_route_json_requires_contact_detail_target() {
        let id = Uuid::new_v4();

        let routed = NotificationRouter::route_json(&json!({
            "contactId": id.to_string(),
            "navigation": "contactDetail"
        }));
        assert_eq!(
            routed,
            Some(NavigationIntent::OpenContactDetail { contact_id: id })
        );

        let other = NotificationRouter::route_json(&json!({
            "contactId": id.to_string(),
            "navigation": "settings"
        }));
        assert_eq!(other, None);

        let missing = NotificationRouter::route_json(&json!({ "navigation": "contactDetail" }));
        assert_eq!(missing, None);

        let malformed = NotificationRouter::route_json(&json!({
            "contactId": "not-a-uuid",
            "navigation": "contactDetail"
        }));
        assert_eq!(malformed, None);
    }

    #[tokio::test]
    async fn test_run_forwards_intents() {
        let (delivered_tx, delivered_rx) = broadcast::channel(4);
        let (intent_tx, mut intent_rx) = mpsc::channel(4);
        let handle = tokio::spawn(NotificationRouter::run(delivered_rx, intent_tx));

        let id = Uuid::new_v4();
        delivered_tx
            .send(DeliveredNotification {
                identifier: format!("birthday_{}", id),
                content: ReminderContent {
                    title: "Birthday!".to_string(),
                    body: "Today is the birthday of Anna".to_string(),
                    payload: ReminderPayload::contact_detail(id),
                    category_identifier: "BIRTHDAY_CATEGORY".to_string(),
                    thread_identifier: "birthday_notifications".to_string(),
                    sound: true,
                },
                delivered_at: Utc::now(),
            })
            .unwrap();

        assert_eq!(
            intent_rx.recv().await,
            Some(NavigationIntent::OpenContactDetail { contact_id: id })
        );

        drop(delivered_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_navigation_round_trip() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();
        let store = PendingNavigationStore::new(Repository::new(pool));

        assert_eq!(store.take().await.unwrap(), None);

        let intent = NavigationIntent::OpenContactDetail {
            contact_id: Uuid::new_v4(),
        };
        store.stash(&intent).await.unwrap();

        assert_eq!(store.take().await.unwrap(), Some(intent));
        assert_eq!(store.take().await.unwrap(), None);
    }
}
