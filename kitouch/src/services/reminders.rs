//! Reminders service
//!
//! Keeps each contact's pending notifications in step with its stored
//! reminder configuration. Every write that can change a contact's
//! reminders goes through here; scheduling problems are logged and
//! reported but never undo the stored record.

use crate::database::Contact;
use crate::error::{AppError, Result, SchedulingError, SchedulingIssue};
use crate::services::contacts::ContactsService;
use crate::services::delivery::{AuthorizationStatus, ScheduleRequest};
use crate::services::policy::{ReminderKind, ReminderPolicy};
use crate::services::reconciler::ScheduleReconciler;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Result of reconciling one contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled,
    AuthorizationDenied,
    Partial(Vec<SchedulingIssue>),
}

impl From<std::result::Result<(), SchedulingError>> for ScheduleOutcome {
    fn from(result: std::result::Result<(), SchedulingError>) -> Self {
        match result {
            Ok(()) => ScheduleOutcome::Scheduled,
            Err(SchedulingError::AuthorizationDenied) => ScheduleOutcome::AuthorizationDenied,
            Err(SchedulingError::Partial(issues)) => ScheduleOutcome::Partial(issues),
        }
    }
}

/// Totals of a bulk reschedule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RescheduleSummary {
    pub contacts: usize,
    pub scheduled: usize,
    pub partial: usize,
    pub authorization_denied: bool,
}

/// Reminders service wiring the policy to the delivery port
#[derive(Clone)]
pub struct RemindersService {
    contacts: ContactsService,
    reconciler: ScheduleReconciler,
    policy: ReminderPolicy,
    contact_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl RemindersService {
    pub fn new(
        contacts: ContactsService,
        reconciler: ScheduleReconciler,
        policy: ReminderPolicy,
    ) -> Self {
        Self {
            contacts,
            reconciler,
            policy,
            contact_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serialize work on one contact
    async fn lock_contact(&self, contact_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.contact_locks.lock().await;
            Arc::clone(locks.entry(contact_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop a contact's lock once nobody holds or waits on it
    async fn release_contact_lock(&self, contact_id: Uuid) {
        let mut locks = self.contact_locks.lock().await;
        // Waiters clone the Arc under this map lock, so a count of one
        // means the map holds the only reference
        if locks
            .get(&contact_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&contact_id);
        }
    }

    async fn reconcile(&self, contact: &Contact) -> ScheduleOutcome {
        let desired = self.policy.enumerate_contact(contact);
        let outcome: ScheduleOutcome = self
            .reconciler
            .apply(&desired, contact.id, &contact.name)
            .await
            .into();

        match &outcome {
            ScheduleOutcome::Scheduled => {
                tracing::debug!(
                    "Contact {} has {} reminder(s) scheduled",
                    contact.id,
                    desired.len()
                );
            }
            ScheduleOutcome::AuthorizationDenied => {
                tracing::debug!("Reminders for contact {} skipped: not authorized", contact.id);
            }
            ScheduleOutcome::Partial(issues) => {
                tracing::warn!(
                    "Contact {} scheduled with {} problem(s)",
                    contact.id,
                    issues.len()
                );
            }
        }

        outcome
    }

    /// Save a contact and bring its reminders up to date.
    ///
    /// The contact is stored even when scheduling does not fully succeed;
    /// the outcome says how scheduling went.
    pub async fn save_contact(&self, contact: Contact) -> Result<(Contact, ScheduleOutcome)> {
        let _guard = self.lock_contact(contact.id).await;

        self.contacts.save_contact(&contact).await?;
        let outcome = self.reconcile(&contact).await;

        Ok((contact, outcome))
    }

    /// Delete a contact and withdraw all of its reminders
    pub async fn delete_contact(&self, contact_id: Uuid) -> Result<()> {
        let guard = self.lock_contact(contact_id).await;

        self.contacts.delete_contact(contact_id).await?;

        if let Err(e) = self.reconciler.apply(&[], contact_id, "").await {
            tracing::warn!("Reminders of deleted contact {} not fully withdrawn: {}", contact_id, e);
        }

        drop(guard);
        self.release_contact_lock(contact_id).await;

        Ok(())
    }

    /// Reconcile one stored contact
    pub async fn reschedule_contact(&self, contact_id: Uuid) -> Result<ScheduleOutcome> {
        let _guard = self.lock_contact(contact_id).await;

        let contact = self.contacts.get_contact(contact_id).await?;
        Ok(self.reconcile(&contact).await)
    }

    /// Reconcile every stored contact, one after another
    pub async fn reschedule_all(&self) -> Result<RescheduleSummary> {
        let contacts = self.contacts.list_contacts().await?;
        tracing::info!("Rescheduling reminders for {} contact(s)", contacts.len());

        let mut summary = RescheduleSummary {
            contacts: contacts.len(),
            ..RescheduleSummary::default()
        };

        for contact in &contacts {
            let _guard = self.lock_contact(contact.id).await;

            match self.reconcile(contact).await {
                ScheduleOutcome::Scheduled => summary.scheduled += 1,
                ScheduleOutcome::AuthorizationDenied => summary.authorization_denied = true,
                ScheduleOutcome::Partial(_) => summary.partial += 1,
            }
        }

        if summary.authorization_denied {
            tracing::warn!("Notifications are denied, no reminders will be delivered");
        }
        tracing::info!(
            "Rescheduled {} contact(s): {} complete, {} partial",
            summary.contacts,
            summary.scheduled,
            summary.partial
        );

        Ok(summary)
    }

    /// Ask the delivery port for permission to notify
    pub async fn request_authorization(&self) -> Result<AuthorizationStatus> {
        let status = self
            .reconciler
            .port()
            .request_authorization()
            .await
            .map_err(|e| AppError::Scheduler(e.to_string()))?;

        match status {
            AuthorizationStatus::Granted => tracing::info!("Notifications authorized"),
            AuthorizationStatus::Denied => tracing::warn!("Notifications denied by the user"),
            AuthorizationStatus::NotDetermined => {
                tracing::info!("Notification authorization not determined")
            }
        }

        Ok(status)
    }

    /// Pending entries owned by a contact
    pub async fn pending_for_contact(&self, contact_id: Uuid) -> Result<Vec<ScheduleRequest>> {
        let pending = self
            .reconciler
            .port()
            .list_pending()
            .await
            .map_err(|e| AppError::Scheduler(e.to_string()))?;

        Ok(pending
            .into_iter()
            .filter(|request| {
                matches!(
                    ReminderKind::parse_identifier(&request.identifier),
                    Some((_, id)) if id == contact_id
                )
            })
            .collect())
    }
}
