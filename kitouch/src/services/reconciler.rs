//! Schedule reconciliation
//!
//! Makes the delivery port's pending entries for one contact match the
//! desired reminder instances: cancel every identifier the contact could
//! own, then register what is desired. Registration failures do not undo
//! the cancellations and do not stop sibling registrations. Failed
//! cancellations and registrations are both reported in the aggregate.

use crate::error::{DeliveryError, SchedulingError, SchedulingIssue};
use crate::services::calendar::trigger_components;
use crate::services::content::ReminderContentBuilder;
use crate::services::delivery::{AuthorizationStatus, DeliveryPort, ScheduleRequest};
use crate::services::policy::{ReminderInstance, ReminderKind};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ScheduleReconciler {
    port: Arc<dyn DeliveryPort>,
    debug_second_granularity: bool,
}

impl ScheduleReconciler {
    pub fn new(port: Arc<dyn DeliveryPort>) -> Self {
        Self {
            port,
            debug_second_granularity: false,
        }
    }

    /// Fire on a matching second instead of the real calendar date
    pub fn with_debug_second_granularity(mut self, enabled: bool) -> Self {
        self.debug_second_granularity = enabled;
        self
    }

    pub fn port(&self) -> &Arc<dyn DeliveryPort> {
        &self.port
    }

    /// Replace the contact's pending reminders with `desired`.
    ///
    /// `desired` must be identifier-unique, which `ReminderPolicy` guarantees.
    /// Callers must not run two `apply` calls for the same contact at once.
    pub async fn apply(
        &self,
        desired: &[ReminderInstance],
        contact_id: Uuid,
        name: &str,
    ) -> Result<(), SchedulingError> {
        let authorization = self.port.authorization_status().await;
        let denied = authorization == AuthorizationStatus::Denied;

        tracing::debug!(
            "Reconciling {} reminder(s) for contact {} ({:?})",
            desired.len(),
            contact_id,
            authorization
        );

        let mut issues = Vec::new();

        // A failed cancel is reported but never stops registration
        for identifier in ReminderKind::all_identifiers(contact_id) {
            if let Err(cause) = self.port.cancel(std::slice::from_ref(&identifier)).await {
                let issue = SchedulingIssue::CancellationFailed { identifier, cause };
                tracing::warn!("{}", issue);
                issues.push(issue);
            }
        }

        for instance in desired {
            let request = ScheduleRequest {
                identifier: instance.identifier.clone(),
                trigger: trigger_components(
                    instance.start,
                    instance.recurrence,
                    self.debug_second_granularity,
                ),
                content: ReminderContentBuilder::build(instance, contact_id, name),
            };

            match self.port.register(request).await {
                Ok(()) => {
                    tracing::debug!("Registered reminder {}", instance.identifier);
                }
                Err(DeliveryError::NotAuthorized) if denied => {
                    tracing::debug!("Reminder {} not registered: unauthorized", instance.identifier);
                }
                Err(cause) => {
                    let issue = SchedulingIssue::RegistrationFailed {
                        identifier: instance.identifier.clone(),
                        cause,
                    };
                    tracing::error!("{}", issue);
                    issues.push(issue);
                }
            }
        }

        if denied {
            tracing::warn!("Notifications denied, reminders for {} will not fire", contact_id);
            return Err(SchedulingError::AuthorizationDenied);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(SchedulingError::Partial(issues))
        }
    }
}
