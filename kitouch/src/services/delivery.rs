//! Delivery port
//!
//! Abstraction over the notification center that owns pending schedules.
//! The engine only writes to it; `list_pending` exists for diagnostics.
//! `InMemoryDeliveryCenter` records every call and can be told to fail.

use crate::error::DeliveryError;
use crate::services::calendar::TriggerSpec;
use crate::services::content::ReminderContent;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;

/// Whether the user allowed notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Granted,
    Denied,
}

/// A schedule entry as the delivery subsystem stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub identifier: String,
    pub trigger: TriggerSpec,
    pub content: ReminderContent,
}

#[async_trait]
pub trait DeliveryPort: Send + Sync {
    async fn authorization_status(&self) -> AuthorizationStatus;

    async fn request_authorization(&self) -> Result<AuthorizationStatus, DeliveryError>;

    /// Remove pending entries; identifiers that are not pending are ignored
    async fn cancel(&self, identifiers: &[String]) -> Result<(), DeliveryError>;

    /// Add an entry, replacing any pending entry with the same identifier
    async fn register(&self, request: ScheduleRequest) -> Result<(), DeliveryError>;

    async fn list_pending(&self) -> Result<Vec<ScheduleRequest>, DeliveryError>;
}

/// A call observed by the in-memory center
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryCall {
    Cancel(Vec<String>),
    Register(String),
}

#[derive(Debug)]
struct InMemoryState {
    authorization: AuthorizationStatus,
    pending: BTreeMap<String, ScheduleRequest>,
    calls: Vec<DeliveryCall>,
    failing_registrations: HashSet<String>,
    failing_cancellations: HashSet<String>,
    capacity: Option<usize>,
}

/// Delivery port kept entirely in memory
#[derive(Debug)]
pub struct InMemoryDeliveryCenter {
    state: Mutex<InMemoryState>,
}

impl Default for InMemoryDeliveryCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDeliveryCenter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                authorization: AuthorizationStatus::Granted,
                pending: BTreeMap::new(),
                calls: Vec::new(),
                failing_registrations: HashSet::new(),
                failing_cancellations: HashSet::new(),
                capacity: None,
            }),
        }
    }

    pub async fn set_authorization(&self, status: AuthorizationStatus) {
        self.state.lock().await.authorization = status;
    }

    pub async fn set_capacity(&self, capacity: usize) {
        self.state.lock().await.capacity = Some(capacity);
    }

    /// Make every registration of `identifier` fail
    pub async fn fail_registration(&self, identifier: impl Into<String>) {
        self.state
            .lock()
            .await
            .failing_registrations
            .insert(identifier.into());
    }

    /// Make every cancellation touching `identifier` fail
    pub async fn fail_cancellation(&self, identifier: impl Into<String>) {
        self.state
            .lock()
            .await
            .failing_cancellations
            .insert(identifier.into());
    }

    pub async fn calls(&self) -> Vec<DeliveryCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Pending identifiers in sorted order
    pub async fn pending_identifiers(&self) -> Vec<String> {
        self.state.lock().await.pending.keys().cloned().collect()
    }

    /// Pending entries whose trigger matches `at`
    pub async fn due_at(&self, at: NaiveDateTime) -> Vec<ScheduleRequest> {
        self.state
            .lock()
            .await
            .pending
            .values()
            .filter(|request| request.trigger.matches(at))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DeliveryPort for InMemoryDeliveryCenter {
    async fn authorization_status(&self) -> AuthorizationStatus {
        self.state.lock().await.authorization
    }

    async fn request_authorization(&self) -> Result<AuthorizationStatus, DeliveryError> {
        let mut state = self.state.lock().await;
        if state.authorization == AuthorizationStatus::NotDetermined {
            state.authorization = AuthorizationStatus::Granted;
        }
        Ok(state.authorization)
    }

    async fn cancel(&self, identifiers: &[String]) -> Result<(), DeliveryError> {
        let mut state = self.state.lock().await;
        state.calls.push(DeliveryCall::Cancel(identifiers.to_vec()));

        if let Some(failing) = identifiers
            .iter()
            .find(|id| state.failing_cancellations.contains(*id))
        {
            return Err(DeliveryError::Scheduler(format!(
                "cancellation of {} rejected",
                failing
            )));
        }

        for identifier in identifiers {
            state.pending.remove(identifier);
        }
        Ok(())
    }

    async fn register(&self, request: ScheduleRequest) -> Result<(), DeliveryError> {
        let mut state = self.state.lock().await;
        state.calls.push(DeliveryCall::Register(request.identifier.clone()));

        if state.authorization == AuthorizationStatus::Denied {
            return Err(DeliveryError::NotAuthorized);
        }
        if state.failing_registrations.contains(&request.identifier) {
            return Err(DeliveryError::Scheduler(format!(
                "registration of {} rejected",
                request.identifier
            )));
        }
        if let Some(limit) = state.capacity {
            if !state.pending.contains_key(&request.identifier) && state.pending.len() >= limit {
                return Err(DeliveryError::CapacityExceeded { limit });
            }
        }

        state.pending.insert(request.identifier.clone(), request);
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<ScheduleRequest>, DeliveryError> {
        Ok(self.state.lock().await.pending.values().cloned().collect())
    }
}
