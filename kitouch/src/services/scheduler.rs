/// Local notification center
/// Delivery port backed by tokio-cron-scheduler: every pending reminder is
/// a job in the local time zone, keyed by its schedule identifier.
/// Full-date reminders run once, everything else follows a cron schedule.
/// Fired reminders are published on a broadcast channel.
use crate::config::DELIVERED_CHANNEL_CAPACITY;
use crate::error::{AppError, DeliveryError, Result};
use crate::services::content::ReminderContent;
use crate::services::delivery::{AuthorizationStatus, DeliveryPort, ScheduleRequest};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

/// A reminder that fired
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeliveredNotification {
    pub identifier: String,
    pub content: ReminderContent,
    pub delivered_at: DateTime<Utc>,
}

struct ScheduledJob {
    job_id: Uuid,
    request: ScheduleRequest,
}

type JobTable = Arc<RwLock<HashMap<String, ScheduledJob>>>;

type DeliveryFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// What a job does with itself once its reminder is out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterDelivery {
    /// Repeating reminder, stays pending
    Keep,
    /// Drop the pending entry; the scheduler discards the job itself
    Forget,
    /// Drop the pending entry and remove the cron job
    ForgetAndRemove,
}

/// Notification center for the running process
pub struct LocalNotificationCenter {
    scheduler: Arc<RwLock<JobScheduler>>,
    jobs: JobTable,
    authorization: Arc<RwLock<AuthorizationStatus>>,
    capacity: usize,
    delivered_tx: broadcast::Sender<DeliveredNotification>,
}

impl LocalNotificationCenter {
    /// Create new notification center holding at most `capacity` pending entries
    pub async fn new(capacity: usize) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;
        let (delivered_tx, _) = broadcast::channel(DELIVERED_CHANNEL_CAPACITY);

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            authorization: Arc::new(RwLock::new(AuthorizationStatus::NotDetermined)),
            capacity,
            delivered_tx,
        })
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Notification scheduler started");
        Ok(())
    }

    /// Shutdown scheduler gracefully
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to shutdown scheduler: {}", e)))?;
        tracing::info!("Notification scheduler shutdown");
        Ok(())
    }

    /// Receive every reminder delivered from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveredNotification> {
        self.delivered_tx.subscribe()
    }

    /// Record the user's answer to the permission prompt
    pub async fn set_authorization(&self, status: AuthorizationStatus) {
        *self.authorization.write().await = status;
        tracing::info!("Notification authorization set to {:?}", status);
    }

    /// Job for `request`, or `None` when it names a single instant already past.
    ///
    /// A full-date trigger that does not repeat runs as a one-shot job the
    /// scheduler drops after it fires. Everything else is a cron job.
    fn build_job(
        &self,
        request: &ScheduleRequest,
    ) -> std::result::Result<Option<Job>, DeliveryError> {
        let trigger = &request.trigger;

        if let Some(at) = trigger.fire_at().filter(|_| !trigger.repeats) {
            let target = Local.from_local_datetime(&at).earliest().ok_or_else(|| {
                DeliveryError::InvalidTrigger(format!(
                    "{}: {} does not exist in local time",
                    request.identifier, at
                ))
            })?;

            let Ok(delay) = (target - Local::now()).to_std() else {
                tracing::warn!("Reminder {} at {} is in the past, not scheduled", request.identifier, at);
                return Ok(None);
            };

            return Job::new_one_shot_async(delay, self.delivery(request, AfterDelivery::Forget))
                .map(Some)
                .map_err(|e| DeliveryError::InvalidTrigger(format!("{} ({}): {}", request.identifier, at, e)));
        }

        let after = if trigger.repeats {
            AfterDelivery::Keep
        } else {
            AfterDelivery::ForgetAndRemove
        };
        let cron_expr = trigger.to_cron();

        Job::new_async_tz(cron_expr.as_str(), Local, self.delivery(request, after))
            .map(Some)
            .map_err(|e| DeliveryError::InvalidTrigger(format!("{} ({}): {}", request.identifier, cron_expr, e)))
    }

    fn delivery(
        &self,
        request: &ScheduleRequest,
        after: AfterDelivery,
    ) -> impl FnMut(Uuid, JobScheduler) -> DeliveryFuture + Send + Sync + 'static {
        let identifier = request.identifier.clone();
        let content = request.content.clone();
        let delivered_tx = self.delivered_tx.clone();
        let jobs = Arc::clone(&self.jobs);

        move |job_id: Uuid, scheduler: JobScheduler| -> DeliveryFuture {
            let identifier = identifier.clone();
            let content = content.clone();
            let delivered_tx = delivered_tx.clone();
            let jobs = Arc::clone(&jobs);

            Box::pin(async move {
                tracing::info!("Delivering reminder {}: {}", identifier, content.body);

                if after != AfterDelivery::Keep {
                    let mut jobs = jobs.write().await;
                    // The identifier may already belong to a newer registration
                    if jobs.get(&identifier).is_some_and(|job| job.job_id == job_id) {
                        jobs.remove(&identifier);
                    }
                }

                let notification = DeliveredNotification {
                    identifier: identifier.clone(),
                    content,
                    delivered_at: Utc::now(),
                };
                if delivered_tx.send(notification).is_err() {
                    tracing::debug!("No listener for delivered reminder {}", identifier);
                }

                if after == AfterDelivery::ForgetAndRemove {
                    if let Err(e) = scheduler.remove(&job_id).await {
                        tracing::error!("Failed to remove one-shot reminder {}: {}", identifier, e);
                    }
                }
            })
        }
    }
}

#[async_trait]
impl DeliveryPort for LocalNotificationCenter {
    async fn authorization_status(&self) -> AuthorizationStatus {
        *self.authorization.read().await
    }

    async fn request_authorization(&self) -> std::result::Result<AuthorizationStatus, DeliveryError> {
        // No system prompt exists for in-process delivery; an undecided state
        // is taken as consent, an explicit denial is kept.
        let mut status = self.authorization.write().await;
        if *status == AuthorizationStatus::NotDetermined {
            *status = AuthorizationStatus::Granted;
        }
        Ok(*status)
    }

    async fn cancel(&self, identifiers: &[String]) -> std::result::Result<(), DeliveryError> {
        let mut jobs = self.jobs.write().await;
        let scheduler = self.scheduler.read().await;

        for identifier in identifiers {
            if let Some(job) = jobs.remove(identifier) {
                scheduler.remove(&job.job_id).await.map_err(|e| {
                    DeliveryError::Scheduler(format!("Failed to remove {}: {}", identifier, e))
                })?;
                tracing::debug!("Cancelled reminder {}", identifier);
            }
        }

        Ok(())
    }

    async fn register(&self, request: ScheduleRequest) -> std::result::Result<(), DeliveryError> {
        if *self.authorization.read().await == AuthorizationStatus::Denied {
            return Err(DeliveryError::NotAuthorized);
        }

        let mut jobs = self.jobs.write().await;
        if !jobs.contains_key(&request.identifier) && jobs.len() >= self.capacity {
            return Err(DeliveryError::CapacityExceeded {
                limit: self.capacity,
            });
        }

        let job = self.build_job(&request)?;

        let scheduler = self.scheduler.read().await;
        if let Some(previous) = jobs.remove(&request.identifier) {
            scheduler
                .remove(&previous.job_id)
                .await
                .map_err(|e| DeliveryError::Scheduler(format!("Failed to replace job: {}", e)))?;
        }

        let Some(job) = job else {
            return Ok(());
        };
        let job_id = job.guid();
        scheduler
            .add(job)
            .await
            .map_err(|e| DeliveryError::Scheduler(format!("Failed to schedule job: {}", e)))?;

        tracing::info!(
            "Reminder {} scheduled ({})",
            request.identifier,
            request.trigger.to_cron()
        );
        jobs.insert(request.identifier.clone(), ScheduledJob { job_id, request });

        Ok(())
    }

    async fn list_pending(&self) -> std::result::Result<Vec<ScheduleRequest>, DeliveryError> {
        let jobs = self.jobs.read().await;
        let mut pending: Vec<ScheduleRequest> =
            jobs.values().map(|job| job.request.clone()).collect();
        pending.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(pending)
    }
}
