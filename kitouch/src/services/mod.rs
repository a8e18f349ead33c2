//! Services module
//!
//! Reminder engine and the business services around it.

pub mod calendar;
pub mod contacts;
pub mod content;
pub mod delivery;
pub mod policy;
pub mod reconciler;
pub mod reminders;
pub mod router;
pub mod scheduler;
pub mod settings;

pub use calendar::{DateComponents, TriggerSpec};
pub use contacts::ContactsService;
pub use content::{ReminderContent, ReminderContentBuilder, ReminderPayload};
pub use delivery::{
    AuthorizationStatus, DeliveryCall, DeliveryPort, InMemoryDeliveryCenter, ScheduleRequest,
};
pub use policy::{ReminderInstance, ReminderKind, ReminderPolicy};
pub use reconciler::ScheduleReconciler;
pub use reminders::{RemindersService, RescheduleSummary, ScheduleOutcome};
pub use router::{NavigationIntent, NotificationRouter, PendingNavigationStore};
pub use scheduler::{DeliveredNotification, LocalNotificationCenter};
pub use settings::{AppSettings, DeliverySettings, ReminderSettings, SettingsService};
