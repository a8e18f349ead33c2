//! User-facing text and payload of reminder notifications

use crate::config::{DEEP_LINK_SCHEME, NAVIGATION_CONTACT_DETAIL};
use crate::services::policy::{ReminderInstance, ReminderKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Data carried by a notification so opening it can route back to a contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub contact_id: Uuid,
    #[serde(rename = "navigation")]
    pub navigation_target: String,
    #[serde(default)]
    pub deep_link: Option<String>,
}

impl ReminderPayload {
    pub fn contact_detail(contact_id: Uuid) -> Self {
        Self {
            contact_id,
            navigation_target: NAVIGATION_CONTACT_DETAIL.to_string(),
            deep_link: Some(format!("{}://contacts/{}", DEEP_LINK_SCHEME, contact_id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderContent {
    pub title: String,
    pub body: String,
    pub payload: ReminderPayload,
    pub category_identifier: String,
    pub thread_identifier: String,
    pub sound: bool,
}

pub struct ReminderContentBuilder;

impl ReminderContentBuilder {
    pub fn build(instance: &ReminderInstance, contact_id: Uuid, name: &str) -> ReminderContent {
        let (title, body, category, thread) = match instance.kind {
            ReminderKind::Birthday => (
                "Birthday!",
                format!("Today is the birthday of {}", name),
                "BIRTHDAY_CATEGORY",
                "birthday_notifications",
            ),
            ReminderKind::BirthdayAdvance => (
                "Birthday!",
                advance_body(instance.days_before, name),
                "BIRTHDAY_CATEGORY",
                "birthday_notifications",
            ),
            ReminderKind::KeepInTouch | ReminderKind::KeepInTouchHalfYearSecondLeg => (
                "Keep in touch",
                format!("Contact with {}", name),
                "KEEP_IN_TOUCH_CATEGORY",
                "keep_in_touch_notifications",
            ),
        };

        ReminderContent {
            title: title.to_string(),
            body,
            payload: ReminderPayload::contact_detail(contact_id),
            category_identifier: category.to_string(),
            thread_identifier: thread.to_string(),
            sound: true,
        }
    }
}

fn advance_body(days_before: u32, name: &str) -> String {
    if days_before <= 1 {
        format!("Tomorrow is the birthday of {}", name)
    } else {
        format!("In {} days is the birthday of {}", days_before, name)
    }
}
