//! Reminder policy
//!
//! Maps a contact's reminder configuration to the reminder instances that
//! should currently be scheduled. Pure: no I/O, no clock reads.

use crate::config::{
    BIRTHDAY_ADVANCE_ID_PREFIX, BIRTHDAY_ID_PREFIX, BIRTHDAY_REMINDER_HOUR, HALF_YEAR_MONTHS,
    KEEP_IN_TOUCH_ID_PREFIX, KEEP_IN_TOUCH_SECOND_LEG_ID_PREFIX, MAX_BIRTHDAY_ADVANCE_DAYS,
    MIN_BIRTHDAY_ADVANCE_DAYS,
};
use crate::database::{BirthdayDate, Contact, RecurrenceKind, ReminderConfig};
use crate::services::calendar::{add_months, half_year_month, subtract_days};
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a scheduled reminder is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Birthday,
    BirthdayAdvance,
    KeepInTouch,
    KeepInTouchHalfYearSecondLeg,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 4] = [
        ReminderKind::Birthday,
        ReminderKind::BirthdayAdvance,
        ReminderKind::KeepInTouch,
        ReminderKind::KeepInTouchHalfYearSecondLeg,
    ];

    fn prefix(self) -> &'static str {
        match self {
            ReminderKind::Birthday => BIRTHDAY_ID_PREFIX,
            ReminderKind::BirthdayAdvance => BIRTHDAY_ADVANCE_ID_PREFIX,
            ReminderKind::KeepInTouch => KEEP_IN_TOUCH_ID_PREFIX,
            ReminderKind::KeepInTouchHalfYearSecondLeg => KEEP_IN_TOUCH_SECOND_LEG_ID_PREFIX,
        }
    }

    /// Deterministic schedule identifier for this kind of reminder of a contact
    pub fn identifier(self, contact_id: Uuid) -> String {
        format!("{}{}", self.prefix(), contact_id)
    }

    /// Every identifier a contact can ever own
    pub fn all_identifiers(contact_id: Uuid) -> Vec<String> {
        Self::ALL.iter().map(|kind| kind.identifier(contact_id)).collect()
    }

    /// Split a schedule identifier back into kind and contact
    pub fn parse_identifier(identifier: &str) -> Option<(ReminderKind, Uuid)> {
        // "birthday_" is a prefix of "birthday_advance_", so a failed UUID
        // parse means the next kind must be tried.
        Self::ALL.iter().find_map(|kind| {
            identifier
                .strip_prefix(kind.prefix())
                .and_then(|rest| Uuid::parse_str(rest).ok())
                .map(|id| (*kind, id))
        })
    }
}

/// One concrete reminder derived from a contact's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderInstance {
    pub identifier: String,
    pub kind: ReminderKind,
    /// Local wall-clock time of the reference occurrence. For birthdays the
    /// year is a fixed reference year, never the year of birth.
    pub start: NaiveDateTime,
    pub recurrence: RecurrenceKind,
    /// Lead time of an advance reminder, zero for every other kind
    pub days_before: u32,
}

/// Decides which reminders a contact should have
#[derive(Debug, Clone, Copy)]
pub struct ReminderPolicy {
    birthday_hour: u32,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            birthday_hour: BIRTHDAY_REMINDER_HOUR,
        }
    }
}

impl ReminderPolicy {
    pub fn new(birthday_hour: u32) -> Self {
        Self { birthday_hour }
    }

    pub fn enumerate_contact(&self, contact: &Contact) -> Vec<ReminderInstance> {
        self.enumerate(contact.id, &contact.reminders)
    }

    /// Reminder instances that should exist for `config`.
    ///
    /// Kinds whose preconditions are not met are left out; an empty result
    /// is a normal outcome.
    pub fn enumerate(&self, contact_id: Uuid, config: &ReminderConfig) -> Vec<ReminderInstance> {
        let mut instances = Vec::with_capacity(ReminderKind::ALL.len());

        if config.birthday_reminder_enabled {
            if let Some(birthday) = &config.birthday {
                self.push_birthday(&mut instances, contact_id, birthday, config);
            }
        }

        if config.keep_in_touch_enabled {
            Self::push_keep_in_touch(&mut instances, contact_id, config);
        }

        instances
    }

    fn push_birthday(
        &self,
        instances: &mut Vec<ReminderInstance>,
        contact_id: Uuid,
        birthday: &BirthdayDate,
        config: &ReminderConfig,
    ) {
        let Some(date) = birthday.anniversary() else {
            tracing::warn!("Skipping birthday reminders for {}: invalid birthday", contact_id);
            return;
        };
        let Some(start) = date.and_hms_opt(self.birthday_hour, 0, 0) else {
            tracing::warn!("Invalid birthday reminder hour {}", self.birthday_hour);
            return;
        };

        instances.push(ReminderInstance {
            identifier: ReminderKind::Birthday.identifier(contact_id),
            kind: ReminderKind::Birthday,
            start,
            recurrence: RecurrenceKind::Yearly,
            days_before: 0,
        });

        if !config.birthday_advance_reminder_enabled {
            return;
        }

        let days_before = config
            .birthday_advance_days
            .clamp(MIN_BIRTHDAY_ADVANCE_DAYS, MAX_BIRTHDAY_ADVANCE_DAYS);

        if let Some(advance) = subtract_days(date, days_before) {
            instances.push(ReminderInstance {
                identifier: ReminderKind::BirthdayAdvance.identifier(contact_id),
                kind: ReminderKind::BirthdayAdvance,
                start: advance.and_time(start.time()),
                recurrence: RecurrenceKind::Yearly,
                days_before,
            });
        }
    }

    fn push_keep_in_touch(
        instances: &mut Vec<ReminderInstance>,
        contact_id: Uuid,
        config: &ReminderConfig,
    ) {
        let anchor = config.keep_in_touch_anchor;
        let recurrence = config.keep_in_touch_recurrence;

        instances.push(ReminderInstance {
            identifier: ReminderKind::KeepInTouch.identifier(contact_id),
            kind: ReminderKind::KeepInTouch,
            start: anchor,
            recurrence,
            days_before: 0,
        });

        if recurrence != RecurrenceKind::HalfYearly {
            return;
        }

        // A repeating trigger cannot express a six month period, so the
        // opposite half of the year gets its own yearly leg.
        match add_months(anchor, HALF_YEAR_MONTHS) {
            Some(second) => {
                debug_assert_eq!(second.month(), half_year_month(anchor.month()));
                instances.push(ReminderInstance {
                    identifier: ReminderKind::KeepInTouchHalfYearSecondLeg.identifier(contact_id),
                    kind: ReminderKind::KeepInTouchHalfYearSecondLeg,
                    start: second,
                    recurrence,
                    days_before: 0,
                });
            }
            None => {
                tracing::warn!("Keep-in-touch anchor {} has no second half-year leg", anchor);
            }
        }
    }
}
