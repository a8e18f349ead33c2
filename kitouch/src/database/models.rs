//! Database models
//!
//! Domain structs persisted by the repository: contacts with their
//! reminder configuration, connect channels and interactions.
//! All models use serde so they can be handed to a frontend as JSON.

use crate::config::{
    COMMON_REFERENCE_YEAR, DEFAULT_BIRTHDAY_ADVANCE_DAYS, LEAP_REFERENCE_YEAR,
    LEGACY_SENTINEL_BIRTH_YEAR,
};
use crate::error::{AppError, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Repetition policy of a keep-in-touch reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
    HalfYearly,
    Yearly,
    Never,
}

impl RecurrenceKind {
    pub const ALL: [RecurrenceKind; 6] = [
        RecurrenceKind::Daily,
        RecurrenceKind::Weekly,
        RecurrenceKind::Monthly,
        RecurrenceKind::HalfYearly,
        RecurrenceKind::Yearly,
        RecurrenceKind::Never,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceKind::Daily => "daily",
            RecurrenceKind::Weekly => "weekly",
            RecurrenceKind::Monthly => "monthly",
            RecurrenceKind::HalfYearly => "half_yearly",
            RecurrenceKind::Yearly => "yearly",
            RecurrenceKind::Never => "never",
        }
    }

    /// Whether a trigger built for this recurrence fires more than once
    pub fn repeats(self) -> bool {
        self != RecurrenceKind::Never
    }
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Accept both storage keys and the labels shown in the picker
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RecurrenceKind::Daily),
            "weekly" => Ok(RecurrenceKind::Weekly),
            "monthly" => Ok(RecurrenceKind::Monthly),
            "half_yearly" | "every 6 months" => Ok(RecurrenceKind::HalfYearly),
            "yearly" => Ok(RecurrenceKind::Yearly),
            "never" => Ok(RecurrenceKind::Never),
            other => Err(format!("Unknown recurrence: {}", other)),
        }
    }
}

/// Day and month of a birthday, with the year when it is known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthdayDate {
    month: u32,
    day: u32,
    year: Option<i32>,
}

impl BirthdayDate {
    /// Build a birthday, rejecting day/month combinations that never exist.
    ///
    /// Without a year the check runs against a leap year, so 29 February
    /// is accepted.
    pub fn new(month: u32, day: u32, year: Option<i32>) -> Result<Self> {
        let check_year = year.unwrap_or(LEAP_REFERENCE_YEAR);
        if NaiveDate::from_ymd_opt(check_year, month, day).is_none() {
            return Err(AppError::Validation(format!(
                "Invalid birthday: month {} day {} year {:?}",
                month, day, year
            )));
        }

        Ok(Self { month, day, year })
    }

    /// Convert a full date written by older stores, where year 1 meant
    /// "year unknown".
    pub fn from_legacy(date: NaiveDate) -> Self {
        let year = Some(date.year()).filter(|y| *y != LEGACY_SENTINEL_BIRTH_YEAR);
        Self {
            month: date.month(),
            day: date.day(),
            year,
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn is_leap_day(&self) -> bool {
        self.month == 2 && self.day == 29
    }

    /// The anniversary placed in a fixed reference year, for calendar
    /// arithmetic that must not depend on the year of birth.
    ///
    /// Returns `None` only for values that bypassed `new` (e.g. hand-edited JSON).
    pub fn anniversary(&self) -> Option<NaiveDate> {
        let year = if self.is_leap_day() {
            LEAP_REFERENCE_YEAR
        } else {
            COMMON_REFERENCE_YEAR
        };
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

/// Per-contact reminder preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default)]
    pub birthday: Option<BirthdayDate>,
    #[serde(default)]
    pub birthday_reminder_enabled: bool,
    #[serde(default)]
    pub birthday_advance_reminder_enabled: bool,
    /// Only used when both birthday toggles are on
    #[serde(default = "default_advance_days")]
    pub birthday_advance_days: u32,
    #[serde(default)]
    pub keep_in_touch_enabled: bool,
    /// First occurrence, local wall-clock time
    pub keep_in_touch_anchor: NaiveDateTime,
    #[serde(default = "default_recurrence")]
    pub keep_in_touch_recurrence: RecurrenceKind,
}

fn default_advance_days() -> u32 {
    DEFAULT_BIRTHDAY_ADVANCE_DAYS
}

fn default_recurrence() -> RecurrenceKind {
    RecurrenceKind::Monthly
}

impl Default for ReminderConfig {
    fn default() -> Self {
        let now = Local::now().naive_local();
        let anchor = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);

        Self {
            birthday: None,
            birthday_reminder_enabled: false,
            birthday_advance_reminder_enabled: false,
            birthday_advance_days: default_advance_days(),
            keep_in_touch_enabled: false,
            keep_in_touch_anchor: anchor,
            keep_in_touch_recurrence: default_recurrence(),
        }
    }
}

/// Relationship category of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactType {
    Relative,
    Colleague,
    Friend,
    Unknown,
    Other,
}

impl ContactType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactType::Relative => "Relative",
            ContactType::Colleague => "Colleague",
            ContactType::Friend => "Friend",
            ContactType::Unknown => "Unknown",
            ContactType::Other => "Other",
        }
    }
}

impl FromStr for ContactType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Relative" => Ok(ContactType::Relative),
            "Colleague" => Ok(ContactType::Colleague),
            "Friend" => Ok(ContactType::Friend),
            "Unknown" => Ok(ContactType::Unknown),
            "Other" => Ok(ContactType::Other),
            other => Err(format!("Unknown contact type: {}", other)),
        }
    }
}

/// Social network or messaging service a contact can be reached on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocialMediaType {
    Vk,
    Facebook,
    Instagram,
    X,
    LinkedIn,
    Teams,
    Email,
}

impl SocialMediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            SocialMediaType::Vk => "VK",
            SocialMediaType::Facebook => "facebook",
            SocialMediaType::Instagram => "instagram",
            SocialMediaType::X => "X",
            SocialMediaType::LinkedIn => "linkedin",
            SocialMediaType::Teams => "teams",
            SocialMediaType::Email => "e-mail",
        }
    }

    /// Asset name of the service icon
    pub fn icon(self) -> &'static str {
        match self {
            SocialMediaType::Vk => "vk",
            SocialMediaType::Facebook => "FB",
            SocialMediaType::Instagram => "instagram",
            SocialMediaType::X => "X-twitter",
            SocialMediaType::LinkedIn => "linkedin",
            SocialMediaType::Teams => "teams",
            SocialMediaType::Email => "email",
        }
    }
}

impl FromStr for SocialMediaType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "VK" => Ok(SocialMediaType::Vk),
            "facebook" => Ok(SocialMediaType::Facebook),
            "instagram" => Ok(SocialMediaType::Instagram),
            "X" => Ok(SocialMediaType::X),
            "linkedin" => Ok(SocialMediaType::LinkedIn),
            "teams" => Ok(SocialMediaType::Teams),
            "e-mail" => Ok(SocialMediaType::Email),
            other => Err(format!("Unknown social media type: {}", other)),
        }
    }
}

/// A handle on one social network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectChannel {
    pub id: Uuid,
    pub social_media_type: SocialMediaType,
    pub login: String,
}

impl ConnectChannel {
    pub fn new(social_media_type: SocialMediaType, login: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            social_media_type,
            login: login.into(),
        }
    }
}

/// A person being kept in touch with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub contact_type: ContactType,
    /// Free-text label used when `contact_type` is `Other`
    pub custom_contact_type: String,
    /// Emoji or avatar asset name
    pub image_name: String,
    pub phone: String,
    pub last_message: Option<DateTime<Utc>>,
    pub count_messages: u32,
    /// Identifier of the address-book entry this contact was imported from
    pub system_contact_id: Option<String>,
    pub reminders: ReminderConfig,
    pub connect_channels: Vec<ConnectChannel>,
}

impl Contact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            contact_type: ContactType::Unknown,
            custom_contact_type: String::new(),
            image_name: String::new(),
            phone: String::new(),
            last_message: None,
            count_messages: 0,
            system_contact_id: None,
            reminders: ReminderConfig::default(),
            connect_channels: Vec::new(),
        }
    }
}

/// Kind of a logged interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Call,
    Meeting,
    Message,
    Email,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::Call => "call",
            InteractionKind::Meeting => "meeting",
            InteractionKind::Message => "message",
            InteractionKind::Email => "email",
        }
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "call" => Ok(InteractionKind::Call),
            "meeting" => Ok(InteractionKind::Meeting),
            "message" => Ok(InteractionKind::Message),
            "email" => Ok(InteractionKind::Email),
            other => Err(format!("Unknown interaction kind: {}", other)),
        }
    }
}

/// A logged call, meeting or message with a contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub date: DateTime<Utc>,
    pub notes: String,
    pub kind: InteractionKind,
}

impl Interaction {
    pub fn new(contact_id: Uuid, kind: InteractionKind, notes: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id,
            date: Utc::now(),
            notes: notes.into(),
            kind,
        }
    }
}
