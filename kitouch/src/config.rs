//! Application configuration constants
//!
//! Central location for reminder constants, resource limits,
//! and validation boundaries used throughout the application.

// ===== Logging =====

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "kitouch=debug,info";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "KITOUCH_DATA_DIR";

/// Directory name created under the platform data directory
pub const APP_DIR_NAME: &str = "kitouch";

// ===== Birthday Reminders =====

/// Hour of day (local time) at which birthday reminders fire
pub const BIRTHDAY_REMINDER_HOUR: u32 = 10;

/// Minimum number of days an advance birthday reminder fires early
pub const MIN_BIRTHDAY_ADVANCE_DAYS: u32 = 1;

/// Maximum number of days an advance birthday reminder fires early
pub const MAX_BIRTHDAY_ADVANCE_DAYS: u32 = 15;

/// Default advance for the "birthday is coming" reminder
pub const DEFAULT_BIRTHDAY_ADVANCE_DAYS: u32 = 1;

/// Leap year used to validate birthdays without a year and to place
/// 29 February birthdays on a calendar.
pub const LEAP_REFERENCE_YEAR: i32 = 2000;

/// Non-leap year birthdays are placed in for date arithmetic. The birth
/// year itself never takes part, so 1 March minus one day is 28 February.
pub const COMMON_REFERENCE_YEAR: i32 = 2001;

/// Year value older stores wrote when only day and month were known
pub const LEGACY_SENTINEL_BIRTH_YEAR: i32 = 1;

// ===== Keep In Touch =====

/// Months between the two legs of a half-yearly reminder
pub const HALF_YEAR_MONTHS: u32 = 6;

// ===== Delivery =====

/// Maximum pending notifications the local notification center accepts.
/// Mirrors the platform limit on scheduled local notifications.
pub const MAX_PENDING_NOTIFICATIONS: usize = 64;

/// Capacity of the broadcast channel carrying delivered notifications
pub const DELIVERED_CHANNEL_CAPACITY: usize = 32;

// ===== Identifiers & Payload =====

pub const BIRTHDAY_ID_PREFIX: &str = "birthday_";
pub const BIRTHDAY_ADVANCE_ID_PREFIX: &str = "birthday_advance_";
pub const KEEP_IN_TOUCH_ID_PREFIX: &str = "keep_in_touch_";
pub const KEEP_IN_TOUCH_SECOND_LEG_ID_PREFIX: &str = "keep_in_touch_second_";

/// Navigation target carried in every reminder payload
pub const NAVIGATION_CONTACT_DETAIL: &str = "contactDetail";

/// Scheme used for contact deep links
pub const DEEP_LINK_SCHEME: &str = "kitouch";

// ===== Contact Limits =====

/// Maximum length of a contact name
pub const MAX_CONTACT_NAME_LENGTH: usize = 200;
