//! Calendar math for reminder triggers
//!
//! Pure functions deriving the calendar components a notification trigger
//! matches against. Every component is read from an already valid
//! `NaiveDateTime`, so a trigger never names a day its month lacks.

use crate::database::RecurrenceKind;
use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// Calendar fields a trigger matches; `None` means "any"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateComponents {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub weekday: Option<Weekday>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

/// Calendar components plus the repeat flag handed to the delivery subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub components: DateComponents,
    pub repeats: bool,
}

impl TriggerSpec {
    /// Render as a cron expression: `sec min hour day-of-month month day-of-week`.
    ///
    /// Missing components become wildcards, a missing second becomes `0`.
    /// The year has no cron field; a trigger naming one is a single instant,
    /// see [`TriggerSpec::fire_at`].
    pub fn to_cron(&self) -> String {
        let c = &self.components;
        let field = |value: Option<u32>| value.map_or_else(|| "*".to_string(), |v| v.to_string());

        format!(
            "{} {} {} {} {} {}",
            c.second.unwrap_or(0),
            field(c.minute),
            field(c.hour),
            field(c.day),
            field(c.month),
            c.weekday.map_or("*", weekday_name),
        )
    }

    /// The one local instant this trigger names, when it pins a full date
    /// and time of day. A missing second is `0`.
    pub fn fire_at(&self) -> Option<NaiveDateTime> {
        let c = &self.components;
        NaiveDate::from_ymd_opt(c.year?, c.month?, c.day?)?.and_hms_opt(
            c.hour?,
            c.minute?,
            c.second.unwrap_or(0),
        )
    }

    /// Whether `at` satisfies every component of this trigger
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        let c = &self.components;
        c.year.map_or(true, |y| y == at.year())
            && c.month.map_or(true, |m| m == at.month())
            && c.day.map_or(true, |d| d == at.day())
            && c.weekday.map_or(true, |w| w == at.weekday())
            && c.hour.map_or(true, |h| h == at.hour())
            && c.minute.map_or(true, |m| m == at.minute())
            && c.second.map_or(true, |s| s == at.second())
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Derive the trigger for one reminder leg starting at `from`.
///
/// `HalfYearly` describes a single leg only: callers pass the anchor and
/// the anchor advanced by six months as two separate references.
/// With `debug_second_granularity` the trigger matches only the second
/// of `from`, which fires once a minute while testing.
pub fn trigger_components(
    from: NaiveDateTime,
    recurrence: RecurrenceKind,
    debug_second_granularity: bool,
) -> TriggerSpec {
    if debug_second_granularity {
        return TriggerSpec {
            components: DateComponents {
                second: Some(from.second()),
                ..DateComponents::default()
            },
            repeats: recurrence.repeats(),
        };
    }

    let hour = Some(from.hour());
    let minute = Some(from.minute());

    let components = match recurrence {
        RecurrenceKind::Daily => DateComponents {
            hour,
            minute,
            ..DateComponents::default()
        },
        RecurrenceKind::Weekly => DateComponents {
            weekday: Some(from.weekday()),
            hour,
            minute,
            ..DateComponents::default()
        },
        RecurrenceKind::Monthly => DateComponents {
            day: Some(from.day()),
            hour,
            minute,
            ..DateComponents::default()
        },
        RecurrenceKind::HalfYearly | RecurrenceKind::Yearly => DateComponents {
            month: Some(from.month()),
            day: Some(from.day()),
            hour,
            minute,
            ..DateComponents::default()
        },
        RecurrenceKind::Never => DateComponents {
            year: Some(from.year()),
            month: Some(from.month()),
            day: Some(from.day()),
            hour,
            minute,
            ..DateComponents::default()
        },
    };

    TriggerSpec {
        components,
        repeats: recurrence.repeats(),
    }
}

/// Month of the opposite half-year leg: 6 and 12 swap, every other month
/// maps to the month six away, so the result always lies in `1..=12`.
pub fn half_year_month(month: u32) -> u32 {
    match month {
        6 => 12,
        12 => 6,
        m => (m + 5) % 12 + 1,
    }
}

/// `date` minus `days` calendar days; crosses month and year boundaries
pub fn subtract_days(date: NaiveDate, days: u32) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(days)))
}

/// `at` plus `months`, clamped to the last day of a shorter target month
pub fn add_months(at: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    at.checked_add_months(Months::new(months))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_components_per_recurrence() {
        // 2025-03-12 is a Wednesday
        let from = at(2025, 3, 12, 18, 45, 30);

        let daily = trigger_components(from, RecurrenceKind::Daily, false);
        assert_eq!(daily.components.hour, Some(18));
        assert_eq!(daily.components.minute, Some(45));
        assert_eq!(daily.components.day, None);
        assert!(daily.repeats);

        let weekly = trigger_components(from, RecurrenceKind::Weekly, false);
        assert_eq!(weekly.components.weekday, Some(Weekday::Wed));
        assert_eq!(weekly.components.month, None);

        let monthly = trigger_components(from, RecurrenceKind::Monthly, false);
        assert_eq!(monthly.components.day, Some(12));
        assert_eq!(monthly.components.month, None);

        let yearly = trigger_components(from, RecurrenceKind::Yearly, false);
        assert_eq!(yearly.components.month, Some(3));
        assert_eq!(yearly.components.day, Some(12));
        assert_eq!(yearly.components.year, None);

        let never = trigger_components(from, RecurrenceKind::Never, false);
        assert_eq!(never.components.year, Some(2025));
        assert!(!never.repeats);
    }

    #[test]
    fn test_half_yearly_leg_keeps_reference_month() {
        let leg = trigger_components(at(2025, 6, 1, 9, 0, 0), RecurrenceKind::HalfYearly, false);
        assert_eq!(leg.components.month, Some(6));
        assert_eq!(leg.components.day, Some(1));
        assert_eq!(leg.components.hour, Some(9));
        assert!(leg.repeats);
    }

    #[test]
    fn test_debug_granularity_overrides_components() {
        let from = at(2025, 3, 12, 18, 45, 30);

        let repeating = trigger_components(from, RecurrenceKind::Yearly, true);
        assert_eq!(
            repeating.components,
            DateComponents {
                second: Some(30),
                ..DateComponents::default()
            }
        );
        assert!(repeating.repeats);

        let once = trigger_components(from, RecurrenceKind::Never, true);
        assert!(!once.repeats);
    }

    #[test]
    fn test_half_year_month_table() {
        assert_eq!(half_year_month(6), 12);
        assert_eq!(half_year_month(12), 6);
        assert_eq!(half_year_month(1), 7);
        assert_eq!(half_year_month(5), 11);
        assert_eq!(half_year_month(7), 1);
        assert_eq!(half_year_month(11), 5);

        for month in 1..=12 {
            let other = half_year_month(month);
            assert!((1..=12).contains(&other));
            assert_eq!(half_year_month(other), month);
        }
    }

    #[test]
    fn test_subtract_days_rolls_over_year() {
        let new_year = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        assert_eq!(
            subtract_days(new_year, 1),
            NaiveDate::from_ymd_opt(2000, 12, 31)
        );

        let march = NaiveDate::from_ymd_opt(2001, 3, 1).unwrap();
        assert_eq!(subtract_days(march, 1), NaiveDate::from_ymd_opt(2001, 2, 28));
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(
            add_months(at(2025, 8, 31, 9, 0, 0), 6),
            Some(at(2026, 2, 28, 9, 0, 0))
        );
        assert_eq!(
            add_months(at(2025, 1, 15, 9, 0, 0), 6),
            Some(at(2025, 7, 15, 9, 0, 0))
        );
    }

    #[test]
    fn test_cron_rendering() {
        let from = at(2025, 3, 12, 18, 45, 0);

        assert_eq!(
            trigger_components(from, RecurrenceKind::Daily, false).to_cron(),
            "0 45 18 * * *"
        );
        assert_eq!(
            trigger_components(from, RecurrenceKind::Weekly, false).to_cron(),
            "0 45 18 * * Wed"
        );
        assert_eq!(
            trigger_components(from, RecurrenceKind::Monthly, false).to_cron(),
            "0 45 18 12 * *"
        );
        assert_eq!(
            trigger_components(from, RecurrenceKind::Yearly, false).to_cron(),
            "0 45 18 12 3 *"
        );
        assert_eq!(
            trigger_components(from, RecurrenceKind::Never, false).to_cron(),
            "0 45 18 12 3 *"
        );
        assert_eq!(
            trigger_components(at(2025, 3, 12, 18, 45, 7), RecurrenceKind::Daily, true).to_cron(),
            "7 * * * * *"
        );
    }

    #[test]
    fn test_fire_at_needs_a_full_date() {
        let from = at(2025, 3, 12, 18, 45, 0);

        assert_eq!(
            trigger_components(from, RecurrenceKind::Never, false).fire_at(),
            Some(from)
        );
        assert_eq!(
            trigger_components(from, RecurrenceKind::Yearly, false).fire_at(),
            None
        );
        assert_eq!(
            trigger_components(from, RecurrenceKind::Never, true).fire_at(),
            None
        );
    }

    #[test]
    fn test_trigger_matches_its_reference() {
        let from = at(2024, 2, 29, 10, 0, 0);
        for recurrence in RecurrenceKind::ALL {
            assert!(trigger_components(from, recurrence, false).matches(from));
        }

        let yearly = trigger_components(from, RecurrenceKind::Yearly, false);
        assert!(yearly.matches(at(2028, 2, 29, 10, 0, 0)));
        assert!(!yearly.matches(at(2028, 2, 28, 10, 0, 0)));
    }
}
