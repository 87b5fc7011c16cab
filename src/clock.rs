/// Fixed-offset reference clock
/// Cutoffs are defined in EDT, which is modelled as a constant UTC-4 offset.
/// No daylight-saving handling.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::calendar::CalendarError;

/// Offset between UTC and EDT, in hours
pub const UTC_EDT_OFFSET_HOURS: i32 = 4;

pub const MIN_OFFSET_HOURS: i32 = -12;
pub const MAX_OFFSET_HOURS: i32 = 14;

/// Hours to subtract from UTC to reach the reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceOffset(i32);

impl ReferenceOffset {
    pub fn hours(hours: i32) -> Result<Self, CalendarError> {
        if !(MIN_OFFSET_HOURS..=MAX_OFFSET_HOURS).contains(&hours) {
            return Err(CalendarError::InvalidOffset(hours));
        }
        Ok(Self(hours))
    }

    pub fn as_hours(&self) -> i32 {
        self.0
    }

    /// Wall-clock date and hour of `instant` in the reference timezone.
    /// `None` when the shift leaves chrono's representable range.
    pub fn local_date_hour(&self, instant: DateTime<Utc>) -> Option<(NaiveDate, u32)> {
        let local = instant
            .naive_utc()
            .checked_sub_signed(Duration::hours(i64::from(self.0)))?;
        Some((local.date(), local.hour()))
    }

    /// UTC instant for `hour` o'clock reference time on `date`.
    ///
    /// `hour + offset` may leave 0..24; the excess rolls into the
    /// neighbouring day instead of producing an invalid hour field.
    pub fn utc_at(&self, date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
        let utc_hours = i64::from(hour) + i64::from(self.0);
        Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
            .checked_add_signed(Duration::hours(utc_hours))
    }
}

impl Default for ReferenceOffset {
    fn default() -> Self {
        Self(UTC_EDT_OFFSET_HOURS)
    }
}

/// How the order's UTC hour is mapped into the reference timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HourConversion {
    /// Shift the whole instant; hour is always 0-23 and the date follows it
    #[default]
    Wrapped,
    /// Raw `hour_utc - offset` on the UTC date. Hours may go negative,
    /// which always counts as making the cutoff.
    Legacy,
}

impl FromStr for HourConversion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wrapped" => Ok(HourConversion::Wrapped),
            "legacy" => Ok(HourConversion::Legacy),
            other => Err(format!("unknown hour conversion '{}' (expected wrapped or legacy)", other)),
        }
    }
}

/// Order time as seen from the reference timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTime {
    /// Calendar date the business-day advance starts from
    pub date: NaiveDate,
    /// Hour compared against the cutoff; negative only in legacy mode
    pub hour: i32,
}

impl HourConversion {
    /// `None` only when the wrapped shift leaves chrono's range
    pub fn reference_time(&self, instant: DateTime<Utc>, offset: ReferenceOffset) -> Option<ReferenceTime> {
        match self {
            HourConversion::Wrapped => {
                let (date, hour) = offset.local_date_hour(instant)?;
                Some(ReferenceTime { date, hour: hour as i32 })
            }
            HourConversion::Legacy => Some(ReferenceTime {
                date: instant.date_naive(),
                hour: instant.hour() as i32 - offset.as_hours(),
            }),
        }
    }
}

/// RFC-1123 rendering, e.g. `Tue, 05 Mar 2024 19:00:00 GMT`
pub fn to_utc_string(instant: DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}



/// Kani formal verification proofs
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    #[kani::proof]
    fn offset_accepts_exactly_real_world_range() {
        let hours: i32 = kani::any();
        let accepted = ReferenceOffset::hours(hours).is_ok();
        let expected = (MIN_OFFSET_HOURS..=MAX_OFFSET_HOURS).contains(&hours);
        kani::assert(accepted == expected, "offset validation must match the declared range");
    }

    #[kani::proof]
    fn accepted_offset_round_trips() {
        let hours: i32 = kani::any();
        if let Ok(offset) = ReferenceOffset::hours(hours) {
            kani::assert(offset.as_hours() == hours, "offset must keep its hours");
        }
    }
}
