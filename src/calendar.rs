//! Cutoff hours per sales channel and working weeks per fulfillment location.
//!
//! Both tables are validated on construction so the estimator can rely on
//! every cutoff being a real hour and every working week having at least
//! one day.

use chrono::{Datelike, Days, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Errors raised while building calendar tables
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("cutoff hour {hour} for channel '{channel}' is outside 0-23")]
    InvalidCutoffHour { channel: String, hour: u32 },
    #[error("sales channel name cannot be empty")]
    EmptyChannel,
    #[error("location code '{0}' must be exactly 2 ASCII letters")]
    InvalidLocationCode(String),
    #[error("location '{0}' has no working days")]
    EmptyWorkWeek(String),
    #[error("weekday index {0} is outside 0 (Sunday) - 6 (Saturday)")]
    InvalidWeekday(u32),
    #[error("UTC offset {0}h is outside -12..=14")]
    InvalidOffset(i32),
    #[error("sales channel '{0}' is listed more than once")]
    DuplicateChannel(String),
    #[error("location '{0}' is listed more than once")]
    DuplicateLocation(String),
}

pub const SUNDAY: u32 = 0;
pub const SATURDAY: u32 = 6;

/// Set of weekdays a fulfillment center operates on, indexed 0=Sunday..6=Saturday.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkWeek(u8);

impl WorkWeek {
    /// Monday through Friday
    pub const WEEKDAYS: WorkWeek = WorkWeek(0b0011_1110);
    /// Monday through Saturday
    pub const MON_TO_SAT: WorkWeek = WorkWeek(0b0111_1110);

    /// Build from weekday indices. Duplicates are ignored.
    pub fn from_days<I>(days: I) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut bits = 0u8;
        for day in days {
            if day > SATURDAY {
                return Err(CalendarError::InvalidWeekday(day));
            }
            bits |= 1 << day;
        }
        Ok(WorkWeek(bits))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, weekday_index: u32) -> bool {
        weekday_index <= SATURDAY && self.0 & (1 << weekday_index) != 0
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(weekday_index(date))
    }

    /// Weekday indices in ascending order
    pub fn days(&self) -> Vec<u32> {
        (SUNDAY..=SATURDAY).filter(|d| self.contains(*d)).collect()
    }

    /// First date on or after `date` that falls on a working day.
    ///
    /// Returns `None` only for an empty week; a non-empty week always
    /// matches within 7 days.
    pub fn first_workday_on_or_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut candidate = date;
        for _ in 0..7 {
            if self.contains_date(candidate) {
                return Some(candidate);
            }
            candidate = candidate.checked_add_days(Days::new(1))?;
        }
        None
    }
}

impl fmt::Debug for WorkWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WorkWeek").field(&self.days()).finish()
    }
}

/// Weekday index with Sunday as 0, matching the calendar tables
pub fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// Channel name -> cutoff hour in the reference timezone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutoffTable {
    hours: HashMap<String, u32>,
}

impl CutoffTable {
    pub fn new<I, S>(entries: I) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let mut hours = HashMap::new();
        for (channel, hour) in entries {
            let channel = channel.as_ref().trim().to_lowercase();
            if channel.is_empty() {
                return Err(CalendarError::EmptyChannel);
            }
            if hour > 23 {
                return Err(CalendarError::InvalidCutoffHour { channel, hour });
            }
            // Keys are compared after normalization, so "retail" and "RETAIL" collide
            if hours.contains_key(&channel) {
                return Err(CalendarError::DuplicateChannel(channel));
            }
            hours.insert(channel, hour);
        }
        Ok(Self { hours })
    }

    /// Case-insensitive lookup
    pub fn cutoff_hour(&self, channel: &str) -> Option<u32> {
        self.hours.get(&channel.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Entries sorted by channel name, for stable logging
    pub fn entries(&self) -> BTreeMap<&str, u32> {
        self.hours.iter().map(|(k, v)| (k.as_str(), *v)).collect()
    }
}

impl Default for CutoffTable {
    fn default() -> Self {
        Self {
            hours: HashMap::from([("wholesale".to_string(), 20), ("retail".to_string(), 15)]),
        }
    }
}

/// Location code -> working week
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkdayCalendar {
    weeks: HashMap<String, WorkWeek>,
}

impl WorkdayCalendar {
    pub fn new<I, S>(entries: I) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = (S, WorkWeek)>,
        S: AsRef<str>,
    {
        let mut weeks = HashMap::new();
        for (code, week) in entries {
            let code = code.as_ref().trim();
            if !is_location_code(code) {
                return Err(CalendarError::InvalidLocationCode(code.to_string()));
            }
            if week.is_empty() {
                return Err(CalendarError::EmptyWorkWeek(code.to_string()));
            }
            if weeks.insert(code.to_string(), week).is_some() {
                return Err(CalendarError::DuplicateLocation(code.to_string()));
            }
        }
        Ok(Self { weeks })
    }

    /// Exact, case-sensitive lookup
    pub fn work_week(&self, location: &str) -> Option<WorkWeek> {
        self.weeks.get(location).copied()
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn entries(&self) -> BTreeMap<&str, WorkWeek> {
        self.weeks.iter().map(|(k, v)| (k.as_str(), *v)).collect()
    }
}

impl Default for WorkdayCalendar {
    fn default() -> Self {
        Self {
            weeks: HashMap::from([
                ("CA".to_string(), WorkWeek::MON_TO_SAT),
                ("US".to_string(), WorkWeek::WEEKDAYS),
            ]),
        }
    }
}

fn is_location_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}



/// Kani formal verification proofs
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    #[kani::proof]
    fn contains_never_reads_past_saturday() {
        let bits: u8 = kani::any();
        let day: u32 = kani::any();
        let week = WorkWeek(bits);
        if day > SATURDAY {
            kani::assert(!week.contains(day), "out-of-range weekday is never a workday");
        }
    }
}
