use std::{collections::HashSet, str::FromStr};

use chrono::{DateTime, Datelike as _, NaiveDate, NaiveTime, TimeZone as _, Utc, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkdayError {
    #[error("weekday index {0} is outside 0 (Sunday) ..= 6 (Saturday)")]
    WeekdayIndex(u8),
    #[error("invalid weekend list `{0}`")]
    WeekendList(String),
    #[error("invalid date `{0}` (expected YYYY-MM-DD)")]
    Date(String),
}

/// Weekdays that never count as working days.
///
/// Stored as a bitmask indexed the same way the front end numbers weekdays:
/// bit 0 is Sunday, bit 6 is Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekendPolicy(u8);

impl WeekendPolicy {
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Self {
        Self(days.into_iter().fold(0u8, |mask, day| mask | 1 << day.num_days_from_sunday()))
    }

    pub fn from_indices(indices: impl IntoIterator<Item = u8>) -> Result<Self, WorkdayError> {
        let mut mask = 0u8;
        for index in indices {
            if index > 6 {
                return Err(WorkdayError::WeekdayIndex(index));
            }
            mask |= 1 << index;
        }

        Ok(Self(mask))
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn indices(&self) -> Vec<u8> {
        (0..7).filter(|index| self.0 & (1 << index) != 0).collect()
    }
}

impl Default for WeekendPolicy {
    fn default() -> Self {
        Self::new([Weekday::Sun, Weekday::Sat])
    }
}

/// Parses a comma separated list of weekday indices, e.g. `5,6` for a Friday/Saturday weekend
impl FromStr for WeekendPolicy {
    type Err = WorkdayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let indices = s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<u8>().map_err(|_| WorkdayError::WeekendList(s.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_indices(indices)
    }
}

/// Public holidays keyed by their canonical `YYYY-MM-DD` form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet(HashSet<String>);

impl HolidaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.0.insert(date.format(ISO_DATE_FORMAT).to_string())
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.0.contains(canonical)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn union(&self, other: &HolidaySet) -> HolidaySet {
        Self(self.0.union(&other.0).cloned().collect())
    }
}

impl FromIterator<NaiveDate> for HolidaySet {
    fn from_iter<T: IntoIterator<Item = NaiveDate>>(iter: T) -> Self {
        let mut set = Self::new();
        for date in iter {
            set.insert(date);
        }
        set
    }
}

/// Parses a comma separated list of `YYYY-MM-DD` dates
impl FromStr for HolidaySet {
    type Err = WorkdayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(parse_calendar_date)
            .collect()
    }
}

/// Strict `YYYY-MM-DD` parsing. chrono alone would also accept signed or
/// unpadded years, which the form never produces.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate, WorkdayError> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !well_formed {
        return Err(WorkdayError::Date(value.to_string()));
    }

    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
        .map_err(|_| WorkdayError::Date(value.to_string()))
}

/// First instant of `date` on the wall clock of `tz`.
///
/// Usually local midnight. Zones that start DST at midnight skip 00:00, in
/// which case the first hour that exists is used so the day keeps its identity.
pub fn local_midnight(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

pub fn canonical_date(day: &DateTime<Tz>) -> String {
    day.format(ISO_DATE_FORMAT).to_string()
}

pub fn today(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

pub fn today_iso(tz: &Tz) -> String {
    today(tz).format(ISO_DATE_FORMAT).to_string()
}

/// Counts working days in the inclusive range between `start` and `end`.
///
/// The bounds may come in either order. Each day is evaluated at its local
/// midnight in `tz`, skipped when its weekday is in `weekend` or its canonical
/// date is in `holidays`. With `clamp_to_one` a range without a single working
/// day still reports 1.
pub fn count_working_days(
    start: NaiveDate,
    end: NaiveDate,
    tz: &Tz,
    weekend: &WeekendPolicy,
    holidays: &HolidaySet,
    clamp_to_one: bool,
) -> u32 {
    let (first, last) = if start > end { (end, start) } else { (start, end) };

    let count = first.iter_days()
        .take_while(|date| *date <= last)
        .map(|date| local_midnight(date, tz))
        .filter(|day| !weekend.contains(day.weekday()))
        .filter(|day| holidays.is_empty() || !holidays.contains(&canonical_date(day)))
        .count();

    let count = u32::try_from(count).unwrap_or(u32::MAX);

    if clamp_to_one { count.max(1) } else { count }
}

/// Zone, weekend policy and holidays configured for this deployment
#[derive(Debug, Clone)]
pub struct WorkingDayCalculator {
    time_zone: Tz,
    weekend: WeekendPolicy,
    holidays: HolidaySet,
}

impl WorkingDayCalculator {
    pub fn new(time_zone: Tz, weekend: WeekendPolicy, holidays: HolidaySet) -> Self {
        Self { time_zone, weekend, holidays }
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn count(&self, start: NaiveDate, end: NaiveDate, clamp_to_one: bool) -> u32 {
        count_working_days(start, end, &self.time_zone, &self.weekend, &self.holidays, clamp_to_one)
    }

    /// Same as [`Self::count`] with a per-call weekend override and holidays
    /// added on top of the configured ones
    pub fn count_with(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        weekend: Option<&WeekendPolicy>,
        extra_holidays: &HolidaySet,
        clamp_to_one: bool,
    ) -> u32 {
        let merged;
        let holidays = if extra_holidays.is_empty() {
            &self.holidays
        } else {
            merged = self.holidays.union(extra_holidays);
            &merged
        };

        count_working_days(
            start,
            end,
            &self.time_zone,
            weekend.unwrap_or(&self.weekend),
            holidays,
            clamp_to_one,
        )
    }
}
