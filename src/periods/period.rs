//! period.rs
//! Immutable spans of time. Every cached value is keyed by one.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid period '{input}': {reason}")]
    InvalidPeriod { input: String, reason: String },
}

impl PeriodError {
    fn invalid(input: impl Into<String>, reason: impl Into<String>) -> Self {
        PeriodError::InvalidPeriod { input: input.into(), reason: reason.into() }
    }
}

/// Granularity of a period, ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Month,
    Year,
    /// A value that does not depend on time at all.
    Eternity,
}

impl PeriodUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodUnit::Day => "day",
            PeriodUnit::Month => "month",
            PeriodUnit::Year => "year",
            PeriodUnit::Eternity => "eternity",
        }
    }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodUnit {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(PeriodUnit::Day),
            "month" => Ok(PeriodUnit::Month),
            "year" => Ok(PeriodUnit::Year),
            "eternity" => Ok(PeriodUnit::Eternity),
            other => Err(PeriodError::invalid(other, "unknown period unit")),
        }
    }
}

/// `size` consecutive `unit`s starting at `start`. Invariant: `size >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    unit: PeriodUnit,
    start: NaiveDate,
    size: u32,
}

impl Period {
    pub fn new(unit: PeriodUnit, start: NaiveDate, size: u32) -> Result<Self, PeriodError> {
        if unit == PeriodUnit::Eternity {
            return Ok(Self::eternity());
        }
        if size == 0 {
            return Err(PeriodError::invalid(format!("{}:{}:0", unit, start), "size must be at least 1"));
        }
        if end_exclusive(unit, start, size).is_none() {
            return Err(PeriodError::invalid(format!("{}:{}:{}", unit, start, size), "period ends beyond the calendar"));
        }
        Ok(Self { unit, start, size })
    }

    /// The canonical year period: January 1st, size 1.
    pub fn year(year: i32) -> Result<Self, PeriodError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| PeriodError::invalid(year.to_string(), "year out of range"))?;
        Ok(Self { unit: PeriodUnit::Year, start, size: 1 })
    }

    pub fn month(year: i32, month: u32) -> Result<Self, PeriodError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| PeriodError::invalid(format!("{}-{:02}", year, month), "month out of range"))?;
        Ok(Self { unit: PeriodUnit::Month, start, size: 1 })
    }

    pub fn day(date: NaiveDate) -> Self {
        Self { unit: PeriodUnit::Day, start: date, size: 1 }
    }

    pub fn eternity() -> Self {
        Self { unit: PeriodUnit::Eternity, start: NaiveDate::MIN, size: 1 }
    }

    pub fn parse(input: &str) -> Result<Self, PeriodError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("eternity") {
            return Ok(Self::eternity());
        }

        // Explicit form: "unit:start[:size]"
        if trimmed.contains(':') {
            let mut parts = trimmed.split(':');
            let unit: PeriodUnit = parts.next().unwrap_or_default().parse()
                .map_err(|_| PeriodError::invalid(input, "unknown period unit"))?;
            let (start, _) = parse_date_like(parts.next().unwrap_or_default())
                .map_err(|reason| PeriodError::invalid(input, reason))?;
            let size = match parts.next() {
                Some(raw) => raw.parse::<u32>().map_err(|_| PeriodError::invalid(input, "size is not a positive integer"))?,
                None => 1,
            };
            if parts.next().is_some() {
                return Err(PeriodError::invalid(input, "too many ':' separated fields"));
            }
            return Self::new(unit, start, size).map_err(|e| match e {
                PeriodError::InvalidPeriod { reason, .. } => PeriodError::invalid(input, reason),
            });
        }

        let (start, unit) = parse_date_like(trimmed).map_err(|reason| PeriodError::invalid(input, reason))?;
        Ok(Self { unit, start, size: 1 })
    }

    pub fn unit(&self) -> PeriodUnit { self.unit }
    pub fn size(&self) -> u32 { self.size }
    pub fn is_eternal(&self) -> bool { self.unit == PeriodUnit::Eternity }

    /// First day of the period. Formula dispatch and parameter lookups use this instant.
    pub fn start_instant(&self) -> NaiveDate { self.start }

    /// Last day of the period (inclusive).
    pub fn stop_instant(&self) -> NaiveDate {
        if self.is_eternal() {
            return NaiveDate::MAX;
        }
        end_exclusive(self.unit, self.start, self.size).and_then(|d| d.pred_opt()).unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, other: &Period) -> bool {
        self.start <= other.start && other.stop_instant() <= self.stop_instant()
    }

    pub fn overlaps(&self, other: &Period) -> bool {
        self.start <= other.stop_instant() && other.start <= self.stop_instant()
    }

    pub fn first_month(&self) -> Period {
        if self.is_eternal() {
            return *self;
        }
        let start = self.start.with_day(1).unwrap_or(self.start);
        Period { unit: PeriodUnit::Month, start, size: 1 }
    }

    /// The calendar year containing the start of this period.
    pub fn first_year(&self) -> Period {
        if self.is_eternal() {
            return *self;
        }
        let start = NaiveDate::from_ymd_opt(self.start.year(), 1, 1).unwrap_or(self.start);
        Period { unit: PeriodUnit::Year, start, size: 1 }
    }

    /// The calendar-aligned period of `unit` containing the start of this one.
    pub fn enclosing(&self, unit: PeriodUnit) -> Period {
        match unit {
            PeriodUnit::Eternity => Period::eternity(),
            PeriodUnit::Year => self.first_year(),
            PeriodUnit::Month => self.first_month(),
            PeriodUnit::Day => Period::day(self.start),
        }
    }

    /// Shifts the start by `n` units; unit and size are preserved.
    pub fn offset(&self, n: i32, unit: PeriodUnit) -> Result<Period, PeriodError> {
        if self.is_eternal() {
            return Ok(*self);
        }
        let overflow = || PeriodError::invalid(self.to_string(), format!("offset of {} {} overflows", n, unit));
        let start = match unit {
            PeriodUnit::Eternity => return Ok(*self),
            PeriodUnit::Day => self.start.checked_add_signed(Duration::days(n as i64)),
            PeriodUnit::Month => shift_months(self.start, n as i64),
            PeriodUnit::Year => shift_months(self.start, n as i64 * 12),
        }
        .ok_or_else(overflow)?;
        if end_exclusive(self.unit, start, self.size).is_none() {
            return Err(overflow());
        }
        Ok(Period { start, ..*self })
    }

    pub fn size_in_days(&self) -> i64 {
        (self.stop_instant() - self.start).num_days() + 1
    }

    /// Splits the period into consecutive periods of `unit`.
    pub fn subperiods(&self, unit: PeriodUnit) -> Result<Vec<Period>, PeriodError> {
        if unit > self.unit || unit == PeriodUnit::Eternity {
            return Err(PeriodError::invalid(self.to_string(), format!("cannot split into {} sub-periods", unit)));
        }
        let count: i64 = match (self.unit, unit) {
            (PeriodUnit::Year, PeriodUnit::Year) | (PeriodUnit::Month, PeriodUnit::Month) | (PeriodUnit::Day, PeriodUnit::Day) => self.size as i64,
            (PeriodUnit::Year, PeriodUnit::Month) => self.size as i64 * 12,
            _ => self.size_in_days(),
        };
        let count = i32::try_from(count)
            .map_err(|_| PeriodError::invalid(self.to_string(), format!("too many {} sub-periods", unit)))?;
        let first = Period { unit, start: self.start, size: 1 };
        (0..count).map(|i| first.offset(i, unit)).collect()
    }

    fn is_canonical(&self) -> bool {
        self.size == 1 && match self.unit {
            PeriodUnit::Year => self.start.month() == 1 && self.start.day() == 1,
            PeriodUnit::Month => self.start.day() == 1,
            PeriodUnit::Day | PeriodUnit::Eternity => true,
        }
    }
}

/// First day after `size` units from `start`, or `None` past the calendar range.
fn end_exclusive(unit: PeriodUnit, start: NaiveDate, size: u32) -> Option<NaiveDate> {
    match unit {
        PeriodUnit::Eternity => Some(NaiveDate::MAX),
        PeriodUnit::Day => start.checked_add_signed(Duration::try_days(size as i64)?),
        PeriodUnit::Month => start.checked_add_months(Months::new(size)),
        PeriodUnit::Year => start.checked_add_months(Months::new(size.checked_mul(12)?)),
    }
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs() as u32))
    }
}

/// Parses "YYYY", "YYYY-MM" or "YYYY-MM-DD", returning the start date and the implied unit.
fn parse_date_like(raw: &str) -> Result<(NaiveDate, PeriodUnit), String> {
    let fields: Vec<&str> = raw.split('-').collect();
    let numbers = fields
        .iter()
        .map(|f| f.parse::<u32>().map_err(|_| format!("'{}' is not a number", f)))
        .collect::<Result<Vec<_>, _>>()?;

    let (year, month, day, unit) = match numbers.as_slice() {
        [y] => (*y, 1, 1, PeriodUnit::Year),
        [y, m] => (*y, *m, 1, PeriodUnit::Month),
        [y, m, d] => (*y, *m, *d, PeriodUnit::Day),
        _ => return Err("expected YYYY, YYYY-MM or YYYY-MM-DD".to_string()),
    };
    if fields[0].len() != 4 {
        return Err("year must have four digits".to_string());
    }
    let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| "no such calendar date".to_string())?;
    Ok((date, unit))
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eternal() {
            return f.write_str("eternity");
        }
        let date = match self.unit {
            PeriodUnit::Year if self.start.month() == 1 && self.start.day() == 1 => format!("{}", self.start.year()),
            PeriodUnit::Year | PeriodUnit::Month if self.start.day() == 1 => self.start.format("%Y-%m").to_string(),
            _ => self.start.format("%Y-%m-%d").to_string(),
        };
        if self.is_canonical() {
            return f.write_str(&date);
        }
        if self.size == 1 {
            write!(f, "{}:{}", self.unit, date)
        } else {
            write!(f, "{}:{}:{}", self.unit, date, self.size)
        }
    }
}

impl FromStr for Period {
    type Err = PeriodError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Period::parse(s) }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Period::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("2015", "2015")]
    #[case("2015-03", "2015-03")]
    #[case("2015-03-04", "2015-03-04")]
    #[case("year:2015", "2015")]
    #[case("year:2014-03", "year:2014-03")]
    #[case("year:2014-03:2", "year:2014-03:2")]
    #[case("month:2015-01:3", "month:2015-01:3")]
    #[case("day:2015-01-01:10", "day:2015-01-01:10")]
    #[case("ETERNITY", "eternity")]
    fn test_parse_and_canonical_display(#[case] input: &str, #[case] expected: &str) {
        let period = Period::parse(input).unwrap();
        assert_eq!(period.to_string(), expected);
        assert_eq!(Period::parse(expected).unwrap(), period);
    }

    #[rstest]
    #[case("")]
    #[case("15")]
    #[case("2015-13")]
    #[case("2015-02-30")]
    #[case("week:2015")]
    #[case("year:2015:0")]
    #[case("year:2015:2:3")]
    #[case("2015/03")]
    #[case("year:2015:400000000")]
    #[case("month:2015-01:4000000000")]
    #[case("day:2015-01-01:4000000000")]
    fn test_parse_rejects_malformed(#[case] input: &str) {
        assert!(matches!(Period::parse(input), Err(PeriodError::InvalidPeriod { .. })), "Should fail: '{}'", input);
    }

    #[test]
    fn test_longest_periods_stay_well_formed() {
        let decades = Period::parse("year:2015:100").unwrap();
        assert!(decades.contains(&Period::year(2015).unwrap()));
        assert_eq!(decades.subperiods(PeriodUnit::Month).unwrap().len(), 1200);
        // Shifting a valid period past the calendar is an error, never a panic.
        let late = Period::parse("year:2015:200000").unwrap();
        assert!(late.offset(100000, PeriodUnit::Year).is_err());
    }

    #[test]
    fn test_stop_instant() {
        assert_eq!(Period::year(2015).unwrap().stop_instant(), date(2015, 12, 31));
        assert_eq!(Period::month(2016, 2).unwrap().stop_instant(), date(2016, 2, 29));
        assert_eq!(Period::parse("year:2014-03:2").unwrap().stop_instant(), date(2016, 2, 29));
        assert_eq!(Period::parse("day:2015-01-30:3").unwrap().stop_instant(), date(2015, 2, 1));
    }

    #[test]
    fn test_containment_and_overlap() {
        let y2015 = Period::year(2015).unwrap();
        let march = Period::month(2015, 3).unwrap();
        let straddling = Period::parse("month:2015-12:2").unwrap();

        assert!(y2015.contains(&march));
        assert!(y2015.contains(&y2015));
        assert!(!march.contains(&y2015));
        assert!(!y2015.contains(&straddling));
        assert!(y2015.overlaps(&straddling));
        assert!(!y2015.overlaps(&Period::year(2016).unwrap()));
        assert!(Period::eternity().contains(&y2015));
    }

    #[test]
    fn test_first_month_and_year() {
        let day = Period::parse("2015-07-14").unwrap();
        assert_eq!(day.first_month(), Period::month(2015, 7).unwrap());
        assert_eq!(day.first_year(), Period::year(2015).unwrap());
        assert_eq!(Period::parse("year:2014-03").unwrap().first_year(), Period::year(2014).unwrap());
    }

    #[test]
    fn test_offset() {
        let jan = Period::month(2015, 1).unwrap();
        assert_eq!(jan.offset(-1, PeriodUnit::Month).unwrap(), Period::month(2014, 12).unwrap());
        assert_eq!(jan.offset(14, PeriodUnit::Month).unwrap(), Period::month(2016, 3).unwrap());
        assert_eq!(Period::year(2015).unwrap().offset(2, PeriodUnit::Year).unwrap(), Period::year(2017).unwrap());
        assert_eq!(Period::eternity().offset(3, PeriodUnit::Year).unwrap(), Period::eternity());
    }

    #[test]
    fn test_subperiods() {
        let months = Period::year(2015).unwrap().subperiods(PeriodUnit::Month).unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[11], Period::month(2015, 12).unwrap());

        let days = Period::month(2015, 2).unwrap().subperiods(PeriodUnit::Day).unwrap();
        assert_eq!(days.len(), 28);

        assert!(Period::month(2015, 2).unwrap().subperiods(PeriodUnit::Year).is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let period = Period::parse("month:2015-01:3").unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(json, "\"month:2015-01:3\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, period);
    }
}
