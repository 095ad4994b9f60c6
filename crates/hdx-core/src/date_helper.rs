//! Dates and time periods in the form HDX stores them.
//!
//! A time period is `[<start> TO <end>]` with second resolution and no offset,
//! eg. `[2020-01-01T00:00:00 TO 2020-12-31T23:59:59]`. An end of `*` means the
//! period is ongoing.

use std::{fmt::Write, sync::LazyLock};

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use regex::Regex;

use crate::{error::HdxError, HdxResult};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%Y%m%d"];

static TIME_PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[?\s*(.+?)\s+TO\s+(.+?)\s*\]?$").expect("unable to compile time period regex")
});

/// A date with or without an offset. Values without an offset are treated as
/// UTC when converting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateInput {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl DateInput {
    pub fn parse(text: &str) -> HdxResult<Self> {
        let text = text.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self::Aware(date));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
            if let Ok(date) = DateTime::parse_from_str(text, format) {
                return Ok(Self::Aware(date));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
                return Ok(Self::Naive(date));
            }
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                return Ok(Self::Naive(date.and_time(NaiveTime::MIN)));
            }
        }
        Err(HdxError::Date(text.to_string()))
    }

    /// Clock time ignoring any offset.
    pub fn local(&self) -> NaiveDateTime {
        match self {
            Self::Naive(date) => *date,
            Self::Aware(date) => date.naive_local(),
        }
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Self::Naive(date) => Utc.from_utc_datetime(date),
            Self::Aware(date) => date.with_timezone(&Utc),
        }
    }

    /// Whether the value carries a time other than midnight.
    pub fn has_time(&self) -> bool {
        self.local().time() != NaiveTime::MIN
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Aware(date.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for DateInput {
    fn from(date: DateTime<FixedOffset>) -> Self {
        Self::Aware(date)
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(date: NaiveDateTime) -> Self {
        Self::Naive(date)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        Self::Naive(date.and_time(NaiveTime::MIN))
    }
}

impl TryFrom<&str> for DateInput {
    type Error = HdxError;

    fn try_from(text: &str) -> HdxResult<Self> {
        Self::parse(text)
    }
}

fn end_of_day(date: NaiveDateTime, with_micros: bool) -> NaiveDateTime {
    let time = if with_micros {
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        NaiveTime::from_hms_opt(23, 59, 59)
    };
    date.date().and_time(time.unwrap_or(NaiveTime::MIN))
}

fn isoformat(date: NaiveDateTime, include_microseconds: bool) -> String {
    if include_microseconds {
        date.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    } else {
        date.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Formats a date the way HDX stores it, without an offset.
///
/// With `ignore_timeinfo` the time is replaced by the start of the day, or the
/// end of the day when `max` is set, and any offset is dropped. Otherwise the
/// date is converted to UTC.
pub fn get_hdx_date(
    date: &DateInput,
    ignore_timeinfo: bool,
    include_microseconds: bool,
    max: bool,
) -> String {
    let date = if ignore_timeinfo {
        let local = date.local();
        if max {
            end_of_day(local, true)
        } else {
            local.date().and_time(NaiveTime::MIN)
        }
    } else {
        date.to_utc().naive_utc()
    };
    isoformat(date, include_microseconds)
}

/// Builds a time period string from a start and optional end.
///
/// Without an end the period is the start date alone. `ongoing` makes the end
/// `*`.
pub fn get_hdx_time_period(
    startdate: &DateInput,
    enddate: Option<&DateInput>,
    ongoing: bool,
    ignore_timeinfo: bool,
) -> String {
    let start = get_hdx_date(startdate, ignore_timeinfo, false, false);
    let end = if ongoing {
        "*".to_string()
    } else {
        match enddate {
            Some(enddate) => get_hdx_date(enddate, ignore_timeinfo, false, true),
            None => start.clone(),
        }
    };
    format!("[{start} TO {end}]")
}

/// Builds a time period covering whole years. Returns the period and the
/// sorted years.
pub fn get_hdx_time_period_from_years<I>(years: I) -> HdxResult<(String, Vec<i32>)>
where
    I: IntoIterator<Item = i32>,
{
    let mut years: Vec<i32> = years.into_iter().collect();
    years.sort_unstable();
    let (Some(first), Some(last)) = (years.first().copied(), years.last().copied()) else {
        return Err(HdxError::invalid("No years supplied!"));
    };
    let start = Utc
        .with_ymd_and_hms(first, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| HdxError::Date(first.to_string()))?;
    let end = Utc
        .with_ymd_and_hms(last, 12, 31, 23, 59, 59)
        .single()
        .ok_or_else(|| HdxError::Date(last.to_string()))?;
    let period = get_hdx_time_period(&start.into(), Some(&end.into()), false, false);
    Ok((period, years))
}

/// Parsed form of a time period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimePeriodInfo {
    pub startdate: DateTime<Utc>,
    pub enddate: DateTime<Utc>,
    pub startdate_str: String,
    pub enddate_str: String,
    pub ongoing: bool,
}

fn format_date(date: &DateTime<Utc>, date_format: Option<&str>) -> HdxResult<String> {
    match date_format {
        None => Ok(date.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()),
        Some(date_format) => {
            let mut formatted = String::new();
            write!(formatted, "{}", date.format(date_format))
                .map_err(|_| HdxError::invalid(format!("Invalid date format {date_format}!")))?;
            Ok(formatted)
        }
    }
}

/// Parses a time period. An empty string gives `None`.
///
/// An end of `*` is taken as the end of `today`. An end given without a time
/// is taken as the end of that day.
pub fn get_time_period_info(
    hdx_time_period: &str,
    date_format: Option<&str>,
    today: DateTime<Utc>,
) -> HdxResult<Option<TimePeriodInfo>> {
    if hdx_time_period.is_empty() {
        return Ok(None);
    }
    let captures = TIME_PERIOD_RE
        .captures(hdx_time_period.trim())
        .ok_or_else(|| HdxError::Date(hdx_time_period.to_string()))?;
    let (start, end) = (&captures[1], &captures[2]);

    let startdate = DateInput::parse(start)?.to_utc();
    let (enddate, ongoing) = if end.trim() == "*" {
        let end_of_today = today
            .date_naive()
            .and_hms_opt(23, 59, 59)
            .map(|date| Utc.from_utc_datetime(&date))
            .unwrap_or(today);
        (end_of_today, true)
    } else {
        let parsed = DateInput::parse(end)?;
        let enddate = if parsed.has_time() {
            parsed.to_utc()
        } else {
            Utc.from_utc_datetime(&end_of_day(parsed.local(), false))
        };
        (enddate, false)
    };
    Ok(Some(TimePeriodInfo {
        startdate_str: format_date(&startdate, date_format)?,
        enddate_str: format_date(&enddate, date_format)?,
        startdate,
        enddate,
        ongoing,
    }))
}

/// Current UTC time without sub-microsecond precision.
pub fn now_utc() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.timestamp_subsec_micros() * 1000)
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(text: &str) -> DateInput {
        DateInput::parse(text).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(date("2020-02-03"), date("2020-02-03T00:00:00"));
        assert!(matches!(date("2020-02-03T10:00:00+01:00"), DateInput::Aware(_)));
        assert!(matches!(date("2020-02-03T10:00:00Z"), DateInput::Aware(_)));
        assert!(matches!(date("2020-02-03 10:00:00"), DateInput::Naive(_)));
        assert!(DateInput::parse("not a date").is_err());
    }

    #[test]
    fn test_get_hdx_date() {
        let d = date("2020-02-03T10:11:12+01:00");
        assert_eq!(get_hdx_date(&d, true, false, false), "2020-02-03T00:00:00");
        assert_eq!(get_hdx_date(&d, true, false, true), "2020-02-03T23:59:59");
        assert_eq!(
            get_hdx_date(&d, true, true, true),
            "2020-02-03T23:59:59.999999"
        );
        assert_eq!(get_hdx_date(&d, false, false, false), "2020-02-03T09:11:12");
        assert_eq!(
            get_hdx_date(&d, false, true, false),
            "2020-02-03T09:11:12.000000"
        );
    }

    #[test]
    fn test_get_hdx_time_period() {
        assert_eq!(
            get_hdx_time_period(&date("2020-01-01"), None, false, true),
            "[2020-01-01T00:00:00 TO 2020-01-01T00:00:00]"
        );
        assert_eq!(
            get_hdx_time_period(&date("2020-01-01"), Some(&date("2020-06-30")), false, true),
            "[2020-01-01T00:00:00 TO 2020-06-30T23:59:59]"
        );
        assert_eq!(
            get_hdx_time_period(&date("2020-01-01"), None, true, true),
            "[2020-01-01T00:00:00 TO *]"
        );
        assert_eq!(
            get_hdx_time_period(
                &date("2020-01-01T10:00:00+02:00"),
                Some(&date("2020-01-02T10:00:00")),
                false,
                false
            ),
            "[2020-01-01T08:00:00 TO 2020-01-02T10:00:00]"
        );
    }

    #[test]
    fn test_time_period_from_years() {
        let (period, years) = get_hdx_time_period_from_years([2013, 2010, 2012]).unwrap();
        assert_eq!(period, "[2010-01-01T00:00:00 TO 2013-12-31T23:59:59]");
        assert_eq!(years, vec![2010, 2012, 2013]);

        let (period, years) = get_hdx_time_period_from_years([2001]).unwrap();
        assert_eq!(period, "[2001-01-01T00:00:00 TO 2001-12-31T23:59:59]");
        assert_eq!(years, vec![2001]);

        assert!(get_hdx_time_period_from_years(Vec::new()).is_err());
    }

    #[test]
    fn test_get_time_period_info() {
        let today = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let info = get_time_period_info(
            "[2020-01-01T00:00:00 TO 2020-12-31T23:59:59]",
            None,
            today,
        )
        .unwrap()
        .unwrap();
        assert_eq!(info.startdate_str, "2020-01-01T00:00:00+00:00");
        assert_eq!(info.enddate_str, "2020-12-31T23:59:59+00:00");
        assert!(!info.ongoing);

        let info = get_time_period_info("[2020-01-01 TO *]", Some("%d/%m/%Y"), today)
            .unwrap()
            .unwrap();
        assert_eq!(info.startdate_str, "01/01/2020");
        assert_eq!(info.enddate_str, "06/05/2024");
        assert_eq!(info.enddate, Utc.with_ymd_and_hms(2024, 5, 6, 23, 59, 59).unwrap());
        assert!(info.ongoing);

        let info = get_time_period_info("[2020-01-01 TO 2020-03-31]", None, today)
            .unwrap()
            .unwrap();
        assert_eq!(info.enddate_str, "2020-03-31T23:59:59+00:00");

        assert!(get_time_period_info("", None, today).unwrap().is_none());
    }
}
