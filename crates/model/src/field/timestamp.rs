use crate::error::FieldError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use std::{fmt, str::FromStr};

/// Output format of every validated timestamp: UTC with microsecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Hours east of UTC attached to timestamps that carry no zone of their own.
pub const DEFAULT_OFFSET_HOURS: i32 = 8;

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y/%m/%d %H:%M:%S%.f%:z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%m/%d/%Y"];

/// Timezone attached to naive timestamps before they are rendered in UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeZoneSpec {
    Fixed(FixedOffset),
    Named(Tz),
}

impl TimeZoneSpec {
    pub fn utc() -> Self {
        TimeZoneSpec::Fixed(Utc.fix())
    }

    /// Interprets a wall-clock time in this zone. Ambiguous local times resolve to the
    /// earliest instant; times skipped by a DST gap yield `None`.
    pub fn localize(&self, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            TimeZoneSpec::Fixed(offset) => offset
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            TimeZoneSpec::Named(tz) => tz
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl Default for TimeZoneSpec {
    fn default() -> Self {
        FixedOffset::east_opt(DEFAULT_OFFSET_HOURS * 3600)
            .map_or_else(TimeZoneSpec::utc, TimeZoneSpec::Fixed)
    }
}

impl fmt::Display for TimeZoneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneSpec::Fixed(offset) => write!(f, "{offset}"),
            TimeZoneSpec::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

impl FromStr for TimeZoneSpec {
    type Err = FieldError;

    /// Accepts `UTC`/`Z`, IANA names such as `Asia/Shanghai`, and offsets written as
    /// `+8`, `-05`, `+0800` or `+08:00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.eq_ignore_ascii_case("utc") || text.eq_ignore_ascii_case("z") {
            return Ok(TimeZoneSpec::utc());
        }
        if let Some(offset) = parse_offset(text) {
            return Ok(TimeZoneSpec::Fixed(offset));
        }
        text.parse::<Tz>()
            .map(TimeZoneSpec::Named)
            .map_err(|_| FieldError::InvalidTimezone(text.to_string()))
    }
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// A parsed moment either carries its own offset or still needs a zone attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedMoment {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

/// Permissive date/time parser: RFC 3339, common ISO variants with or without a zone,
/// slash and dot separated dates and bare dates (midnight).
pub fn parse_moment(text: &str) -> Option<ParsedMoment> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(ParsedMoment::Aware(dt));
    }
    for format in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(ParsedMoment::Aware(dt));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ParsedMoment::Naive(dt));
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(|date| ParsedMoment::Naive(date.and_time(NaiveTime::MIN)))
}

pub fn render_utc(moment: &DateTime<Utc>) -> String {
    moment.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timezone_forms() {
        let shanghai: TimeZoneSpec = "Asia/Shanghai".parse().unwrap();
        assert!(matches!(shanghai, TimeZoneSpec::Named(_)));
        assert_eq!(
            "+8".parse::<TimeZoneSpec>().unwrap(),
            TimeZoneSpec::default()
        );
        assert_eq!(
            "+08:00".parse::<TimeZoneSpec>().unwrap(),
            TimeZoneSpec::default()
        );
        assert_eq!(
            "-0530".parse::<TimeZoneSpec>().unwrap(),
            TimeZoneSpec::Fixed(FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap())
        );
        assert!("Mars/Olympus".parse::<TimeZoneSpec>().is_err());
    }

    #[test]
    fn test_parse_moment_variants() {
        assert!(matches!(
            parse_moment("2017-10-12"),
            Some(ParsedMoment::Naive(_))
        ));
        assert!(matches!(
            parse_moment("2017/10/12 08:30:00"),
            Some(ParsedMoment::Naive(_))
        ));
        assert!(matches!(
            parse_moment("2017-10-12T08:30:00+02:00"),
            Some(ParsedMoment::Aware(_))
        ));
        assert!(parse_moment("yesterday-ish").is_none());
    }

    #[test]
    fn test_localize_named_zone() {
        let tz: TimeZoneSpec = "UTC".parse().unwrap();
        let naive = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let utc = tz.localize(&naive).unwrap();
        assert_eq!(render_utc(&utc), "2020-01-01T12:00:00.000000Z");
    }
}
