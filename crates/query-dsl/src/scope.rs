//! Tightest calendar window described by the range bounds on a timestamp field.

use crate::clause::range::RangeBound;
use chrono::{NaiveDate, TimeDelta};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref FORMAL_DATE: Regex =
        Regex::new(r"^(\d{4})\D(\d{2})\D(\d{2}).*$").expect("formal date pattern is valid");
    static ref RELATIVE_DATE: Regex =
        Regex::new(r"^now(([-+])(\d+)([yMwdhHms]))?\s*$").expect("relative date pattern is valid");
}

/// Lower limit of an unbounded scope.
pub fn earliest() -> NaiveDate {
    NaiveDate::from_ymd_opt(1001, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Upper limit of an unbounded scope.
pub fn latest() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 1, 1).unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeScope {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Bound literal the start date was read from, e.g. `now-10d`.
    pub start_literal: Option<String>,
    pub end_literal: Option<String>,
}

impl Default for TimeScope {
    fn default() -> Self {
        Self {
            start: earliest(),
            end: latest(),
            start_literal: None,
            end_literal: None,
        }
    }
}

impl TimeScope {
    /// Narrows the scope with every bound of one range parameter map.
    pub fn narrow(&mut self, params: &Map<String, Value>, today: NaiveDate) {
        for bound in [RangeBound::Gt, RangeBound::Gte, RangeBound::Lt, RangeBound::Lte] {
            let Some(literal) = params.get(bound.key()).and_then(Value::as_str) else {
                continue;
            };
            let Some(date) = parse_bound(literal, today) else {
                continue;
            };

            if bound.is_lower() {
                if date > self.start {
                    self.start = date;
                    self.start_literal = Some(literal.to_string());
                }
            } else if date < self.end {
                self.end = date;
                self.end_literal = Some(literal.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Reads a range bound as a calendar date.
///
/// Accepts `YYYY?MM?DD...` with any single separator, or `now[+-N unit]` where the
/// unit is one of `y M w d` (365, 30, 7 and 1 days). `h H m s` count as zero days.
pub fn parse_bound(literal: &str, today: NaiveDate) -> Option<NaiveDate> {
    let literal = literal.trim();
    if let Some(caps) = FORMAL_DATE.captures(literal) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let caps = RELATIVE_DATE.captures(literal)?;
    if caps.get(1).is_none() {
        return Some(today);
    }
    let amount: i64 = caps[3].parse().ok()?;
    let days_per_unit = match &caps[4] {
        "y" => 365,
        "M" => 30,
        "w" => 7,
        "d" => 1,
        _ => 0,
    };
    let delta = TimeDelta::try_days(amount.checked_mul(days_per_unit)?)?;
    match &caps[2] {
        "-" => today.checked_sub_signed(delta),
        _ => today.checked_add_signed(delta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_formal_dates() {
        let today = day(2020, 6, 15);
        assert_eq!(parse_bound("2017-10-12", today), Some(day(2017, 10, 12)));
        assert_eq!(parse_bound("2017/10/12T08:00:00", today), Some(day(2017, 10, 12)));
        assert_eq!(parse_bound("2017-13-01", today), None);
    }

    #[test]
    fn test_relative_dates() {
        let today = day(2020, 6, 15);
        assert_eq!(parse_bound("now", today), Some(today));
        assert_eq!(parse_bound("now-10d", today), Some(day(2020, 6, 5)));
        assert_eq!(parse_bound("now+1w", today), Some(day(2020, 6, 22)));
        assert_eq!(parse_bound("now-1M", today), Some(day(2020, 5, 16)));
        assert_eq!(parse_bound("now-1y", today), Some(day(2019, 6, 16)));
        assert_eq!(parse_bound("now-6h", today), Some(today));
        assert_eq!(parse_bound("yesterday", today), None);
    }

    #[test]
    fn test_narrow_keeps_tightest_bounds() {
        let today = day(2020, 6, 15);
        let mut scope = TimeScope::default();
        scope.narrow(json!({"gte": "now-10d", "lte": "now"}).as_object().unwrap(), today);
        scope.narrow(json!({"gt": "2020-06-01", "lt": "2020-06-12"}).as_object().unwrap(), today);

        assert_eq!(scope.start, day(2020, 6, 5));
        assert_eq!(scope.start_literal.as_deref(), Some("now-10d"));
        assert_eq!(scope.end, day(2020, 6, 12));
        assert_eq!(scope.end_literal.as_deref(), Some("2020-06-12"));
        assert!(!scope.is_empty());
    }

    #[test]
    fn test_unbounded_defaults() {
        let scope = TimeScope::default();
        assert_eq!(scope.start, day(1001, 1, 1));
        assert_eq!(scope.end, day(9999, 1, 1));
        assert!(scope.start_literal.is_none());
    }
}
