use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How an all-numeric `a/b/yyyy` date is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DateConvention {
    /// `01/03/2025` is 1 March 2025.
    #[default]
    DayFirst,
    /// `01/03/2025` is 3 January 2025.
    MonthFirst,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

// `%b` only takes abbreviations, so full names need their own `%B` forms.
const NAMED_MONTH_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %b, %Y",
    "%d %B, %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%A, %d %b %Y",
    "%A, %d %B %Y",
    "%A, %b %d, %Y",
    "%A, %B %d, %Y",
];

fn plausible(date: NaiveDate) -> Option<NaiveDate> {
    (1000..=9999).contains(&date.year()).then_some(date)
}

/// Expand a two-digit year with the same pivot as chrono's `%y`.
fn full_year(part: &str) -> Option<i32> {
    let n: i32 = part.parse().ok()?;
    match part.len() {
        4 => Some(n),
        2 if n < 70 => Some(2000 + n),
        2 => Some(1900 + n),
        _ => None,
    }
}

/// `y-m-d`, `d/m/y` or `m/d/y` with `/`, `-` or `.` separators.
fn parse_numeric(s: &str, convention: DateConvention) -> Option<NaiveDate> {
    let sep = s.chars().find(|c| matches!(c, '/' | '-' | '.'))?;
    let parts: Vec<&str> = s.split(sep).collect();
    if parts.len() != 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }

    let (year, month, day) = if parts[0].len() == 4 {
        (full_year(parts[0])?, parts[1].parse().ok()?, parts[2].parse().ok()?)
    } else {
        let (a, b): (u32, u32) = (parts[0].parse().ok()?, parts[1].parse().ok()?);
        let year = full_year(parts[2])?;
        match convention {
            DateConvention::DayFirst => (year, b, a),
            DateConvention::MonthFirst => (year, a, b),
        }
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// True for a trailing clock time such as `10:30`, `10:30:00` or `9:05 pm`.
fn is_time_suffix(rest: &str) -> bool {
    let lower = rest.trim().to_ascii_lowercase();
    let clock = lower
        .strip_suffix("am")
        .or_else(|| lower.strip_suffix("pm"))
        .unwrap_or(&lower)
        .trim();
    !clock.is_empty()
        && clock.contains(':')
        && clock.chars().all(|c| c.is_ascii_digit() || c == ':' || c == '.')
}

/// Parse a spreadsheet date cell into a calendar date.
///
/// Accepts ISO dates (with optional time or RFC 3339 offset), numeric dates
/// read per `convention`, and month-name forms such as `1 Mar 2025` or
/// `March 1, 2025`. Returns `None` rather than guessing.
pub fn parse_date(raw: &str, convention: DateConvention) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return plausible(ts.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return plausible(ts.date());
        }
    }

    let (head, rest) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
    let is_numeric = head.chars().all(|c| c.is_ascii_digit() || matches!(c, '/' | '-' | '.'));
    if is_numeric && head.contains(&['/', '-', '.'][..]) {
        if !rest.is_empty() && !is_time_suffix(rest) {
            return None;
        }
        return parse_numeric(head, convention).and_then(plausible);
    }

    NAMED_MONTH_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(plausible)
}
