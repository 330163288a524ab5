//! Format-tagged date parsing.
//!
//! Due-date patterns carry an explicit format tag, so `9/15/2025` under
//! `M/D/YYYY` is September 15th, never the 9th of month 15. There is no
//! auto-detection.

use chrono::NaiveDate;
use regex::Captures;

use super::patterns::{FILENAME_DATE, TEXT_ISSUE_DATES};
use crate::models::rules::DateFormatTag;

/// Order three captured parts according to the tag and build a date.
///
/// Parts arrive in the order they appear in the pattern, which matches the
/// order the tag spells out. Returns `None` for impossible calendar dates.
pub fn resolve_tagged(tag: DateFormatTag, parts: [&str; 3]) -> Option<NaiveDate> {
    let (year, month, day) = match tag {
        DateFormatTag::YearMonthDayDotted | DateFormatTag::YearMonthDayDashed => {
            (parts[0], parts[1], parts[2])
        }
        DateFormatTag::MonthDayYear => (parts[2], parts[0], parts[1]),
        DateFormatTag::DayMonthYear => (parts[2], parts[1], parts[0]),
    };

    let year: i32 = year.trim().parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Build a date from pattern captures.
///
/// Three capture groups are taken as date parts directly; a single group is
/// a whole token split on `.`, `-`, `/`.
pub fn date_from_captures(tag: DateFormatTag, caps: &Captures) -> Option<NaiveDate> {
    if caps.len() == 4 {
        return resolve_tagged(tag, [&caps[1], &caps[2], &caps[3]]);
    }

    let token = if caps.len() >= 2 {
        caps.get(1)?.as_str()
    } else {
        caps.get(0)?.as_str()
    };
    let parts: Vec<&str> = token
        .split(['.', '-', '/'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }
    resolve_tagged(tag, [parts[0], parts[1], parts[2]])
}

/// A validated `YYYYMMDD` token from a filename, if present.
pub fn date_from_filename(file_name: &str) -> Option<NaiveDate> {
    let caps = FILENAME_DATE.captures(file_name)?;
    NaiveDate::parse_from_str(&caps[1], "%Y%m%d").ok()
}

/// First labeled issue date in the document text.
pub fn issue_date_from_text(text: &str) -> Option<NaiveDate> {
    for pattern in TEXT_ISSUE_DATES.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Some(date) = resolve_tagged(
                DateFormatTag::YearMonthDayDotted,
                [&caps[1], &caps[2], &caps[3]],
            ) {
                return Some(date);
            }
        }
    }
    None
}
