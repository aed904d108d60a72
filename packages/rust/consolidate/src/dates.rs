//! Event date parsing.
//!
//! Accepts the date shapes the search step produces:
//! - `2025-05-19`, `2025/05/19`, `2025-05-19T18:00:00-07:00`
//! - `May 19, 2025`, `May 19th 2025`, `Sept. 3, 2025`
//! - `19 May 2025`, `3rd of June 2025`
//! - any of the above without the year (`May 19`), resolved against `today`
//! - any of the above behind a weekday label (`Monday, May 19, 2025`)
//!
//! Weekday labels are never trusted: the weekday is always recomputed from
//! the calendar date.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use tracing::debug;

use eventdigest_shared::RawDate;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Month names and their common abbreviations.
const MONTHS: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

/// Matches a leading `Monday,` / `Tue.` label.
static WEEKDAY_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+").expect("weekday regex")
});

/// Matches `YYYY-MM-DD` or `YYYY/MM/DD`, optionally followed by a time.
static ISO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})(?:[^\d]|$)").expect("iso date regex")
});

/// Matches `May 19`, `May 19th, 2025`, `Sept. 3 2025`.
static MONTH_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTHS})\b\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("month-first regex")
});

/// Matches `19 May`, `19th of May, 2025`.
static DAY_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTHS})\b\.?(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("day-first regex")
});

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Date components found in text; the year may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateParts {
    year: Option<i32>,
    month: u32,
    day: u32,
}

/// Resolve a raw `start_date` into a real calendar date.
///
/// Returns `None` for anything that is not a valid date (`"TBD"`, `Feb 30`).
pub fn parse_event_date(raw: &RawDate, today: NaiveDate) -> Option<NaiveDate> {
    match raw {
        RawDate::Date(date) => Some(*date),
        RawDate::Text(text) => parse_date_text(text, today),
    }
}

/// Parse free-form date text. Yearless dates resolve to the occurrence
/// closest to `today`.
pub fn parse_date_text(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (label, rest) = split_weekday_label(text);
    let found = find_date_parts(rest)?;
    let date = resolve(found.parts, today)?;

    if let Some(label) = label {
        if label != date.weekday() {
            debug!(
                %text,
                %date,
                label = ?label,
                actual = ?date.weekday(),
                "ignoring mismatched weekday label"
            );
        }
    }

    Some(date)
}

/// Locate the first date-like span in a block of text.
///
/// Used by the extraction step to pull a date out of free text without
/// deciding on a year yet.
pub fn find_date_text(text: &str) -> Option<&str> {
    let found = find_date_parts(text)?;
    Some(&text[found.start..found.end])
}

/// Strip a leading weekday label, returning the weekday it claimed.
fn split_weekday_label(text: &str) -> (Option<Weekday>, &str) {
    match WEEKDAY_LABEL_RE.captures(text) {
        Some(caps) => {
            let whole = caps.get(0).map_or(0, |m| m.end());
            (weekday_from_name(&caps[1]), &text[whole..])
        }
        None => (None, text),
    }
}

/// A date match: byte span in the source text plus its components.
#[derive(Debug, Clone, Copy)]
struct Found {
    start: usize,
    end: usize,
    parts: DateParts,
}

/// Try every pattern and keep the match that starts earliest.
fn find_date_parts(text: &str) -> Option<Found> {
    let mut found: Vec<Found> = Vec::new();

    if let Some(caps) = ISO_RE.captures(text) {
        if let (Ok(year), Ok(month), Ok(day)) =
            (caps[1].parse(), caps[2].parse(), caps[3].parse())
        {
            found.push(Found {
                start: caps.get(1).map_or(0, |m| m.start()),
                end: caps.get(3).map_or(0, |m| m.end()),
                parts: DateParts {
                    year: Some(year),
                    month,
                    day,
                },
            });
        }
    }

    if let Some(caps) = MONTH_FIRST_RE.captures(text) {
        if let (Some(month), Ok(day)) = (month_from_name(&caps[1]), caps[2].parse()) {
            let year = caps.get(3).and_then(|m| m.as_str().parse().ok());
            found.push(Found {
                start: caps.get(1).map_or(0, |m| m.start()),
                end: caps.get(0).map_or(0, |m| m.end()),
                parts: DateParts { year, month, day },
            });
        }
    }

    if let Some(caps) = DAY_FIRST_RE.captures(text) {
        if let (Ok(day), Some(month)) = (caps[1].parse(), month_from_name(&caps[2])) {
            let year = caps.get(3).and_then(|m| m.as_str().parse().ok());
            found.push(Found {
                start: caps.get(1).map_or(0, |m| m.start()),
                end: caps.get(0).map_or(0, |m| m.end()),
                parts: DateParts { year, month, day },
            });
        }
    }

    found.into_iter().min_by_key(|f| f.start)
}

/// Turn parts into a calendar date, inferring a missing year.
fn resolve(parts: DateParts, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(year) = parts.year {
        return NaiveDate::from_ymd_opt(year, parts.month, parts.day);
    }

    // Closest occurrence to today; on a tie the later one wins.
    let mut best: Option<(i64, NaiveDate)> = None;
    for year in [today.year() - 1, today.year(), today.year() + 1] {
        let Some(candidate) = NaiveDate::from_ymd_opt(year, parts.month, parts.day) else {
            continue;
        };
        let distance = (candidate - today).num_days().abs();
        match best {
            Some((d, _)) if d < distance => {}
            Some((d, current)) if d == distance && current > candidate => {}
            _ => best = Some((distance, candidate)),
        }
    }
    best.map(|(_, date)| date)
}

fn month_from_name(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let prefix = name.get(..3)?.to_ascii_lowercase();
    match prefix.as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}
