//! Event consolidation: raw search results → deduplicated, date-validated,
//! weekday-grouped events.
//!
//! This crate provides:
//! - [`consolidate`]: the pure batch transform
//! - [`canonical`]: URL canonicalization
//! - [`dates`]: free-form date parsing
//! - [`ingest`]: JSON input shape validation
//!
//! A run never fails because of a single bad record: bad dates, duplicates
//! and already-posted events come back in [`Consolidation::rejected`] with a
//! reason code. Only a wrongly shaped input collection is fatal.

pub mod canonical;
pub mod dates;
mod dedup;
pub mod grouping;
pub mod ingest;

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use tracing::{debug, info, instrument, trace};

use eventdigest_shared::{
    CanonicalEvent, Consolidation, RawEvent, RejectReason, RejectedEvent, Result,
};

pub use canonical::canonicalize_url;
pub use dates::{find_date_text, parse_date_text, parse_event_date};
pub use dedup::normalize_title;
pub use grouping::{days_until, group_by_weekday, week_from};
pub use ingest::{parse_raw_events, parse_raw_events_str};

use dedup::Candidate;

/// Inputs to a consolidation run besides the events themselves.
#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    /// Reference date for year inference and group ordering.
    pub today: NaiveDate,
    /// Query parameters stripped in addition to the built-in tracking list.
    pub extra_tracking_params: Vec<String>,
}

impl ConsolidateOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            extra_tracking_params: Vec::new(),
        }
    }
}

/// Consolidate raw events into weekday groups.
///
/// Steps, in order:
/// 1. fold records identical in every field into their first occurrence
/// 2. canonicalize each URL and parse each date (failures → `invalid_date`)
/// 3. drop duplicates by URL, then by title + date (losers → `duplicate`);
///    events without a URL only take part in the title + date pass
/// 4. drop URLs in `known_urls` (→ `already_posted`)
/// 5. derive the weekday from the date
/// 6. group by weekday, ordered relative to `options.today`
///
/// Pure: the same inputs always give the same output.
#[instrument(skip_all, fields(raw = raw_events.len(), known = known_urls.len(), today = %options.today))]
pub fn consolidate(
    raw_events: &[RawEvent],
    known_urls: &HashSet<String>,
    options: &ConsolidateOptions,
) -> Consolidation {
    let extra = &options.extra_tracking_params;
    let mut rejected: Vec<RejectedEvent> = Vec::new();

    // --- Canonicalize + parse dates ---
    let mut candidates: Vec<Candidate<'_>> = Vec::with_capacity(raw_events.len());
    for (position, raw) in raw_events.iter().enumerate() {
        if raw_events[..position].contains(raw) {
            trace!(position, "collapsed exact duplicate");
            continue;
        }

        let date = raw
            .start_date
            .as_ref()
            .and_then(|d| parse_event_date(d, options.today));

        match date {
            Some(date) => candidates.push(Candidate {
                position,
                raw,
                canonical_url: canonicalize_url(&raw.url, extra),
                date,
            }),
            None => {
                debug!(position, title = %raw.title, "unparseable date");
                rejected.push(RejectedEvent {
                    position,
                    reason: RejectReason::InvalidDate,
                    event: raw.clone(),
                });
            }
        }
    }

    // --- Dedup ---
    let survivors = dedup::deduplicate(candidates, &mut rejected);

    // --- Cross-run suppression ---
    let known: HashSet<String> = known_urls
        .iter()
        .map(|u| canonicalize_url(u, extra))
        .collect();

    let mut accepted: Vec<CanonicalEvent> = Vec::with_capacity(survivors.len());
    for candidate in survivors {
        if known.contains(&candidate.canonical_url) {
            debug!(url = %candidate.canonical_url, "already posted");
            rejected.push(RejectedEvent {
                position: candidate.position,
                reason: RejectReason::AlreadyPosted,
                event: candidate.raw.clone(),
            });
        } else {
            accepted.push(to_canonical(candidate));
        }
    }

    // --- Group ---
    let groups = group_by_weekday(accepted, options.today);
    rejected.sort_by_key(|r| r.position);

    let result = Consolidation { groups, rejected };

    info!(
        accepted = result.accepted_count(),
        groups = result.groups.len(),
        invalid_date = result.rejected_count(RejectReason::InvalidDate),
        duplicate = result.rejected_count(RejectReason::Duplicate),
        already_posted = result.rejected_count(RejectReason::AlreadyPosted),
        "consolidation complete"
    );

    result
}

/// Validate the shape of untyped JSON input, then consolidate it.
pub fn consolidate_value(
    value: &Value,
    known_urls: &HashSet<String>,
    options: &ConsolidateOptions,
) -> Result<Consolidation> {
    let raw_events = parse_raw_events(value)?;
    Ok(consolidate(&raw_events, known_urls, options))
}

/// Build the output record. The weekday always comes from the calendar date.
fn to_canonical(candidate: Candidate<'_>) -> CanonicalEvent {
    let raw = candidate.raw;
    CanonicalEvent {
        title: raw.title.trim().to_string(),
        url: candidate.canonical_url,
        date: candidate.date,
        weekday: candidate.date.weekday(),
        location: non_blank(raw.location.as_deref()),
        description: non_blank(raw.description.as_deref()),
        kind: raw.kind,
        attendance: raw.attendance,
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}
