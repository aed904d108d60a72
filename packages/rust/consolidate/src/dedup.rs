//! Duplicate detection.
//!
//! Two passes over date-validated candidates:
//! 1. same canonical URL: keep the highest `source_confidence` (first seen on ties)
//! 2. same normalized title on the same date: keep the one with a description
//!    (first seen on ties)
//!
//! Candidates without a URL skip the first pass. Every loser is reported as
//! [`RejectReason::Duplicate`].

use std::collections::HashMap;
use std::hash::Hash;

use chrono::NaiveDate;
use tracing::debug;

use eventdigest_shared::{RawEvent, RejectReason, RejectedEvent};

/// A raw event that survived URL canonicalization and date parsing.
#[derive(Debug, Clone)]
pub(crate) struct Candidate<'a> {
    /// Index in the raw input, used for "first seen" ordering.
    pub position: usize,
    pub raw: &'a RawEvent,
    pub canonical_url: String,
    pub date: NaiveDate,
}

impl Candidate<'_> {
    fn reject(self) -> RejectedEvent {
        RejectedEvent {
            position: self.position,
            reason: RejectReason::Duplicate,
            event: self.raw.clone(),
        }
    }

    fn confidence(&self) -> f64 {
        self.raw
            .source_confidence
            .filter(|c| !c.is_nan())
            .unwrap_or(f64::NEG_INFINITY)
    }

    fn has_description(&self) -> bool {
        self.raw
            .description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// Run both dedup passes. Losers are appended to `rejected`; survivors come
/// back in input order.
pub(crate) fn deduplicate<'a>(
    candidates: Vec<Candidate<'a>>,
    rejected: &mut Vec<RejectedEvent>,
) -> Vec<Candidate<'a>> {
    let by_url = dedup_by_url(candidates, rejected);
    dedup_by_title_and_date(by_url, rejected)
}

/// Case- and whitespace-insensitive title key.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn dedup_by_url<'a>(
    candidates: Vec<Candidate<'a>>,
    rejected: &mut Vec<RejectedEvent>,
) -> Vec<Candidate<'a>> {
    let (keyed, mut survivors): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|c| !c.canonical_url.is_empty());

    for members in bucket(keyed, |c| c.canonical_url.clone()) {
        let mut best = 0;
        for (i, candidate) in members.iter().enumerate() {
            if candidate.confidence() > members[best].confidence() {
                best = i;
            }
        }

        for (i, candidate) in members.into_iter().enumerate() {
            if i == best {
                survivors.push(candidate);
            } else {
                debug!(
                    position = candidate.position,
                    url = %candidate.canonical_url,
                    "duplicate URL, keeping more confident record"
                );
                rejected.push(candidate.reject());
            }
        }
    }

    survivors.sort_by_key(|c| c.position);
    survivors
}

fn dedup_by_title_and_date<'a>(
    candidates: Vec<Candidate<'a>>,
    rejected: &mut Vec<RejectedEvent>,
) -> Vec<Candidate<'a>> {
    let mut survivors = Vec::new();

    for members in bucket(candidates, |c| (normalize_title(&c.raw.title), c.date)) {
        let keep = members
            .iter()
            .position(Candidate::has_description)
            .unwrap_or(0);

        for (i, candidate) in members.into_iter().enumerate() {
            if i == keep {
                survivors.push(candidate);
            } else {
                debug!(
                    position = candidate.position,
                    title = %candidate.raw.title,
                    date = %candidate.date,
                    "duplicate title on same date"
                );
                rejected.push(candidate.reject());
            }
        }
    }

    survivors.sort_by_key(|c| c.position);
    survivors
}

/// Group candidates by key, preserving first-seen order of both the groups
/// and their members.
fn bucket<'a, K, F>(candidates: Vec<Candidate<'a>>, key: F) -> Vec<Vec<Candidate<'a>>>
where
    K: Eq + Hash,
    F: Fn(&Candidate<'a>) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<Candidate<'a>>> = Vec::new();

    for candidate in candidates {
        let slot = *index.entry(key(&candidate)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(candidate);
    }

    groups
}
