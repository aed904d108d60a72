//! Post-consolidation quality report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use eventdigest_shared::{Consolidation, RejectReason};

/// Summary of one consolidation, embedded in `final_results.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewReport {
    /// Raw records handed to consolidation.
    pub input: usize,
    pub accepted: usize,
    pub groups: usize,
    /// Rejected records per reason; reasons with no records are omitted.
    pub rejected: BTreeMap<RejectReason, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ReviewReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Review a consolidation of `input` raw records and log the outcome.
pub fn review(consolidation: &Consolidation, input: usize) -> ReviewReport {
    let mut rejected: BTreeMap<RejectReason, usize> = BTreeMap::new();
    for r in &consolidation.rejected {
        *rejected.entry(r.reason).or_default() += 1;
    }

    let accepted = consolidation.accepted_count();
    let rejected_total: usize = rejected.values().sum();
    let mut warnings = Vec::new();

    if accepted == 0 {
        warnings.push("no events survived consolidation".to_string());
    }
    if input > 0 && rejected_total * 2 > input {
        warnings.push(format!(
            "{rejected_total} of {input} input records were rejected"
        ));
    }
    let unkinded = consolidation.events().filter(|e| e.kind.is_none()).count();
    if unkinded > 0 {
        warnings.push(format!("{unkinded} event(s) without a kind"));
    }

    let report = ReviewReport {
        input,
        accepted,
        groups: consolidation.groups.len(),
        rejected,
        warnings,
    };

    for warning in &report.warnings {
        warn!(%warning, "review");
    }
    info!(
        input = report.input,
        accepted = report.accepted,
        rejected = report.rejected_total(),
        groups = report.groups,
        "review complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};
    use eventdigest_shared::{
        CanonicalEvent, EventGroup, EventKind, RawDate, RawEvent, RejectedEvent,
    };

    fn accepted(kind: Option<EventKind>) -> CanonicalEvent {
        let date = NaiveDate::from_ymd_opt(2025, 5, 19).unwrap();
        CanonicalEvent {
            title: "AI Meetup".into(),
            url: "https://x.com/e".into(),
            date,
            weekday: date.weekday(),
            location: None,
            description: None,
            kind,
            attendance: None,
        }
    }

    fn rejected(position: usize, reason: RejectReason) -> RejectedEvent {
        RejectedEvent {
            position,
            reason,
            event: RawEvent::new("x", "https://x.com/x", RawDate::Text("TBD".into())),
        }
    }

    fn consolidation(events: Vec<CanonicalEvent>, rejected: Vec<RejectedEvent>) -> Consolidation {
        let groups = if events.is_empty() {
            vec![]
        } else {
            vec![EventGroup {
                weekday: events[0].weekday,
                events,
            }]
        };
        Consolidation { groups, rejected }
    }

    #[test]
    fn clean_run_has_no_warnings() {
        let c = consolidation(
            vec![accepted(Some(EventKind::Meetup))],
            vec![rejected(1, RejectReason::Duplicate)],
        );
        let report = review(&c, 2);

        assert!(report.is_clean(), "{:?}", report.warnings);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.groups, 1);
        assert_eq!(report.rejected.get(&RejectReason::Duplicate), Some(&1));
        assert_eq!(report.rejected_total(), 1);
    }

    #[test]
    fn warns_on_empty_and_heavy_rejection() {
        let c = consolidation(
            vec![],
            vec![
                rejected(0, RejectReason::InvalidDate),
                rejected(1, RejectReason::AlreadyPosted),
            ],
        );
        let report = review(&c, 2);

        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("no events"));
        assert!(report.warnings[1].contains("2 of 2"));
    }

    #[test]
    fn warns_on_missing_kind() {
        let c = consolidation(vec![accepted(None), accepted(Some(EventKind::Other))], vec![]);
        let report = review(&c, 2);
        assert_eq!(report.warnings, vec!["1 event(s) without a kind".to_string()]);
    }

    #[test]
    fn report_serializes_reason_keys() {
        let c = consolidation(
            vec![accepted(Some(EventKind::Workshop))],
            vec![rejected(1, RejectReason::InvalidDate)],
        );
        let json = serde_json::to_value(review(&c, 2)).expect("serialize");
        assert_eq!(json["rejected"]["invalid_date"], 1);
        assert!(json.get("warnings").is_none());
    }
}
