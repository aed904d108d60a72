//! Weekday bucketing and ordering.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

use eventdigest_shared::{CanonicalEvent, EventGroup};

/// Days from `from` forward to the next `to` (0 when they are equal).
pub fn days_until(from: Weekday, to: Weekday) -> u32 {
    (7 + to.num_days_from_monday() - from.num_days_from_monday()) % 7
}

/// All seven weekdays, starting with `today`'s.
pub fn week_from(today: NaiveDate) -> [Weekday; 7] {
    let mut day = today.weekday();
    let mut week = [day; 7];
    for slot in week.iter_mut().skip(1) {
        day = day.succ();
        *slot = day;
    }
    week
}

/// Bucket events by weekday. Buckets are ordered by the nearest upcoming
/// occurrence of their weekday relative to `today`; events inside a bucket
/// by date, then title.
pub fn group_by_weekday(events: Vec<CanonicalEvent>, today: NaiveDate) -> Vec<EventGroup> {
    let start = today.weekday();
    let mut buckets: BTreeMap<u32, (Weekday, Vec<CanonicalEvent>)> = BTreeMap::new();

    for event in events {
        buckets
            .entry(days_until(start, event.weekday))
            .or_insert_with(|| (event.weekday, Vec::new()))
            .1
            .push(event);
    }

    buckets
        .into_values()
        .map(|(weekday, mut events)| {
            events.sort_by(compare_events);
            EventGroup { weekday, events }
        })
        .collect()
}

fn compare_events(a: &CanonicalEvent, b: &CanonicalEvent) -> Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.url.cmp(&b.url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str, date: NaiveDate) -> CanonicalEvent {
        CanonicalEvent {
            title: title.into(),
            url: format!("https://x.com/{}", title.to_lowercase().replace(' ', "-")),
            date,
            weekday: date.weekday(),
            location: None,
            description: None,
            kind: None,
            attendance: None,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn days_until_wraps_around() {
        assert_eq!(days_until(Weekday::Mon, Weekday::Mon), 0);
        assert_eq!(days_until(Weekday::Mon, Weekday::Fri), 4);
        assert_eq!(days_until(Weekday::Fri, Weekday::Mon), 3);
        assert_eq!(days_until(Weekday::Sun, Weekday::Sat), 6);
    }

    #[test]
    fn week_starts_today() {
        // 2025-05-15 is a Thursday.
        let week = week_from(ymd(2025, 5, 15));
        assert_eq!(week[0], Weekday::Thu);
        assert_eq!(week[3], Weekday::Sun);
        assert_eq!(week[6], Weekday::Wed);
    }

    #[test]
    fn groups_follow_today_relative_order() {
        // Today is Thursday: Thu, Fri, ..., Wed.
        let today = ymd(2025, 5, 15);
        let events = vec![
            event("Monday Talk", ymd(2025, 5, 19)),
            event("Friday Demo", ymd(2025, 5, 16)),
            event("Thursday Lab", ymd(2025, 5, 15)),
        ];

        let groups = group_by_weekday(events, today);
        let days: Vec<Weekday> = groups.iter().map(|g| g.weekday).collect();
        assert_eq!(days, vec![Weekday::Thu, Weekday::Fri, Weekday::Mon]);
    }

    #[test]
    fn events_within_group_sorted_by_date_then_title() {
        let today = ymd(2025, 5, 15);
        let events = vec![
            event("Zeta", ymd(2025, 5, 19)),
            event("Later Monday", ymd(2025, 5, 26)),
            event("alpha", ymd(2025, 5, 19)),
        ];

        let groups = group_by_weekday(events, today);
        assert_eq!(groups.len(), 1);
        let titles: Vec<&str> = groups[0].events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "Zeta", "Later Monday"]);
    }

    #[test]
    fn empty_input_gives_no_groups() {
        assert!(group_by_weekday(vec![], ymd(2025, 5, 15)).is_empty());
    }
}
