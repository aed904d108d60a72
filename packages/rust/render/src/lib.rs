//! Weekly Discord digest rendering.
//!
//! Output shape:
//!
//! ```text
//! **==================[ WEEK 21 EVENTS ]==================**
//!
//! **[MONDAY]**
//! **[[Vector DB Night]](https://x.com/vdb)** (INPERSON)[Meetup] @ Oakland
//!
//! **[TUESDAY]**
//! (no events)
//! ```

mod split;

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};

use eventdigest_consolidate::week_from;
use eventdigest_shared::{CanonicalEvent, Consolidation, DigestConfig};

pub use split::split_message;

/// Placeholder line under a workday without events.
pub const NO_EVENTS: &str = "(no events)";

/// Rendering switches.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Always render Monday through Friday, even when empty.
    pub show_empty_workdays: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_empty_workdays: true,
        }
    }
}

impl From<&DigestConfig> for RenderOptions {
    fn from(config: &DigestConfig) -> Self {
        Self {
            show_empty_workdays: config.show_empty_workdays,
        }
    }
}

/// Render the weekly digest message for `today`'s ISO week.
///
/// Days appear in the same today-relative order as the consolidation groups.
pub fn render_digest(
    consolidation: &Consolidation,
    today: NaiveDate,
    options: &RenderOptions,
) -> String {
    let mut out = week_header(today);

    let by_day: HashMap<Weekday, &[CanonicalEvent]> = consolidation
        .groups
        .iter()
        .map(|g| (g.weekday, g.events.as_slice()))
        .collect();

    let mut sections: Vec<String> = Vec::new();
    for day in week_from(today) {
        match by_day.get(&day) {
            Some(events) if !events.is_empty() => {
                let mut section = day_header(day);
                for event in events.iter() {
                    section.push('\n');
                    section.push_str(&event_line(event));
                }
                sections.push(section);
            }
            _ if options.show_empty_workdays && is_workday(day) => {
                sections.push(format!("{}\n{NO_EVENTS}", day_header(day)));
            }
            _ => {}
        }
    }

    if sections.is_empty() {
        sections.push(NO_EVENTS.to_string());
    }

    out.push_str("\n\n");
    out.push_str(&sections.join("\n\n"));
    out.push('\n');
    out
}

/// `**==================[ WEEK n EVENTS ]==================**`
pub fn week_header(today: NaiveDate) -> String {
    format!(
        "**==================[ WEEK {} EVENTS ]==================**",
        today.iso_week().week()
    )
}

/// `**[MONDAY]**`
pub fn day_header(day: Weekday) -> String {
    format!("**[{}]**", day_name(day))
}

/// One entry line: `**[[Title]](url)** (MODE)[Kind] @ location`.
///
/// Unknown attendance mode or kind leave their tag out.
pub fn event_line(event: &CanonicalEvent) -> String {
    let title = escape_brackets(&event.title);
    let mut line = if event.url.is_empty() {
        format!("**[{title}]**")
    } else {
        format!("**[[{title}]]({})**", escape_url(&event.url))
    };

    match (event.attendance, event.kind) {
        (Some(mode), Some(kind)) => {
            line.push_str(&format!(" ({})[{}]", mode.label(), kind.label()));
        }
        (Some(mode), None) => line.push_str(&format!(" ({})", mode.label())),
        (None, Some(kind)) => line.push_str(&format!(" [{}]", kind.label())),
        (None, None) => {}
    }
    if let Some(location) = &event.location {
        line.push_str(&format!(" @ {location}"));
    }
    line
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

fn is_workday(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

fn escape_brackets(s: &str) -> String {
    s.replace('[', r"\[").replace(']', r"\]")
}

/// A `)` would end the markdown link early.
fn escape_url(url: &str) -> String {
    url.replace('(', "%28").replace(')', "%29")
}
