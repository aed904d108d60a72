//! Free-text search answer parser.
//!
//! Block rules:
//! - a blank line ends the current block
//! - a line starting with `###`, `- **`, `* **` or `**` starts a new block
//! - blocks mentioning `summary`, `overview`, `note:` or `while there are`
//!   are commentary, not events
//! - blocks starting with `{` or `"answer":` are payload leftovers
//!
//! Inside a block the first line is the title, the first date-like span is
//! the date and the first URL is the link.
//!
//! With a [`DateWindow`], blocks whose date parses to a day outside the
//! window are dropped. Unparseable dates are kept for consolidation to judge.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use tracing::{debug, info, instrument};

use eventdigest_consolidate::{find_date_text, parse_date_text};
use eventdigest_shared::{Attendance, EventKind, RawDate, RawEvent};

/// Longest title kept as-is; longer ones are cut and end in `...`.
const MAX_TITLE_CHARS: usize = 100;

const BLOCK_STARTS: &[&str] = &["###", "- **", "* **", "**"];

const COMMENTARY_MARKERS: &[&str] = &["summary", "overview", "note:", "while there are"];

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `http(s)://...` or bare `www....` links.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"]+|www\.[^\s<>"]+"#).expect("url regex")
});

/// Matches `### `, `## ` header markers.
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#+\s*").expect("header regex"));

/// Matches `- `, `• `, `* ` bullets (but not a `**` bold marker).
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-•]|\*\s)\s*").expect("bullet regex"));

/// Matches list numbering like `1. ` or `2) `.
static NUMBERING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[.)]\s+").expect("numbering regex"));

/// Matches `(pplx://...)` citation links.
static PPLX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(pplx://[^)]*\)").expect("pplx regex"));

/// Matches `[text](target)` markdown links.
static MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("markdown link regex"));

/// Matches a leading `[...]` tag such as `[Link]` or `[1]`.
static BRACKET_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]*\]\s*").expect("bracket prefix regex"));

/// Matches `Location: ...` lines, tolerating bullets and bold labels.
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:[-*•]\s+)?\**(?:location|venue|where)\**\s*:\**\s*(.+)$")
        .expect("location regex")
});

/// Matches `Description: ...` lines.
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:[-*•]\s+)?\**description\**\s*:\**\s*(.+)$")
        .expect("description regex")
});

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Days `[start, start + days)` an extracted event must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub days: u32,
}

impl DateWindow {
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self { start, days }
    }

    /// First day after the window.
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_days(Days::new(u64::from(self.days)))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end()
    }
}

/// Extraction switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// `None` keeps events of any date.
    pub window: Option<DateWindow>,
}

impl ExtractOptions {
    /// Keep `days` days starting at `today`; `0` disables the window.
    pub fn from_today(today: NaiveDate, days: u32) -> Self {
        Self {
            window: (days > 0).then(|| DateWindow::new(today, days)),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a search answer into raw events.
///
/// Never fails: blocks without a date or a usable title are skipped, as are
/// blocks dated outside `options.window`.
#[instrument(skip_all, fields(chars = text.len(), window = ?options.window))]
pub fn parse_search_answer(text: &str, options: &ExtractOptions) -> Vec<RawEvent> {
    // Answers sometimes arrive JSON-escaped.
    let text = text.replace("\\n", "\n").replace("\\\"", "\"");

    let blocks = split_blocks(&text);
    let mut events = Vec::new();
    let mut outside_window = 0usize;

    for block in &blocks {
        if is_commentary(block) {
            debug!(block = %first_line(block), "skipping commentary block");
            continue;
        }
        let Some(event) = parse_block(block) else {
            debug!(block = %first_line(block), "no event in block");
            continue;
        };
        if let Some(window) = &options.window {
            if !in_window(&event, window) {
                debug!(title = %event.title, "event outside date window");
                outside_window += 1;
                continue;
            }
        }
        events.push(event);
    }

    info!(
        blocks = blocks.len(),
        events = events.len(),
        outside_window,
        "extracted events"
    );
    events
}

/// Split text into candidate event blocks.
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();

        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
            continue;
        }

        if BLOCK_STARTS.iter().any(|p| line.starts_with(p)) && !current.is_empty() {
            blocks.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}

/// Strip markdown and citation debris from a title line.
pub fn clean_title(line: &str) -> String {
    let mut title = line.trim().to_string();

    title = HEADER_RE.replace(&title, "").into_owned();
    title = BULLET_RE.replace(&title, "").into_owned();
    title = title.replace("**", "");
    title = NUMBERING_RE.replace(title.trim(), "").into_owned();
    title = PPLX_RE.replace_all(&title, "").into_owned();
    title = MD_LINK_RE.replace_all(&title, "$1").into_owned();
    title = BRACKET_PREFIX_RE.replace(title.trim(), "").into_owned();

    let title = title.trim().trim_end_matches(',').trim();
    let title = title.trim_matches('"').trim_end_matches(',').trim();

    truncate_title(title)
}

/// Classify an event block by keyword.
pub fn classify_kind(block: &str) -> EventKind {
    let lower = block.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["meetup", "networking"]) {
        EventKind::Meetup
    } else if has(&["workshop", "training"]) {
        EventKind::Workshop
    } else if has(&["hackathon"]) {
        EventKind::Hackathon
    } else {
        EventKind::Conference
    }
}

/// Classify how attendees join. A block with a location but no remote hint
/// counts as in person.
pub fn classify_attendance(block: &str) -> Option<Attendance> {
    let lower = block.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["hybrid"]) {
        Some(Attendance::Hybrid)
    } else if has(&["online", "virtual", "livestream", "zoom", "webinar", "remote"]) {
        Some(Attendance::Online)
    } else if has(&["in person", "in-person", "inperson", "on-site", "onsite"])
        || labelled(&LOCATION_RE, block).is_some()
    {
        Some(Attendance::InPerson)
    } else {
        None
    }
}

fn parse_block(block: &str) -> Option<RawEvent> {
    let date = find_date_text(block)?;
    let title = clean_title(first_line(block));
    if title.is_empty() {
        return None;
    }

    let url = URL_RE
        .find(block)
        .map(|m| trim_url(m.as_str()).to_string())
        .unwrap_or_default();

    Some(RawEvent {
        location: labelled(&LOCATION_RE, block),
        description: labelled(&DESCRIPTION_RE, block),
        kind: Some(classify_kind(block)),
        attendance: classify_attendance(block),
        ..RawEvent::new(title, url, RawDate::Text(date.to_string()))
    })
}

fn in_window(event: &RawEvent, window: &DateWindow) -> bool {
    match &event.start_date {
        Some(RawDate::Text(text)) => {
            parse_date_text(text, window.start).is_none_or(|date| window.contains(date))
        }
        Some(RawDate::Date(date)) => window.contains(*date),
        None => true,
    }
}

fn is_commentary(block: &str) -> bool {
    let lower = block.to_lowercase();
    COMMENTARY_MARKERS.iter().any(|m| lower.contains(m))
        || block.starts_with('{')
        || block.starts_with("\"answer\":")
}

fn first_line(block: &str) -> &str {
    block.lines().next().unwrap_or_default()
}

/// Drop markdown and sentence punctuation glued to the end of a URL.
fn trim_url(url: &str) -> &str {
    url.trim_end_matches(|c: char| matches!(c, ')' | ']' | '*' | '_' | '.' | ',' | ';' | ':' | '!' | '?' | '\''))
}

fn labelled(re: &Regex, block: &str) -> Option<String> {
    let caps = re.captures(block)?;
    let value = caps[1].trim().trim_matches('*').trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_CHARS {
        let mut cut: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        cut.push_str("...");
        cut
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("../../../fixtures/text/search-answer.md").expect("read fixture")
    }

    fn parse(text: &str) -> Vec<RawEvent> {
        parse_search_answer(text, &ExtractOptions::default())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_fixture_answer() {
        let events = parse(&fixture());
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "AI Founders Breakfast",
                "LLM Agents Workshop",
                "GenAI Hack Night",
                "Applied ML Conference",
            ]
        );

        let breakfast = &events[0];
        assert_eq!(
            breakfast.url,
            "https://lu.ma/ai-founders-breakfast?utm_source=perplexity"
        );
        assert_eq!(
            breakfast.start_date,
            Some(RawDate::Text("May 19, 2025".into()))
        );
        assert_eq!(
            breakfast.location.as_deref(),
            Some("Frontier Tower, San Francisco")
        );
        assert_eq!(breakfast.kind, Some(EventKind::Meetup));
        assert_eq!(breakfast.attendance, Some(Attendance::InPerson));

        let workshop = &events[1];
        assert_eq!(
            workshop.url,
            "https://www.eventbrite.com/e/llm-agents-workshop-123"
        );
        assert_eq!(workshop.start_date, Some(RawDate::Text("2025-05-20".into())));
        assert_eq!(workshop.location.as_deref(), Some("Palo Alto"));
        assert_eq!(
            workshop.description.as_deref(),
            Some("Hands-on training on building tool-using agents.")
        );
        assert_eq!(workshop.kind, Some(EventKind::Workshop));

        let hack = &events[2];
        assert_eq!(hack.url, "www.genaihack.dev/may");
        assert_eq!(hack.kind, Some(EventKind::Hackathon));
        assert!(hack.location.is_none());
        assert!(hack.attendance.is_none());

        let conf = &events[3];
        assert_eq!(conf.url, "https://appliedml.example.com/2025");
        assert_eq!(conf.start_date, Some(RawDate::Text("May 23, 2025".into())));
        assert_eq!(conf.kind, Some(EventKind::Conference));
    }

    #[test]
    fn window_drops_events_outside_range() {
        // Tue May 20 .. Thu May 22: only the workshop and the hack night fit.
        let options = ExtractOptions::from_today(ymd(2025, 5, 20), 3);
        let events = parse_search_answer(&fixture(), &options);
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["LLM Agents Workshop", "GenAI Hack Night"]);
    }

    #[test]
    fn window_drops_last_years_event() {
        let options = ExtractOptions::from_today(ymd(2025, 5, 19), 7);
        assert_eq!(parse_search_answer(&fixture(), &options).len(), 4);

        let text = "**Last Year's Summit**\nMay 20, 2024\nhttps://x.com/old";
        assert!(parse_search_answer(text, &options).is_empty());
    }

    #[test]
    fn window_keeps_unparseable_dates() {
        let window = DateWindow::new(ymd(2025, 5, 19), 7);
        let tbd = RawEvent::new("Mystery Meetup", "https://x.com/m", RawDate::Text("TBD".into()));
        assert!(in_window(&tbd, &window));

        let typed = RawEvent::new("Old", "https://x.com/o", RawDate::Date(ymd(2025, 5, 1)));
        assert!(!in_window(&typed, &window));
    }

    #[test]
    fn zero_day_window_is_disabled() {
        let options = ExtractOptions::from_today(ymd(2030, 1, 1), 0);
        assert!(options.window.is_none());
        assert_eq!(parse_search_answer(&fixture(), &options).len(), 4);
    }

    #[test]
    fn date_window_bounds() {
        let window = DateWindow::new(ymd(2025, 5, 19), 5);
        assert_eq!(window.end(), ymd(2025, 5, 24));
        assert!(window.contains(ymd(2025, 5, 19)));
        assert!(window.contains(ymd(2025, 5, 23)));
        assert!(!window.contains(ymd(2025, 5, 24)));
        assert!(!window.contains(ymd(2025, 5, 18)));
    }

    #[test]
    fn attendance_classification() {
        assert_eq!(
            classify_attendance("Hybrid panel, SF and livestream"),
            Some(Attendance::Hybrid)
        );
        assert_eq!(classify_attendance("Join on Zoom"), Some(Attendance::Online));
        assert_eq!(
            classify_attendance("**AI Day**\nLocation: Oakland"),
            Some(Attendance::InPerson)
        );
        assert_eq!(
            classify_attendance("**AI Day**\nLocation: Online"),
            Some(Attendance::Online)
        );
        assert_eq!(classify_attendance("**AI Day**\nMay 20, 2025"), None);
    }

    #[test]
    fn block_splitting() {
        let text = "### One\nline a\n**Two**\nline b\n\n- **Three**\n* **Four**";
        let blocks = split_blocks(text);
        assert_eq!(
            blocks,
            vec!["### One\nline a", "**Two**\nline b", "- **Three**", "* **Four**"]
        );
    }

    #[test]
    fn commentary_blocks_skipped() {
        let text = "Overview of AI events on May 20, 2025\n\n\
                    While there are many events May 21, 2025, few are free\n\n\
                    \"answer\": \"AI Day May 22, 2025\"";
        assert!(parse(text).is_empty());
    }

    #[test]
    fn blocks_without_date_dropped() {
        let text = "### Vector Search Social\nhttps://meetup.com/vector-search";
        assert!(parse(text).is_empty());
    }

    #[test]
    fn escaped_newlines_are_unescaped() {
        let text = r#"**AI Summit**\nMay 20, 2025\nhttps://x.com/summit"#;
        let events = parse(text);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "AI Summit");
        assert_eq!(events[0].url, "https://x.com/summit");
    }

    #[test]
    fn missing_url_is_empty_string() {
        let events = parse("**Offline Meetup**\nMay 22, 2025");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].url, "");
    }

    #[test]
    fn title_cleanup() {
        assert_eq!(clean_title("### 2. Agents Day"), "Agents Day");
        assert_eq!(clean_title("- **Agents Day**"), "Agents Day");
        assert_eq!(clean_title("**\"Agents Day\",**"), "Agents Day");
        assert_eq!(clean_title("[Link] Agents Day"), "Agents Day");
        assert_eq!(
            clean_title("**[Agents Day](https://x.com/a)** (pplx://action/x)"),
            "Agents Day"
        );
    }

    #[test]
    fn long_titles_are_truncated() {
        let long = "A".repeat(120);
        let title = clean_title(&long);
        assert_eq!(title.chars().count(), 100);
        assert!(title.ends_with("..."));

        let exact = "B".repeat(100);
        assert_eq!(clean_title(&exact), exact);
    }

    #[test]
    fn kind_classification() {
        assert_eq!(classify_kind("AI networking night"), EventKind::Meetup);
        assert_eq!(classify_kind("Hands-on Training"), EventKind::Workshop);
        assert_eq!(classify_kind("48h Hackathon"), EventKind::Hackathon);
        assert_eq!(classify_kind("AI Summit 2025"), EventKind::Conference);
        // meetup wins over workshop
        assert_eq!(classify_kind("workshop meetup"), EventKind::Meetup);
    }

    #[test]
    fn extracted_events_serialize_as_raw_input() {
        let events = parse(&fixture());
        let json = serde_json::to_value(&events).expect("serialize");
        assert_eq!(json.as_array().map(Vec::len), Some(4));
        assert_eq!(json[0]["start_date"], "May 19, 2025");
        assert_eq!(json[0]["kind"], "Meetup");
        assert_eq!(json[0]["attendance"], "INPERSON");
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }
}
