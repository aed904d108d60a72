//! Core domain types for event digests.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the `final_results.json` format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for digest run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RawEvent
// ---------------------------------------------------------------------------

/// Event category as classified by the search step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(alias = "conference")]
    Conference,
    #[serde(alias = "meetup")]
    Meetup,
    #[serde(alias = "workshop")]
    Workshop,
    #[serde(alias = "hackathon")]
    Hackathon,
    #[serde(alias = "tech_session", alias = "Tech Session")]
    TechSession,
    /// Any label we do not recognize.
    #[serde(other)]
    Other,
}

impl EventKind {
    /// Label used in rendered messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Conference => "Conference",
            Self::Meetup => "Meetup",
            Self::Workshop => "Workshop",
            Self::Hackathon => "Hackathon",
            Self::TechSession => "Tech Session",
            Self::Other => "Event",
        }
    }
}

/// How attendees take part in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Attendance {
    InPerson,
    Online,
    Hybrid,
}

impl Attendance {
    /// Label used in rendered messages and JSON.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InPerson => "INPERSON",
            Self::Online => "ONLINE",
            Self::Hybrid => "HYBRID",
        }
    }

    /// Parse a mode label, ignoring case, spaces, `-` and `_`
    /// (`"In-Person"`, `"virtual"`, `"HYBRID"`).
    pub fn from_label(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "inperson" | "onsite" | "offline" => Some(Self::InPerson),
            "online" | "virtual" | "remote" => Some(Self::Online),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

impl TryFrom<String> for Attendance {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_label(&value).ok_or_else(|| format!("unknown attendance mode: {value}"))
    }
}

impl From<Attendance> for String {
    fn from(value: Attendance) -> Self {
        value.label().to_string()
    }
}

/// The raw `start_date` of an event: either an already-typed calendar date
/// or whatever text the upstream step produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
    Date(NaiveDate),
    Text(String),
}

impl std::fmt::Display for RawDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A candidate event as emitted by the upstream search step.
///
/// No uniqueness is guaranteed: the same event may appear several times with
/// different tracking parameters or slightly different titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub title: String,
    pub url: String,
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<RawDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Upstream confidence score; higher wins during URL dedup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_confidence: Option<f64>,
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    /// Unrecognized modes are dropped rather than failing the record.
    #[serde(
        default,
        alias = "mode",
        deserialize_with = "lenient_attendance",
        skip_serializing_if = "Option::is_none"
    )]
    pub attendance: Option<Attendance>,
}

fn lenient_attendance<'de, D>(deserializer: D) -> std::result::Result<Option<Attendance>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let label: Option<String> = Option::deserialize(deserializer)?;
    Ok(label.as_deref().and_then(Attendance::from_label))
}

impl RawEvent {
    /// Minimal constructor; optional fields start empty.
    pub fn new(title: impl Into<String>, url: impl Into<String>, start_date: RawDate) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            start_date: Some(start_date),
            location: None,
            description: None,
            source_confidence: None,
            kind: None,
            attendance: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Consolidated output
// ---------------------------------------------------------------------------

/// A validated, deduplicated event.
///
/// `url` is canonical and unique within one consolidation; `weekday` is always
/// derived from `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub title: String,
    pub url: String,
    pub date: NaiveDate,
    pub weekday: Weekday,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Attendance>,
}

/// All surviving events that fall on one weekday, ordered by date then title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventGroup {
    pub weekday: Weekday,
    pub events: Vec<CanonicalEvent>,
}

/// Why a raw event did not make it into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidDate,
    AlreadyPosted,
    Duplicate,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidDate => "invalid_date",
            Self::AlreadyPosted => "already_posted",
            Self::Duplicate => "duplicate",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw event paired with the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedEvent {
    /// Index of the record in the raw input.
    pub position: usize,
    pub reason: RejectReason,
    pub event: RawEvent,
}

/// Result of one consolidation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Consolidation {
    /// Non-empty weekday groups in today-relative order.
    pub groups: Vec<EventGroup>,
    /// Rejected records ordered by input position.
    pub rejected: Vec<RejectedEvent>,
}

impl Consolidation {
    /// Iterate over every accepted event, group by group.
    pub fn events(&self) -> impl Iterator<Item = &CanonicalEvent> {
        self.groups.iter().flat_map(|g| g.events.iter())
    }

    /// Number of accepted events.
    pub fn accepted_count(&self) -> usize {
        self.groups.iter().map(|g| g.events.len()).sum()
    }

    /// Number of rejected records with the given reason.
    pub fn rejected_count(&self, reason: RejectReason) -> usize {
        self.rejected.iter().filter(|r| r.reason == reason).count()
    }
}
