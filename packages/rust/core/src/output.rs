//! Result file writer.
//!
//! Lays out one run's output directory:
//! ```text
//! <output_dir>/
//! ├── discord_events.txt   rendered message
//! ├── events.md            same content
//! ├── final_results.json   groups, rejected, review, run metadata
//! ├── raw_events.json      the run's input records, as parsed
//! └── done                 empty marker, written last
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use eventdigest_shared::{
    CURRENT_SCHEMA_VERSION, EventDigestError, EventGroup, RawEvent, RejectedEvent, Result,
    RunId,
};

use crate::review::ReviewReport;

pub const DISCORD_FILE: &str = "discord_events.txt";
pub const MARKDOWN_FILE: &str = "events.md";
pub const RESULTS_FILE: &str = "final_results.json";
pub const RAW_EVENTS_FILE: &str = "raw_events.json";
pub const DONE_MARKER: &str = "done";

/// Contents of `final_results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResults {
    pub schema_version: u32,
    pub run_id: RunId,
    pub today: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub groups: Vec<EventGroup>,
    pub rejected: Vec<RejectedEvent>,
    pub review: ReviewReport,
}

/// Where a run's files ended up.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub discord: PathBuf,
    pub markdown: PathBuf,
    pub results: PathBuf,
    pub raw_events: PathBuf,
    pub done: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            discord: dir.join(DISCORD_FILE),
            markdown: dir.join(MARKDOWN_FILE),
            results: dir.join(RESULTS_FILE),
            raw_events: dir.join(RAW_EVENTS_FILE),
            done: dir.join(DONE_MARKER),
        }
    }
}

/// Write every result file into `dir`, creating it if needed.
///
/// A stale `done` marker is removed first so readers never pair it with
/// half-written files.
#[instrument(skip_all, fields(dir = %dir.display(), run_id = %results.run_id))]
pub fn write_results(
    dir: &Path,
    message: &str,
    raw_events: &[RawEvent],
    results: &FinalResults,
) -> Result<OutputPaths> {
    let paths = OutputPaths::new(dir);

    std::fs::create_dir_all(dir).map_err(|e| EventDigestError::io(dir, e))?;
    match std::fs::remove_file(&paths.done) {
        Ok(()) => debug!("removed stale done marker"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(EventDigestError::io(&paths.done, e)),
    }

    write_atomic(&paths.discord, message)?;
    write_atomic(&paths.markdown, message)?;
    write_json(&paths.results, results)?;
    write_json(&paths.raw_events, &raw_events)?;
    std::fs::write(&paths.done, "").map_err(|e| EventDigestError::io(&paths.done, e))?;

    info!(
        groups = results.groups.len(),
        rejected = results.rejected.len(),
        "result files written"
    );

    Ok(paths)
}

/// Load and validate a previously written `final_results.json`.
pub fn read_results(dir: &Path) -> Result<FinalResults> {
    let path = dir.join(RESULTS_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| EventDigestError::io(&path, e))?;
    let results: FinalResults = serde_json::from_str(&content)
        .map_err(|e| EventDigestError::validation(format!("invalid {RESULTS_FILE}: {e}")))?;

    if results.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(EventDigestError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            results.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    Ok(results)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write to a temp file, then rename over the target.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| EventDigestError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| EventDigestError::io(path, e))?;

    debug!(path = %path.display(), size = content.len(), "wrote file");
    Ok(())
}

/// Write a JSON file (pretty-printed).
fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| {
        EventDigestError::validation(format!("JSON serialization failed: {e}"))
    })?;
    write_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventdigest_shared::RawDate;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("ed-output-{}", Uuid::now_v7()))
    }

    fn results() -> FinalResults {
        FinalResults {
            schema_version: CURRENT_SCHEMA_VERSION,
            run_id: RunId::new(),
            today: NaiveDate::from_ymd_opt(2025, 5, 15).unwrap(),
            generated_at: Utc::now(),
            groups: vec![],
            rejected: vec![],
            review: ReviewReport {
                input: 0,
                accepted: 0,
                groups: 0,
                rejected: BTreeMap::new(),
                warnings: vec!["no events survived consolidation".into()],
            },
        }
    }

    #[test]
    fn writes_all_files() {
        let dir = temp_dir();
        let results = results();
        let raw = vec![RawEvent::new(
            "AI Policy Forum",
            "https://x.com/policy",
            RawDate::Text("TBD".into()),
        )];
        let paths = write_results(&dir, "**[MONDAY]**\n(no events)\n", &raw, &results).unwrap();

        assert_eq!(
            std::fs::read_to_string(&paths.discord).unwrap(),
            "**[MONDAY]**\n(no events)\n"
        );
        assert_eq!(
            std::fs::read_to_string(&paths.markdown).unwrap(),
            std::fs::read_to_string(&paths.discord).unwrap()
        );
        assert!(paths.done.exists());
        assert_eq!(std::fs::read_to_string(&paths.done).unwrap(), "");

        let loaded = read_results(&dir).unwrap();
        assert_eq!(loaded, results);

        let saved: Vec<RawEvent> =
            serde_json::from_str(&std::fs::read_to_string(&paths.raw_events).unwrap()).unwrap();
        assert_eq!(saved, raw);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = temp_dir();
        write_results(&dir, "msg", &[], &results()).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let dir = temp_dir();
        let mut results = results();
        results.schema_version = 99;
        write_results(&dir, "msg", &[], &results).unwrap();

        let err = read_results(&dir).unwrap_err();
        assert!(err.to_string().contains("unsupported schema_version"));
    }

    #[test]
    fn missing_results_is_io_error() {
        let err = read_results(&temp_dir()).unwrap_err();
        assert!(matches!(err, EventDigestError::Io { .. }));
    }
}
