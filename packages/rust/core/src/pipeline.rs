//! End-to-end digest run: raw events → consolidate → review → render →
//! files → webhook → known-URL ledger.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use eventdigest_consolidate::{ConsolidateOptions, consolidate, parse_raw_events_str};
use eventdigest_render::{RenderOptions, render_digest, split_message};
use eventdigest_shared::{
    CURRENT_SCHEMA_VERSION, Consolidation, DigestConfig, EventDigestError, Result, RunId,
};
use eventdigest_storage::KnownUrlLedger;

use crate::delivery::WebhookClient;
use crate::output::{FinalResults, OutputPaths, write_results};
use crate::review::{ReviewReport, review};

/// Configuration for one `run_digest` call.
#[derive(Debug, Clone)]
pub struct RunDigestConfig {
    /// JSON array of raw events.
    pub input: PathBuf,
    /// Reference date; the only clock the pipeline sees.
    pub today: NaiveDate,
    /// Merged file + flag settings.
    pub digest: DigestConfig,
    /// Post to this webhook after writing files.
    pub webhook_url: Option<String>,
    /// Compute and render only: no files, no webhook, no ledger writes.
    pub dry_run: bool,
}

/// Result of a `run_digest` call.
#[derive(Debug)]
pub struct DigestResult {
    pub run_id: RunId,
    pub consolidation: Consolidation,
    pub review: ReviewReport,
    /// The full rendered message.
    pub message: String,
    /// The message split to the configured size limit.
    pub chunks: Vec<String>,
    /// `None` on dry runs.
    pub outputs: Option<OutputPaths>,
    /// Chunks accepted by the webhook.
    pub posted: usize,
    /// New entries written to the known-URL ledger.
    pub recorded: usize,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each webhook chunk is accepted.
    fn chunk_posted(&self, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &DigestResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn chunk_posted(&self, _current: usize, _total: usize) {}
    fn done(&self, _result: &DigestResult) {}
}

/// Run the full digest pipeline.
///
/// 1. Load and shape-check the raw events
/// 2. Load the known-URL ledger
/// 3. Consolidate and review
/// 4. Render and split the message
/// 5. Write result files (skipped on dry runs)
/// 6. Post to the webhook, if configured (skipped on dry runs)
/// 7. Record accepted URLs in the ledger once everything above succeeded
#[instrument(skip_all, fields(input = %config.input.display(), today = %config.today, dry_run = config.dry_run))]
pub async fn run_digest(
    config: &RunDigestConfig,
    progress: &dyn ProgressReporter,
) -> Result<DigestResult> {
    let start = Instant::now();
    let run_id = RunId::new();

    info!(%run_id, "starting digest run");

    // --- Phase 1: Input ---
    progress.phase("Loading events");
    let content = tokio::fs::read_to_string(&config.input)
        .await
        .map_err(|e| EventDigestError::io(&config.input, e))?;
    let raw_events = parse_raw_events_str(&content)?;

    // --- Phase 2: Known URLs ---
    progress.phase("Loading known URLs");
    let known_path = &config.digest.known_urls_file;
    let mut ledger = if config.dry_run {
        KnownUrlLedger::open_readonly(known_path).await?
    } else {
        KnownUrlLedger::open(known_path).await?
    };

    // --- Phase 3: Consolidate + review ---
    progress.phase("Consolidating events");
    let options = ConsolidateOptions {
        today: config.today,
        extra_tracking_params: config.digest.extra_tracking_params.clone(),
    };
    let consolidation = consolidate(&raw_events, ledger.urls(), &options);
    let report = review(&consolidation, raw_events.len());

    // --- Phase 4: Render ---
    progress.phase("Rendering digest");
    let message = render_digest(
        &consolidation,
        config.today,
        &RenderOptions::from(&config.digest),
    );
    let chunks = split_message(&message, config.digest.message_limit);

    let mut result = DigestResult {
        run_id,
        consolidation,
        review: report,
        message,
        chunks,
        outputs: None,
        posted: 0,
        recorded: 0,
        elapsed: start.elapsed(),
    };

    if config.dry_run {
        info!(accepted = result.review.accepted, "dry run, nothing written");
        result.elapsed = start.elapsed();
        progress.done(&result);
        return Ok(result);
    }

    // --- Phase 5: Result files ---
    progress.phase("Writing result files");
    let final_results = FinalResults {
        schema_version: CURRENT_SCHEMA_VERSION,
        run_id: result.run_id.clone(),
        today: config.today,
        generated_at: Utc::now(),
        groups: result.consolidation.groups.clone(),
        rejected: result.consolidation.rejected.clone(),
        review: result.review.clone(),
    };
    result.outputs = Some(write_results(
        &config.digest.output_dir,
        &result.message,
        &raw_events,
        &final_results,
    )?);

    // --- Phase 6: Delivery ---
    if let Some(url) = &config.webhook_url {
        progress.phase("Posting to Discord");
        let client = WebhookClient::new(url, config.digest.username.clone())?;
        result.posted = client
            .deliver(result.chunks.as_slice(), |current, total| {
                progress.chunk_posted(current, total)
            })
            .await?;
    }

    // --- Phase 7: Ledger ---
    progress.phase("Recording posted URLs");
    let urls: Vec<&str> = result
        .consolidation
        .events()
        .map(|e| e.url.as_str())
        .filter(|u| !u.is_empty())
        .collect();
    result.recorded = ledger.append(urls).await?;

    result.elapsed = start.elapsed();
    progress.done(&result);

    info!(
        run_id = %result.run_id,
        accepted = result.review.accepted,
        rejected = result.review.rejected_total(),
        posted = result.posted,
        recorded = result.recorded,
        elapsed_ms = result.elapsed.as_millis(),
        "digest run complete"
    );

    Ok(result)
}
