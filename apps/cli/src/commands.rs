//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use eventdigest_consolidate::canonicalize_url;
use eventdigest_core::output::read_results;
use eventdigest_core::pipeline::{DigestResult, ProgressReporter, RunDigestConfig, run_digest};
use eventdigest_core::review::ReviewReport;
use eventdigest_extract::{ExtractOptions, parse_search_answer};
use eventdigest_shared::{
    AppConfig, DigestConfig, init_config, load_config, load_config_from, webhook_url,
};
use eventdigest_storage::KnownUrlLedger;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// eventdigest: weekly event digests for Discord.
#[derive(Parser)]
#[command(
    name = "eventdigest",
    version,
    about = "Consolidate event search results into a weekly Discord digest.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.eventdigest/eventdigest.toml).
    #[arg(long, env = "EVENTDIGEST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Turn a free-text search answer into raw events JSON.
    Extract {
        /// Answer text file, or `-` for stdin.
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// First day of the date window (YYYY-MM-DD). Defaults to the local date.
        #[arg(long, value_parser = parse_today)]
        today: Option<NaiveDate>,

        /// Days in the date window (overrides config); 0 keeps every date.
        #[arg(long)]
        window_days: Option<u32>,
    },

    /// Consolidate raw events, write the digest and optionally post it.
    Run {
        /// JSON array of raw events.
        #[arg(short, long)]
        input: PathBuf,

        /// Reference date (YYYY-MM-DD). Defaults to the local date.
        #[arg(long, value_parser = parse_today)]
        today: Option<NaiveDate>,

        /// Output directory (overrides config).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Known-URL file (overrides config).
        #[arg(long)]
        known_urls: Option<PathBuf>,

        /// Post the digest to the Discord webhook.
        #[arg(long)]
        post: bool,

        /// Print the digest without writing, posting or recording anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Summarize the last run's `final_results.json`.
    Report {
        /// Output directory of the run (overrides config).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Inspect or seed the known-URL ledger.
    Known {
        #[command(subcommand)]
        action: KnownAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Known-URL subcommands.
#[derive(Subcommand)]
pub(crate) enum KnownAction {
    /// List known URLs.
    List {
        /// Known-URL file (overrides config).
        #[arg(long)]
        known_urls: Option<PathBuf>,
    },
    /// Mark URLs as already posted.
    Add {
        /// URLs to record; canonicalized first.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Known-URL file (overrides config).
        #[arg(long)]
        known_urls: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

fn parse_today(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// clean for JSON and digest output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "eventdigest=info",
        1 => "eventdigest=debug",
        _ => "eventdigest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Extract {
            input,
            out,
            today,
            window_days,
        } => {
            let config = load_app_config(config_path)?;
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let days = window_days.unwrap_or(config.extract.window_days);
            let options = ExtractOptions::from_today(today, days);
            cmd_extract(&input, out.as_deref(), &options)
        }
        Command::Run {
            input,
            today,
            out,
            known_urls,
            post,
            dry_run,
        } => {
            let config = load_app_config(config_path)?;
            let options = RunOptions {
                input,
                today,
                out,
                known_urls,
                post,
                dry_run,
            };
            cmd_run(&config, options).await
        }
        Command::Report { out } => {
            let config = load_app_config(config_path)?;
            cmd_report(&config, out)
        }
        Command::Known { action } => {
            let config = load_app_config(config_path)?;
            match action {
                KnownAction::List { known_urls } => cmd_known_list(&config, known_urls).await,
                KnownAction::Add { urls, known_urls } => {
                    cmd_known_add(&config, &urls, known_urls).await
                }
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_extract(input: &Path, out: Option<&Path>, options: &ExtractOptions) -> Result<()> {
    let text = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)
            .map_err(|e| eyre!("cannot read '{}': {e}", input.display()))?
    };

    let events = parse_search_answer(&text, options);
    let json = serde_json::to_string_pretty(&events)?;

    match out {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?;
            info!(events = events.len(), path = %path.display(), "wrote raw events");
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Flags of the `run` command.
struct RunOptions {
    input: PathBuf,
    today: Option<NaiveDate>,
    out: Option<PathBuf>,
    known_urls: Option<PathBuf>,
    post: bool,
    dry_run: bool,
}

async fn cmd_run(config: &AppConfig, options: RunOptions) -> Result<()> {
    let mut digest = DigestConfig::from(config);
    if let Some(out) = options.out {
        digest.output_dir = out;
    }
    if let Some(known) = options.known_urls {
        digest.known_urls_file = known;
    }

    let today = options.today.unwrap_or_else(|| Local::now().date_naive());

    let webhook = match (options.post, options.dry_run) {
        (true, false) => Some(webhook_url(config)?),
        (true, true) => {
            warn!("--post is ignored on a dry run");
            None
        }
        _ => None,
    };

    let run_config = RunDigestConfig {
        input: options.input,
        today,
        digest,
        webhook_url: webhook,
        dry_run: options.dry_run,
    };

    info!(
        input = %run_config.input.display(),
        %today,
        post = run_config.webhook_url.is_some(),
        dry_run = run_config.dry_run,
        "running digest"
    );

    let reporter = CliProgress::new();
    let result = run_digest(&run_config, &reporter).await?;

    if run_config.dry_run {
        println!("{}", result.message);
    }
    print_summary(&result);

    Ok(())
}

fn print_summary(result: &DigestResult) {
    println!();
    println!("  Digest complete!");
    println!("  Run:       {}", result.run_id);
    print_review(&result.review);
    println!("  Chunks:    {}", result.chunks.len());
    println!("  Posted:    {}", result.posted);
    println!("  Recorded:  {}", result.recorded);
    match &result.outputs {
        Some(paths) => println!("  Output:    {}", paths.dir.display()),
        None => println!("  Output:    (dry run, nothing written)"),
    }
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn print_review(review: &ReviewReport) {
    println!("  Input:     {}", review.input);
    println!("  Accepted:  {}", review.accepted);
    println!("  Groups:    {}", review.groups);
    println!("  Rejected:  {}", review.rejected_total());
    for (reason, count) in &review.rejected {
        println!("    {reason}: {count}");
    }
    for warning in &review.warnings {
        println!("  Warning:   {warning}");
    }
}

fn cmd_report(config: &AppConfig, out: Option<PathBuf>) -> Result<()> {
    let dir = out.unwrap_or_else(|| DigestConfig::from(config).output_dir);
    let results = read_results(&dir)?;

    println!();
    println!("  Run:       {}", results.run_id);
    println!("  Today:     {}", results.today);
    println!("  Generated: {}", results.generated_at.to_rfc3339());
    print_review(&results.review);
    for group in &results.groups {
        println!("  {:?}: {} event(s)", group.weekday, group.events.len());
    }
    println!();

    Ok(())
}

async fn cmd_known_list(config: &AppConfig, known_urls: Option<PathBuf>) -> Result<()> {
    let path = known_urls.unwrap_or_else(|| DigestConfig::from(config).known_urls_file);
    let ledger = KnownUrlLedger::open_readonly(&path).await?;

    for url in ledger.iter() {
        println!("{url}");
    }
    info!(count = ledger.len(), path = %path.display(), "listed known URLs");
    Ok(())
}

async fn cmd_known_add(
    config: &AppConfig,
    urls: &[String],
    known_urls: Option<PathBuf>,
) -> Result<()> {
    let digest = DigestConfig::from(config);
    let path = known_urls.unwrap_or(digest.known_urls_file);

    let canonical: Vec<String> = urls
        .iter()
        .map(|u| canonicalize_url(u, &digest.extra_tracking_params))
        .filter(|u| !u.is_empty())
        .collect();
    if canonical.is_empty() {
        return Err(eyre!("no usable URLs given"));
    }

    let mut ledger = KnownUrlLedger::open(&path).await?;
    let added = ledger.append(&canonical).await?;

    println!(
        "Recorded {added} new URL(s) in {} ({} already known)",
        path.display(),
        canonical.len() - added
    );
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn chunk_posted(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Posting to Discord [{current}/{total}]"));
    }

    fn done(&self, _result: &DigestResult) {
        self.spinner.finish_and_clear();
    }
}
