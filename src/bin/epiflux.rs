//! Epiflux CLI - Command-line interface for the Epiflux dashboard pipeline
//!
//! Commands:
//! - analyze: Compute a dashboard snapshot from a row bundle
//! - timeline: Build the merged timeline only
//! - validate: Report malformed rows in a row bundle
//! - watch: Poll the backend and print a snapshot per refresh (feature `http`)
//! - summarize: Reduce one game round to session metrics
//! - session: Start, inspect or reset the play-session timer
//! - schema: Describe the input and output documents
//! - doctor: Diagnose configuration and environment

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use epiflux::config::{PipelineConfig, TimelinePolicy};
use epiflux::pipeline::{build_timeline, DashboardProcessor};
use epiflux::presentation::DashboardView;
use epiflux::rounds::{CognitiveRound, MotorRound};
use epiflux::schema::{RowAdapter, RowBundle, SCHEMA_VERSION};
use epiflux::storage::{JsonFileStore, PlaySession};
use epiflux::time::parse_timestamp;
use epiflux::types::DashboardSnapshot;
use epiflux::{ComputeError, EPIFLUX_VERSION, PRODUCER_NAME};

/// Epiflux - Seizure, medication and game-biomarker dashboard analytics
#[derive(Parser)]
#[command(name = "epiflux")]
#[command(version = EPIFLUX_VERSION)]
#[command(about = "Compute epilepsy dashboard metrics from backend history rows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a dashboard snapshot from a row bundle
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Client state file; remembers --config for later runs
        #[arg(long)]
        state: Option<PathBuf>,

        /// Reference time for the trailing windows (defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,

        /// Include the presentation shapes (gauges, cards, series)
        #[arg(long)]
        view: bool,
    },

    /// Build the merged timeline only
    Timeline {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Client state file; remembers --config for later runs
        #[arg(long)]
        state: Option<PathBuf>,

        /// Override the configured timeline policy
        #[arg(long)]
        policy: Option<TimelineMode>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Report malformed rows in a row bundle
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll the backend and print one snapshot line per refresh
    #[cfg(feature = "http")]
    Watch {
        /// Base URL of the history endpoints
        #[arg(long)]
        base_url: String,

        /// Pipeline configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Client state file; remembers --config for later runs
        #[arg(long)]
        state: Option<PathBuf>,

        /// Refresh interval in seconds (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many applied refreshes
        #[arg(long)]
        ticks: Option<usize>,
    },

    /// Reduce one game round to session metrics
    Summarize {
        /// Game that produced the round
        #[arg(value_enum)]
        game: GameKind,

        /// Round file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Session id to assign
        #[arg(long, default_value_t = 0)]
        id: i64,

        /// Time the round finished (defaults to now)
        #[arg(long)]
        finished_at: Option<String>,
    },

    /// Start, inspect or reset the play-session timer
    Session {
        /// Client state file
        #[arg(long)]
        state: PathBuf,

        /// Reference time (defaults to now)
        #[arg(long)]
        now: Option<String>,

        #[command(subcommand)]
        action: SessionAction,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum TimelineMode {
    /// One point per game session
    PerSession,
    /// One point per calendar day
    PerDay,
}

impl From<TimelineMode> for TimelinePolicy {
    fn from(mode: TimelineMode) -> Self {
        match mode {
            TimelineMode::PerSession => TimelinePolicy::PerSession,
            TimelineMode::PerDay => TimelinePolicy::PerDay,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum GameKind {
    /// Reaction/inhibition game
    Cognitive,
    /// Voice-controlled platformer
    Motor,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Start the timer, optionally setting the play duration first
    Start {
        /// Play duration in seconds (minimum 60)
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Print the timer state
    Status,
    /// Clear a started session
    Reset,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (epiflux.rows.v1)
    Input,
    /// Output schema (dashboard snapshot)
    Output,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), EpifluxCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            state,
            now,
            format,
            view,
        } => cmd_analyze(
            &input,
            &output,
            resolve_config(config.as_deref(), state.as_deref())?,
            now.as_deref(),
            format,
            view,
        ),

        Commands::Timeline {
            input,
            output,
            config,
            state,
            policy,
            format,
        } => cmd_timeline(
            &input,
            &output,
            resolve_config(config.as_deref(), state.as_deref())?,
            policy,
            format,
        ),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        #[cfg(feature = "http")]
        Commands::Watch {
            base_url,
            config,
            state,
            interval,
            ticks,
        } => watch::cmd_watch(
            &base_url,
            resolve_config(config.as_deref(), state.as_deref())?,
            interval,
            ticks,
        ),

        Commands::Summarize {
            game,
            input,
            output,
            id,
            finished_at,
        } => cmd_summarize(game, &input, &output, id, finished_at.as_deref()),

        Commands::Session { state, now, action } => {
            let report = cmd_session(&state, action, reference_time(now.as_deref())?)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

/// Snapshot, optionally with its presentation shapes
#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    #[serde(flatten)]
    snapshot: &'a DashboardSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    view: Option<DashboardView>,
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    config: PipelineConfig,
    now: Option<&str>,
    format: OutputFormat,
    view: bool,
) -> Result<(), EpifluxCliError> {
    let bundle = read_bundle(input)?;
    let processor = DashboardProcessor::with_config(config)?;
    let now = reference_time(now)?;

    let inputs = RowAdapter::to_inputs(&bundle);
    let snapshot = processor.analyze(&inputs, now);
    let rendered = AnalyzeOutput {
        snapshot: &snapshot,
        view: view.then(|| DashboardView::from_snapshot(&snapshot, processor.config())),
    };

    write_output(output, &format_output(&rendered, &format)?)
}

fn cmd_timeline(
    input: &Path,
    output: &Path,
    mut config: PipelineConfig,
    policy: Option<TimelineMode>,
    format: OutputFormat,
) -> Result<(), EpifluxCliError> {
    let bundle = read_bundle(input)?;
    if let Some(policy) = policy {
        config.timeline = policy.into();
    }
    config.validate()?;

    let timeline = build_timeline(&RowAdapter::to_inputs(&bundle), &config);
    write_output(output, &format_output(&timeline, &format)?)
}

fn cmd_summarize(
    game: GameKind,
    input: &Path,
    output: &Path,
    id: i64,
    finished_at: Option<&str>,
) -> Result<(), EpifluxCliError> {
    let round = read_input(input)?;
    let finished_at = reference_time(finished_at)?;
    let session = summarize_round(&game, &round, id, finished_at)?;
    write_output(output, &serde_json::to_string_pretty(&session)?)
}

fn summarize_round(
    game: &GameKind,
    round: &str,
    id: i64,
    finished_at: DateTime<Utc>,
) -> Result<serde_json::Value, EpifluxCliError> {
    let session = match game {
        GameKind::Cognitive => {
            let round: CognitiveRound = serde_json::from_str(round)?;
            serde_json::to_value(round.summarize(id, finished_at)?)?
        }
        GameKind::Motor => {
            let round: MotorRound = serde_json::from_str(round)?;
            serde_json::to_value(round.summarize(id, finished_at)?)?
        }
    };
    Ok(session)
}

fn cmd_session(
    state: &Path,
    action: SessionAction,
    now: DateTime<Utc>,
) -> Result<SessionReport, EpifluxCliError> {
    let mut session = PlaySession::load(JsonFileStore::new(state))?;

    let started = match action {
        SessionAction::Start { duration } => {
            if let Some(secs) = duration {
                session.set_duration(secs)?;
            }
            Some(session.start(now)?)
        }
        SessionAction::Status => None,
        SessionAction::Reset => {
            session.reset()?;
            None
        }
    };

    Ok(SessionReport {
        duration_secs: session.duration_secs(),
        started_at: session.started_at(),
        active: session.is_active(now),
        remaining_secs: session.remaining(now).map(|left| left.num_seconds()),
        started,
    })
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), EpifluxCliError> {
    let bundle = read_bundle(input)?;
    let results = RowAdapter::validate_bundle(&bundle);

    let skipped: BTreeSet<(&str, usize)> = results
        .iter()
        .filter(|r| r.issue.is_fatal())
        .map(|r| (r.resource, r.index))
        .collect();

    let report = ValidationReport {
        schema_version: SCHEMA_VERSION.to_string(),
        total_rows: bundle.total_rows(),
        usable_rows: bundle.total_rows() - skipped.len(),
        skipped_rows: skipped.len(),
        issues: results
            .iter()
            .map(|r| RowIssueDetail {
                resource: r.resource.to_string(),
                index: r.index,
                row_id: r.row_id,
                fatal: r.issue.is_fatal(),
                issue: r.issue.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Schema:       {}", report.schema_version);
        println!("Total rows:   {}", report.total_rows);
        println!("Usable rows:  {}", report.usable_rows);
        println!("Skipped rows: {}", report.skipped_rows);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                println!(
                    "  - {} row {} (index {}){}: {}",
                    issue.resource,
                    issue.row_id,
                    issue.index,
                    if issue.fatal { " [skipped]" } else { "" },
                    issue.issue
                );
            }
        }
    }

    if report.skipped_rows > 0 {
        Err(EpifluxCliError::ValidationFailed(report.skipped_rows))
    } else {
        Ok(())
    }
}

#[cfg(feature = "http")]
mod watch {
    use super::{CliError, EpifluxCliError};
    use epiflux::config::PipelineConfig;
    use epiflux::http::HttpDataSource;
    use epiflux::pipeline::DashboardProcessor;
    use epiflux::refresh::{DashboardRefresher, RefreshState};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    pub fn cmd_watch(
        base_url: &str,
        config: PipelineConfig,
        interval: Option<u64>,
        ticks: Option<usize>,
    ) -> Result<(), EpifluxCliError> {
        let interval = interval
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.refresh_interval());
        if interval.is_zero() {
            return Err(EpifluxCliError::InvalidArgument(
                "--interval must be at least 1 second".to_string(),
            ));
        }

        let processor = DashboardProcessor::with_config(config)?;
        let source = HttpDataSource::new(base_url)?;
        let refresher = Arc::new(
            DashboardRefresher::new(Arc::new(source), processor).with_interval(interval),
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async move {
            let mut rx = refresher.subscribe();
            let token = CancellationToken::new();
            let handle = refresher.clone().spawn(token.clone());
            let mut applied = 0usize;

            let result = loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break Ok(()),
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break Ok(());
                        }
                        let state = rx.borrow_and_update().clone();
                        match state {
                            RefreshState::Ready(snapshot) => {
                                match serde_json::to_string(snapshot.as_ref()) {
                                    Ok(line) => println!("{}", line),
                                    Err(e) => break Err(EpifluxCliError::Json(e)),
                                }
                                applied += 1;
                                if ticks.is_some_and(|t| applied >= t) {
                                    break Ok(());
                                }
                            }
                            RefreshState::Failed { error, .. } => {
                                let envelope = CliError::from(EpifluxCliError::Fetch(error));
                                if let Ok(line) = serde_json::to_string(&envelope) {
                                    eprintln!("{}", line);
                                }
                            }
                            RefreshState::Idle => {}
                        }
                    }
                }
            };

            token.cancel();
            let _ = handle.await;
            result
        })
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), EpifluxCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "epiflux_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Epiflux version {}", EPIFLUX_VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}", SCHEMA_VERSION),
        },
    ];

    if let Some(path) = config {
        checks.push(check_config(path));
    } else {
        let defaults = PipelineConfig::default();
        checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Using defaults (trend window {} days, {} doses/window, refresh every {}s)",
                defaults.trend_window_days, defaults.weekly_dose_target, defaults.refresh_interval_secs
            ),
        });
    }

    checks.push(if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass bundles with -i <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (-i - ready)".to_string(),
        }
    });

    checks.push(DoctorCheck {
        name: "http".to_string(),
        status: if cfg!(feature = "http") {
            CheckStatus::Ok
        } else {
            CheckStatus::Warning
        },
        message: if cfg!(feature = "http") {
            "REST data source available (watch command enabled)".to_string()
        } else {
            "Built without the http feature; watch is unavailable".to_string()
        },
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: EPIFLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Epiflux Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error)) {
        Err(EpifluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config(path: &Path) -> DoctorCheck {
    let result = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read configuration file: {}", e))
        .and_then(|content| {
            PipelineConfig::from_json(&content)
                .and_then(|config| config.validate().map(|_| config))
                .map_err(|e| format!("Invalid configuration: {}", e))
        });

    match result {
        Ok(config) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Configuration valid ({:?} stability, {:?} timeline)",
                config.stability, config.timeline
            ),
        },
        Err(message) if !path.exists() => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: format!("Configuration file does not exist ({})", message),
        },
        Err(message) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message,
        },
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), EpifluxCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("A JSON object with four optional arrays of backend rows:");
                println!();
                println!("1. seizures (crise_history)");
                println!("   - id, duration (seconds), created_at");
                println!("2. medications (drug_history)");
                println!("   - id, name, created_at");
                println!("3. cognitive_sessions (flash_pop_history)");
                println!("   - id, mrt (ms), inhibition_rate (0-1), iiv_score (ms), created_at");
                println!("4. motor_sessions (noise_game_history)");
                println!("   - id, vocal_initention_latence (ms), motrice_planification (ms), created_at");
                println!();
                println!("Timestamps are ISO-8601 with a space or T separator; naive values are UTC.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", output_json_schema());
            } else {
                println!("Output Schema: dashboard snapshot");
                println!();
                println!("- producer: {{ name, version, instance_id }}");
                println!("- computed_at: reference time of the trailing windows");
                println!("- metrics:");
                println!("  - impact_ratio: seizure-count change vs the previous window (%)");
                println!("  - adherence: {{ count, target, percent }}");
                println!("  - stability: cognitive stability score (0-100)");
                println!("  - stats: {{ reaction/motor means and std-devs, inhibition mean, correlation, total_records }}");
                println!("- timeline: points {{ timestamp, label, source, cognitive_value, motor_value, medication_count, seizure_count }}");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, EpifluxCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_bundle(input: &Path) -> Result<RowBundle, EpifluxCliError> {
    Ok(RowAdapter::parse_bundle(&read_input(input)?)?)
}

fn write_output(output: &Path, data: &str) -> Result<(), EpifluxCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

/// An explicit `--config` wins and is saved to the state file; otherwise the
/// state file's saved configuration, then the defaults
fn resolve_config(
    path: Option<&Path>,
    state: Option<&Path>,
) -> Result<PipelineConfig, EpifluxCliError> {
    match (path, state) {
        (Some(path), state) => {
            let config = PipelineConfig::from_json(&fs::read_to_string(path)?)?;
            if let Some(state) = state {
                config.save(&mut JsonFileStore::new(state))?;
            }
            Ok(config)
        }
        (None, Some(state)) => Ok(PipelineConfig::load(&JsonFileStore::new(state))?),
        (None, None) => Ok(PipelineConfig::default()),
    }
}

fn reference_time(now: Option<&str>) -> Result<DateTime<Utc>, EpifluxCliError> {
    match now {
        Some(raw) => Ok(parse_timestamp(raw)?),
        None => Ok(Utc::now()),
    }
}

fn format_output<T: Serialize + ?Sized>(
    value: &T,
    format: &OutputFormat,
) -> Result<String, EpifluxCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

fn input_json_schema() -> String {
    let row = |required: &[&str], properties: serde_json::Value| {
        serde_json::json!({
            "type": "object",
            "required": required,
            "properties": properties
        })
    };

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Epiflux backend row bundle",
        "type": "object",
        "properties": {
            "seizures": {
                "type": "array",
                "items": row(&["id", "duration", "created_at"], serde_json::json!({
                    "id": { "type": "integer" },
                    "duration": { "type": "number", "minimum": 0 },
                    "created_at": { "type": "string" }
                }))
            },
            "medications": {
                "type": "array",
                "items": row(&["id", "name", "created_at"], serde_json::json!({
                    "id": { "type": "integer" },
                    "name": { "type": "string" },
                    "created_at": { "type": "string" }
                }))
            },
            "cognitive_sessions": {
                "type": "array",
                "items": row(&["id", "mrt", "inhibition_rate", "iiv_score", "created_at"], serde_json::json!({
                    "id": { "type": "integer" },
                    "mrt": { "type": "number", "minimum": 0 },
                    "inhibition_rate": { "type": "number", "minimum": 0, "maximum": 1 },
                    "iiv_score": { "type": "number", "minimum": 0 },
                    "created_at": { "type": "string" }
                }))
            },
            "motor_sessions": {
                "type": "array",
                "items": row(&["id", "vocal_initention_latence", "motrice_planification", "created_at"], serde_json::json!({
                    "id": { "type": "integer" },
                    "vocal_initention_latence": { "type": "number", "minimum": 0 },
                    "motrice_planification": { "type": "number", "minimum": 0 },
                    "created_at": { "type": "string" }
                }))
            }
        }
    })
    .to_string()
}

fn output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "epiflux.snapshot",
        "description": "Epiflux dashboard snapshot",
        "type": "object",
        "required": ["producer", "computed_at", "metrics", "timeline"],
        "properties": {
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "computed_at": { "type": "string", "format": "date-time" },
            "metrics": {
                "type": "object",
                "properties": {
                    "impact_ratio": { "type": "number" },
                    "adherence": {
                        "type": "object",
                        "properties": {
                            "count": { "type": "integer" },
                            "target": { "type": "integer" },
                            "percent": { "type": "number", "minimum": 0, "maximum": 100 }
                        }
                    },
                    "stability": { "type": "integer", "minimum": 0, "maximum": 100 },
                    "stats": { "type": "object" }
                }
            },
            "timeline": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "timestamp": { "type": "string", "format": "date-time" },
                        "label": { "type": "string" },
                        "source": { "enum": ["cognitive", "motor", "medication", "seizure", "day"] },
                        "cognitive_value": { "type": ["number", "null"] },
                        "motor_value": { "type": ["number", "null"] },
                        "medication_count": { "type": "integer" },
                        "seizure_count": { "type": "integer" }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum EpifluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    #[cfg(feature = "http")]
    Fetch(epiflux::FetchError),
    #[cfg(feature = "http")]
    InvalidArgument(String),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for EpifluxCliError {
    fn from(e: io::Error) -> Self {
        EpifluxCliError::Io(e)
    }
}

impl From<ComputeError> for EpifluxCliError {
    fn from(e: ComputeError) -> Self {
        EpifluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for EpifluxCliError {
    fn from(e: serde_json::Error) -> Self {
        EpifluxCliError::Json(e)
    }
}

#[cfg(feature = "http")]
impl From<epiflux::FetchError> for EpifluxCliError {
    fn from(e: epiflux::FetchError) -> Self {
        EpifluxCliError::Fetch(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EpifluxCliError> for CliError {
    fn from(e: EpifluxCliError) -> Self {
        match e {
            EpifluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EpifluxCliError::Compute(e) => {
                let hint = match &e {
                    ComputeError::InvalidConfig(_) => "Run 'epiflux doctor --config <file>' for details",
                    ComputeError::DateParseError(_) => "Use ISO-8601 timestamps, e.g. 2024-06-20 18:00:00",
                    _ => "Ensure input matches the epiflux.rows.v1 schema",
                };
                CliError {
                    code: "COMPUTE_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            EpifluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            #[cfg(feature = "http")]
            EpifluxCliError::Fetch(e) => CliError {
                code: "FETCH_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the base URL and that the backend is reachable".to_string()),
            },
            #[cfg(feature = "http")]
            EpifluxCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: None,
            },
            EpifluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows would be skipped", count),
                hint: Some("Fix the reported rows and retry".to_string()),
            },
            EpifluxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct SessionReport {
    duration_secs: u64,
    started_at: Option<DateTime<Utc>>,
    active: bool,
    remaining_secs: Option<i64>,
    /// Set by `start`: whether this call started the timer
    #[serde(skip_serializing_if = "Option::is_none")]
    started: Option<bool>,
}

#[derive(Serialize)]
struct ValidationReport {
    schema_version: String,
    total_rows: usize,
    usable_rows: usize,
    skipped_rows: usize,
    issues: Vec<RowIssueDetail>,
}

#[derive(Serialize)]
struct RowIssueDetail {
    resource: String,
    index: usize,
    row_id: i64,
    fatal: bool,
    issue: String,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
