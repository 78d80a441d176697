use anyhow::Context;
use journey::config;
use journey::core::JourneyCore;
use journey::fixture::FixtureSource;
use journey::model::{LookupFailurePolicy, MAX_PAGE_LIMIT};
use journey::pipeline::{self, PipelineOptions};
use journey::spotify::{ListeningSource, SpotifyClient};
use journey::stats::ReportQuery;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum OutputMode {
    #[default]
    Interactive,
    Text,
    Json,
}

#[derive(Debug, Default)]
struct CliArgs {
    lookback_hours: Option<u32>,
    limit: Option<u8>,
    policy: Option<LookupFailurePolicy>,
    fixture: Option<PathBuf>,
    output: OutputMode,
}

fn main() -> anyhow::Result<()> {
    // Read before the HTTP client spawns its runtime thread.
    let local_offset = config::local_offset();
    let args = parse_args(std::env::args().skip(1).collect())?;
    init_logging(args.output == OutputMode::Interactive)?;

    let mut settings = config::load_settings()?;
    if let Some(hours) = args.lookback_hours {
        settings.lookback_hours = hours;
    }
    if let Some(limit) = args.limit {
        settings.page_limit = limit;
    }
    if let Some(policy) = args.policy {
        settings.lookup_failure = policy;
    }

    let source: Box<dyn ListeningSource> = match &args.fixture {
        Some(path) => Box::new(FixtureSource::load(path)?),
        None => {
            let session = config::load_session()?;
            Box::new(SpotifyClient::new(session)?)
        }
    };

    match args.output {
        OutputMode::Interactive => {
            journey::app::run(source.as_ref(), JourneyCore::new(settings, local_offset))
        }
        OutputMode::Text | OutputMode::Json => {
            let options = PipelineOptions::from_settings(&settings, local_offset);
            let report = pipeline::run(source.as_ref(), &options, OffsetDateTime::now_utc())?;
            if args.output == OutputMode::Json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!(
                    "{}",
                    journey::report::render_text(&report, &ReportQuery::default(), local_offset)
                );
            }
            Ok(())
        }
    }
}

/// Interactive mode logs to a file so the terminal UI stays intact.
fn init_logging(to_file: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("JOURNEY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    if to_file {
        config::ensure_config_dir()?;
        let path = config::log_path()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--lookback-hours" => {
                let value = required_value(&args, &mut index, "--lookback-hours")?;
                let hours: u32 = value
                    .parse()
                    .with_context(|| format!("invalid --lookback-hours value {value}"))?;
                if hours == 0 {
                    anyhow::bail!("--lookback-hours must be at least 1");
                }
                out.lookback_hours = Some(hours);
            }
            "--limit" => {
                let value = required_value(&args, &mut index, "--limit")?;
                let limit: u8 = value
                    .parse()
                    .with_context(|| format!("invalid --limit value {value}"))?;
                if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
                    anyhow::bail!("--limit must be between 1 and {MAX_PAGE_LIMIT}");
                }
                out.limit = Some(limit);
            }
            "--policy" => {
                let value = required_value(&args, &mut index, "--policy")?;
                let Some(policy) = LookupFailurePolicy::parse(value) else {
                    anyhow::bail!("--policy must be fallback, skip or abort");
                };
                out.policy = Some(policy);
            }
            "--fixture" => {
                let value = required_value(&args, &mut index, "--fixture")?;
                out.fixture = Some(PathBuf::from(value));
            }
            "--print" => out.output = OutputMode::Text,
            "--json" => out.output = OutputMode::Json,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn required_value<'a>(
    args: &'a [String],
    index: &mut usize,
    flag: &str,
) -> anyhow::Result<&'a str> {
    *index += 1;
    let Some(value) = args.get(*index) else {
        anyhow::bail!("{flag} requires a value");
    };
    if value.trim().is_empty() {
        anyhow::bail!("{flag} cannot be empty");
    }
    Ok(value.trim())
}

fn print_help() {
    println!("Journey - recently played tracks by genre and hour");
    println!("  --lookback-hours N   Trailing window to keep (default 72)");
    println!("  --limit N            Page size, 1-{MAX_PAGE_LIMIT} (default {MAX_PAGE_LIMIT})");
    println!("  --policy P           Genre lookup failure: fallback, skip or abort");
    println!("  --fixture PATH       Read history from a JSON capture instead of Spotify");
    println!("  --print              Print tables instead of opening the terminal UI");
    println!("  --json               Print the report as JSON");
    println!();
    println!("  SPOTIFY_ACCESS_TOKEN must be set (environment or ./.env) unless --fixture is used.");
}
