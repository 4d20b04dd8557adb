use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use mapfeed::{run_replay, ReplayOptions};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    let (options, json_output) = match parse_args() {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    match run_replay(&options) {
        Ok(summary) => {
            if json_output {
                println!("{}", summary.render_json());
            } else {
                println!("{}", summary.render_human_readable());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "replay_failed");
            ExitCode::from(1)
        }
    }
}

fn parse_args() -> Result<Option<(ReplayOptions, bool)>, String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        println!("{}", usage_text());
        return Ok(None);
    }

    let mut feed_path: Option<PathBuf> = None;
    let mut drain_chunk: Option<usize> = None;
    let mut quiet = false;
    let mut json_output = false;
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--drain" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --drain".to_string())?;
                let chunk = value
                    .parse::<usize>()
                    .ok()
                    .filter(|chunk| *chunk > 0)
                    .ok_or_else(|| {
                        format!("invalid --drain value '{value}' (expected positive integer)")
                    })?;
                drain_chunk = Some(chunk);
                index += 2;
            }
            "--quiet" => {
                quiet = true;
                index += 1;
            }
            "--json" => {
                json_output = true;
                index += 1;
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option '{other}'\n{}", usage_text()));
            }
            other => {
                if feed_path.is_some() {
                    return Err(format!("unexpected extra argument '{other}'"));
                }
                feed_path = Some(PathBuf::from(other));
                index += 1;
            }
        }
    }

    let feed_path = feed_path.ok_or_else(usage_text)?;
    let mut options = ReplayOptions::new(feed_path);
    if let Some(chunk) = drain_chunk {
        options.drain_chunk = chunk;
    }
    options.quiet = quiet;
    Ok(Some((options, json_output)))
}

fn usage_text() -> String {
    "usage: mapfeed <feed.json> [--drain N] [--quiet] [--json]\n\
Replays a recorded feed of update envelopes through the world model and\n\
reports drop counters and apply totals."
        .to_string()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
