//! One-shot CEP lookup from the command line.
//!
//! Races every configured provider for the given postal code and prints the
//! first answer together with the provider that sent it. Exits with status 1
//! when the argument is missing, the race times out, or every provider fails.

use std::{process::ExitCode, time::Duration};

use cep_race::{env::settings_from_env, logging::init_logging, Query, RaceResult, Racer};
use clap::Parser;
use color_eyre::Result;
use serde_json::json;

/// Look up a Brazilian postal code (CEP) using whichever provider answers first.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Postal code to look up, e.g. 01001000.
    cep: String,

    /// Race deadline in milliseconds (overrides CEP_RACE_DEADLINE_MS).
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Print the outcome as a JSON object.
    #[arg(long)]
    json: bool,
}

/// What to print and where, plus the process exit status.
#[derive(Debug, PartialEq, Eq)]
struct Rendered {
    stdout: Option<String>,
    stderr: Option<String>,
    success: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return Ok(code);
        }
    };

    init_logging("cep_race=warn");

    let query = match Query::new(&cli.cep) {
        Ok(query) => query,
        Err(e) => {
            eprintln!("error: {e}\n\nUsage: cep-race <CEP>");
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut settings = settings_from_env()?;
    if let Some(ms) = cli.deadline_ms {
        settings.race.deadline = Duration::from_millis(ms);
    }
    let racer = Racer::new(settings.providers, settings.race)?;

    let result = racer.race(&query).await;
    let rendered = render(&racer, &query, &result, cli.json);

    if let Some(out) = rendered.stdout {
        println!("{out}");
    }
    if let Some(err) = rendered.stderr {
        eprintln!("{err}");
    }

    Ok(if rendered.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn render(racer: &Racer, query: &Query, result: &RaceResult, as_json: bool) -> Rendered {
    let deadline_ms = racer.config().deadline.as_millis() as u64;

    if as_json {
        let value = match result {
            RaceResult::Won { provider, body } => json!({
                "outcome": result.tag(),
                "provider": provider,
                "url": winner_url(racer, query, result),
                "body": body,
            }),
            RaceResult::TimedOut => json!({
                "outcome": result.tag(),
                "deadline_ms": deadline_ms,
            }),
            RaceResult::AllFailed { failures } => json!({
                "outcome": result.tag(),
                "failures": failures
                    .iter()
                    .map(|(provider, reason)| {
                        json!({ "provider": provider, "reason": reason.to_string() })
                    })
                    .collect::<Vec<_>>(),
            }),
        };
        return Rendered {
            stdout: Some(value.to_string()),
            stderr: None,
            success: matches!(result, RaceResult::Won { .. }),
        };
    }

    match result {
        RaceResult::Won { provider, body } => {
            let url = winner_url(racer, query, result).unwrap_or_default();
            Rendered {
                stdout: Some(format!("provider: {provider}\nurl: {url}\n\n{body}")),
                stderr: None,
                success: true,
            }
        }
        RaceResult::TimedOut => Rendered {
            stdout: None,
            stderr: Some(format!("timeout: no provider answered within {deadline_ms}ms")),
            success: false,
        },
        RaceResult::AllFailed { failures } => {
            let mut text = String::from("error: all providers failed");
            for (provider, reason) in failures {
                text.push_str(&format!("\n  {provider}: {reason}"));
            }
            Rendered {
                stdout: None,
                stderr: Some(text),
                success: false,
            }
        }
    }
}

fn winner_url(racer: &Racer, query: &Query, result: &RaceResult) -> Option<String> {
    let winner = result.winner()?;
    racer
        .providers()
        .iter()
        .find(|p| &p.id == winner)
        .map(|p| p.url_for(query))
}
