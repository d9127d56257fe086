//! CEP lookup service.
//!
//! Serves `GET /?cep=<query>`, racing the configured providers per request.

use std::{net::SocketAddr, time::Duration};

use anyhow::Result;
use cep_race::{env::settings_from_env, logging::init_logging, server};
use clap::Parser;
use tracing::info;

/// HTTP service answering CEP lookups with the fastest provider.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on (overrides CEP_RACE_ADDR).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Race deadline in milliseconds (overrides CEP_RACE_DEADLINE_MS).
    #[arg(long)]
    deadline_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging("cep_race=info");

    let mut settings = settings_from_env()?;
    if let Some(addr) = cli.addr {
        settings.addr = addr;
    }
    if let Some(ms) = cli.deadline_ms {
        settings.race.deadline = Duration::from_millis(ms);
    }

    let providers: Vec<&str> = settings.providers.iter().map(|p| p.id.as_str()).collect();
    info!(
        ?providers,
        deadline_ms = settings.race.deadline.as_millis() as u64,
        max_in_flight = settings.race.max_in_flight,
        "cep-race server starting"
    );

    server::serve(settings).await
}
