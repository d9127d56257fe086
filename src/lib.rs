//! Postal-code lookups that race redundant HTTP providers.
//!
//! Every configured provider is queried at once; the first successful answer
//! wins and the slower calls are abandoned. A hard deadline bounds the wait.
//!
//! # Quick Start
//!
//! ```no_run
//! use cep_race::{ProviderConfig, Query, RaceConfig, RaceResult, Racer};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let providers = vec![
//!     ProviderConfig::new("brasilapi", "https://brasilapi.com.br/api/cep/v1/{query}")?,
//!     ProviderConfig::new("viacep", "https://viacep.com.br/ws/{query}/json/")?,
//! ];
//!
//! let config = RaceConfig::default().with_deadline(Duration::from_secs(1));
//! let racer = Racer::new(providers, config)?;
//!
//! match racer.race(&Query::new("01001000")?).await {
//!     RaceResult::Won { provider, body } => println!("{provider} answered first: {body}"),
//!     RaceResult::TimedOut => eprintln!("no answer within the deadline"),
//!     RaceResult::AllFailed { failures } => eprintln!("{} providers failed", failures.len()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Race Outcome
//!
//! 1. The first provider to deliver a response body wins
//! 2. A failing provider only ends the race once every provider has failed
//! 3. If nothing succeeds before the deadline the race times out
//!
//! # Preset Configurations
//!
//! Use `RaceConfig::default()`, `::strict()`, or `::relaxed()`, or build a
//! custom configuration.

pub mod client;
pub mod config;
pub mod env;
pub mod errors;
pub mod logging;
pub mod provider;
pub mod server;
pub mod types;

pub use client::{race, ProviderStatsSnapshot, Racer};
pub use config::{default_providers, ProviderConfig, ProviderId, RaceConfig};
pub use errors::{ConfigError, FetchError, QueryError};
pub use provider::{Fetcher, HttpFetcher};
pub use types::{ProviderOutcome, Query, RaceResult};
