use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use futures::{stream::FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::{sync::Semaphore, time};
use tracing::{debug, info, warn};

use crate::{
    config::{ProviderConfig, ProviderId, RaceConfig},
    errors::ConfigError,
    provider::{Fetcher, HttpFetcher},
    types::{ProviderOutcome, Query, RaceResult},
};

#[derive(Debug, Default)]
struct ProviderStats {
    wins: u64,
    total_latency_ms: f64,
    errors: u64,
    timeouts: u64,
}

/// Snapshot of provider performance statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatsSnapshot {
    /// Number of races this provider won.
    pub wins: u64,
    /// Average latency in milliseconds of winning calls.
    pub avg_latency_ms: f64,
    /// Number of calls that failed before the race was decided.
    pub errors: u64,
    /// Number of races that timed out while this provider was still pending.
    pub timeouts: u64,
}

/// A decided race plus the providers seen failing on the way.
struct Settled {
    result: RaceResult,
    failed: Vec<ProviderId>,
}

/// Races `query` across `providers` and returns the first successful answer.
///
/// Every provider is queried at once. The first success wins; failures are
/// recorded while others are still pending. If every provider fails the race
/// ends as [`RaceResult::AllFailed`] without waiting for the deadline, and if
/// nothing succeeds before `deadline` it ends as [`RaceResult::TimedOut`].
///
/// Calls still pending when the race is decided are dropped, which cancels them.
pub async fn race<F>(
    query: &Query,
    providers: &[ProviderConfig],
    deadline: Duration,
    fetcher: &F,
) -> RaceResult
where
    F: Fetcher + ?Sized,
{
    settle(query, providers, deadline, fetcher).await.result
}

async fn settle<F>(
    query: &Query,
    providers: &[ProviderConfig],
    deadline: Duration,
    fetcher: &F,
) -> Settled
where
    F: Fetcher + ?Sized,
{
    let mut failures = Vec::new();
    let mut pending: FuturesUnordered<_> = providers
        .iter()
        .map(|provider| fetcher.fetch(provider, query))
        .collect();

    let expired = time::sleep(deadline);
    tokio::pin!(expired);

    loop {
        tokio::select! {
            // A completion that is ready together with the deadline still counts.
            biased;

            next = pending.next() => match next {
                Some(ProviderOutcome::Success { provider, body }) => {
                    debug!(%provider, bytes = body.len(), "provider succeeded");
                    let failed = failures.into_iter().map(|(id, _)| id).collect();
                    return Settled {
                        result: RaceResult::Won { provider, body },
                        failed,
                    };
                }
                Some(ProviderOutcome::Failure { provider, reason }) => {
                    debug!(%provider, error = %reason, "provider failed");
                    failures.push((provider, reason));
                }
                None => {
                    let failed = failures.iter().map(|(id, _)| id.clone()).collect();
                    return Settled {
                        result: RaceResult::AllFailed { failures },
                        failed,
                    };
                }
            },
            _ = &mut expired => {
                let failed = failures.into_iter().map(|(id, _)| id).collect();
                return Settled {
                    result: RaceResult::TimedOut,
                    failed,
                };
            }
        }
    }
}

/// Races lookups across a fixed set of providers.
///
/// Cloning is cheap; clones share the provider list, the in-flight limit and
/// the statistics.
#[derive(Clone)]
pub struct Racer {
    providers: Arc<Vec<ProviderConfig>>,
    fetcher: Arc<dyn Fetcher>,
    cfg: RaceConfig,
    in_flight: Arc<Semaphore>,
    stats: Arc<Mutex<HashMap<ProviderId, ProviderStats>>>,
}

impl Racer {
    /// Creates a racer querying `providers` over HTTP.
    ///
    /// # Example
    /// ```no_run
    /// use cep_race::{default_providers, Query, RaceConfig, RaceResult, Racer};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let racer = Racer::new(default_providers(), RaceConfig::default())?;
    ///
    /// if let RaceResult::Won { provider, body } = racer.race(&Query::new("01001000")?).await {
    ///     println!("{provider}: {body}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(providers: Vec<ProviderConfig>, cfg: RaceConfig) -> Result<Self, ConfigError> {
        let fetcher = HttpFetcher::new(&cfg)?;
        Self::with_fetcher(providers, cfg, Arc::new(fetcher))
    }

    /// Creates a racer using a custom [`Fetcher`].
    pub fn with_fetcher(
        providers: Vec<ProviderConfig>,
        cfg: RaceConfig,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, ConfigError> {
        if providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        cfg.validate()?;

        let stats_map = providers
            .iter()
            .map(|p| (p.id.clone(), ProviderStats::default()))
            .collect();

        Ok(Self {
            providers: Arc::new(providers),
            fetcher,
            in_flight: Arc::new(Semaphore::new(cfg.max_in_flight)),
            cfg,
            stats: Arc::new(Mutex::new(stats_map)),
        })
    }

    /// Returns the configured providers, in declaration order.
    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Returns the race configuration.
    pub fn config(&self) -> &RaceConfig {
        &self.cfg
    }

    /// Returns a snapshot of accumulated statistics for each provider.
    pub fn provider_stats(&self) -> HashMap<ProviderId, ProviderStatsSnapshot> {
        let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);

        stats
            .iter()
            .map(|(id, s)| {
                let avg = if s.wins > 0 {
                    s.total_latency_ms / (s.wins as f64)
                } else {
                    0.0
                };

                (
                    id.clone(),
                    ProviderStatsSnapshot {
                        wins: s.wins,
                        avg_latency_ms: avg,
                        errors: s.errors,
                        timeouts: s.timeouts,
                    },
                )
            })
            .collect()
    }

    /// Races `query` across every configured provider.
    ///
    /// Waiting for a free in-flight slot counts against the deadline. A race
    /// that never gets a slot calls no provider and leaves the statistics alone.
    #[tracing::instrument(name = "race", skip_all, fields(query = %query))]
    pub async fn race(&self, query: &Query) -> RaceResult {
        let start = time::Instant::now();
        let deadline_at = start + self.cfg.deadline;

        let _permit = match time::timeout_at(deadline_at, self.in_flight.acquire()).await {
            Ok(permit) => permit.ok(),
            Err(_) => {
                warn!(
                    max_in_flight = self.cfg.max_in_flight,
                    "no free in-flight slot before the deadline"
                );
                return RaceResult::TimedOut;
            }
        };

        let remaining = deadline_at.saturating_duration_since(time::Instant::now());
        let settled = settle(query, &self.providers, remaining, self.fetcher.as_ref()).await;
        let elapsed = start.elapsed();

        match &settled.result {
            RaceResult::Won { provider, .. } => {
                info!(%provider, elapsed_ms = elapsed.as_millis() as u64, "race won");
            }
            RaceResult::TimedOut => {
                warn!(deadline_ms = self.cfg.deadline.as_millis() as u64, "race timed out");
            }
            RaceResult::AllFailed { failures } => {
                warn!(failed = failures.len(), "all providers failed");
            }
        }

        self.record(&settled, elapsed);
        settled.result
    }

    fn record(&self, settled: &Settled, elapsed: Duration) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);

        for id in &settled.failed {
            if let Some(entry) = stats.get_mut(id) {
                entry.errors += 1;
            }
        }

        match &settled.result {
            RaceResult::Won { provider, .. } => {
                if let Some(entry) = stats.get_mut(provider) {
                    entry.wins += 1;
                    entry.total_latency_ms += elapsed.as_secs_f64() * 1000.0;
                }
            }
            RaceResult::TimedOut => {
                for (id, entry) in stats.iter_mut() {
                    if !settled.failed.contains(id) {
                        entry.timeouts += 1;
                    }
                }
            }
            RaceResult::AllFailed { .. } => {}
        }
    }
}
