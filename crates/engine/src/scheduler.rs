//! Background update scheduling.
//!
//! [`UpdateScheduler::run`] polls on a fixed interval: list the enabled
//! characters, run one pass per character with bounded concurrency and
//! log a tick summary. The first tick fires immediately, so a freshly
//! started worker begins updating without waiting out the interval.

use std::sync::Arc;

use pilotwatch_db::repositories::character_repo::CharacterRepo;
use sqlx::PgPool;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::orchestrator::CharacterUpdater;

/// Outcome of one character pass, reduced for the tick summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassResult {
    /// At least one section ran.
    Dispatched,
    /// Everything was fresh.
    Idle,
    /// The pass itself failed or its task aborted.
    Failed,
}

/// Counters for one scheduler tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct TickSummary {
    characters: usize,
    dispatched: usize,
    errors: usize,
}

/// Periodically refreshes every enabled character.
pub struct UpdateScheduler {
    pool: PgPool,
    updater: Arc<CharacterUpdater>,
    poll_interval: std::time::Duration,
    max_concurrent: usize,
}

impl UpdateScheduler {
    pub fn new(pool: PgPool, updater: Arc<CharacterUpdater>, config: &EngineConfig) -> Self {
        Self {
            pool,
            updater,
            poll_interval: config.poll_interval,
            max_concurrent: config.max_concurrent_characters.max(1),
        }
    }

    /// Poll until cancelled. Cancellation is observed between passes
    /// and between ticks, never mid-section.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = cancel.cancelled() => {
                    tracing::info!("Update scheduler stopping");
                    return;
                }
            }
        }
    }

    /// One scheduling pass over the enabled characters.
    async fn tick(&self) {
        let characters = match CharacterRepo::list_enabled(&self.pool).await {
            Ok(characters) => characters,
            Err(err) => {
                tracing::error!(error = %err, "Failed to list characters, skipping tick");
                return;
            }
        };
        if characters.is_empty() {
            tracing::debug!("No enabled characters");
            return;
        }

        let mut tasks: JoinSet<PassResult> = JoinSet::new();
        let mut results = Vec::with_capacity(characters.len());
        for character in characters {
            while tasks.len() >= self.max_concurrent {
                if let Some(joined) = tasks.join_next().await {
                    results.push(reduce(joined));
                }
            }
            let updater = Arc::clone(&self.updater);
            tasks.spawn(async move {
                match updater.update_character(character.id, false).await {
                    Ok(true) => PassResult::Dispatched,
                    Ok(false) => PassResult::Idle,
                    Err(err) => {
                        tracing::error!(
                            character_id = character.character_id,
                            character_name = %character.character_name,
                            error = %err,
                            "Character pass failed"
                        );
                        PassResult::Failed
                    }
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            results.push(reduce(joined));
        }

        let summary = summarize(&results);
        if summary.dispatched > 0 || summary.errors > 0 {
            tracing::info!(
                characters = summary.characters,
                dispatched = summary.dispatched,
                errors = summary.errors,
                "Scheduler tick finished"
            );
        }
    }
}

fn reduce(joined: Result<PassResult, tokio::task::JoinError>) -> PassResult {
    match joined {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "Character pass task aborted");
            PassResult::Failed
        }
    }
}

fn summarize(results: &[PassResult]) -> TickSummary {
    let mut summary = TickSummary {
        characters: results.len(),
        ..TickSummary::default()
    };
    for result in results {
        match result {
            PassResult::Dispatched => summary.dispatched += 1,
            PassResult::Idle => {}
            PassResult::Failed => summary.errors += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_splits_results_by_class() {
        let results = [
            PassResult::Dispatched,
            PassResult::Idle,
            PassResult::Failed,
            PassResult::Dispatched,
            PassResult::Idle,
        ];
        assert_eq!(
            summarize(&results),
            TickSummary {
                characters: 5,
                dispatched: 2,
                errors: 1,
            }
        );
    }

    #[test]
    fn empty_tick_summarizes_to_zeroes() {
        assert_eq!(summarize(&[]), TickSummary::default());
    }
}
