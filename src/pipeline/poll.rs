// src/pipeline/poll.rs

//! Ticker polling pipeline.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, CurrencyPair};
use crate::pipeline::clock::SystemClock;
use crate::pipeline::handlers::build_dispatcher;
use crate::pipeline::pulse::PulseController;
use crate::pipeline::scheduler::{PollSummary, Scheduler};
use crate::pipeline::state::PollState;
use crate::services::HttpTickerSource;
use crate::storage::LocalStorage;

/// Poll the ticker of `pair` until `cancel` fires.
///
/// Samples go to `{data_root}/{pair}/`.
pub async fn run_poller(
    config: &Config,
    pair: &CurrencyPair,
    data_root: &Path,
    cancel: CancellationToken,
) -> Result<PollSummary> {
    let source = HttpTickerSource::from_config(&config.endpoint, pair)?;
    let storage = Arc::new(LocalStorage::new(data_root.join(pair.as_str())));
    let pulse = PulseController::new(&config.pulse, config.pairs.len());

    log::info!("Polling {}", source.url());
    log::info!(
        "Baseline interval {}ms ({} pairs sharing {} requests/min)",
        pulse.baseline().as_millis(),
        config.pairs.len(),
        config.pulse.per_minute_quota
    );
    log::info!("Writing samples to {}", storage.root_dir().display());

    let dispatcher = build_dispatcher(
        Arc::new(source),
        Arc::new(SystemClock),
        storage.clone(),
        storage,
    );
    let mut scheduler = Scheduler::new(dispatcher, PollState::new(pulse), cancel);
    let summary = scheduler.run().await;

    log::info!(
        "Final interval {}ms, {} responses discarded at shutdown",
        summary.final_interval.as_millis(),
        summary.discarded
    );
    Ok(summary)
}
