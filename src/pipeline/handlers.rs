//! Status handlers and cycle hooks for ticker polling.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Ticker;
use crate::pipeline::clock::{Clock, TimePoint};
use crate::pipeline::dispatch::{
    CycleContext, HandlerEffect, StatusDispatcher, StatusHandler, StatusRoute,
};
use crate::pipeline::state::PollState;
use crate::services::{TickerResponse, TickerSource};
use crate::storage::{DayArchiver, SampleStorage};

/// Longest body excerpt included in log lines.
const LOG_EXCERPT_LEN: usize = 200;

/// Format a sample line: `{timestamp} {body}`, newline terminated.
///
/// Multi-line bodies are joined with single spaces so each sample stays one line.
pub fn format_sample(time: &TimePoint, body: &str) -> String {
    let flat = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {}\n", time.display(), flat)
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(LOG_EXCERPT_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// 200: archive the ended day on rollover, then persist the sample.
///
/// Timestamps come from the reading the pre-cycle hook stored in
/// `PollState::current_time`; without one the sample is refused.
pub struct SampleHandler {
    storage: Arc<dyn SampleStorage>,
    archiver: Arc<dyn DayArchiver>,
}

impl SampleHandler {
    pub fn new(storage: Arc<dyn SampleStorage>, archiver: Arc<dyn DayArchiver>) -> Self {
        Self { storage, archiver }
    }
}

#[async_trait]
impl StatusHandler for SampleHandler {
    async fn handle(
        &self,
        state: &mut PollState,
        ctx: &CycleContext,
        body: &str,
    ) -> Result<HandlerEffect> {
        let now = state
            .current_time
            .ok_or_else(|| AppError::validation("no clock reading for this cycle"))?;

        if let Some(ended) = state.rollover.check(&now, ctx.previous_time.as_ref()) {
            log::info!("Day {} ended, archiving", ended);
            if let Err(e) = self.archiver.archive(&ended).await {
                log::error!("Failed to archive {}: {}", ended, e);
            }
        }

        match Ticker::from_body(body) {
            Ok(ticker) => log::debug!(
                "last={} bid={} ask={}",
                ticker.last.as_deref().unwrap_or("-"),
                ticker.bid.as_deref().unwrap_or("-"),
                ticker.ask.as_deref().unwrap_or("-")
            ),
            Err(e) => log::warn!("Ticker body is not valid JSON ({}), storing raw", e),
        }

        self.storage
            .append_line(&now.day_key(), &format_sample(&now, body))
            .await?;
        Ok(HandlerEffect::Continue)
    }
}

/// 429: ask for a restart with the backed-off interval, once per streak.
#[derive(Debug, Default)]
pub struct ThrottleHandler;

#[async_trait]
impl StatusHandler for ThrottleHandler {
    async fn handle(
        &self,
        state: &mut PollState,
        ctx: &CycleContext,
        _body: &str,
    ) -> Result<HandlerEffect> {
        if ctx.is_repeat(StatusRoute::TooManyRequests) {
            return Ok(HandlerEffect::Continue);
        }
        log::debug!(
            "status code is 429 with {}ms",
            state.pulse.interval().as_millis()
        );
        Ok(HandlerEffect::Reschedule)
    }
}

/// 403: report once per streak; polling carries on.
#[derive(Debug, Default)]
pub struct ForbiddenHandler;

#[async_trait]
impl StatusHandler for ForbiddenHandler {
    async fn handle(
        &self,
        _state: &mut PollState,
        ctx: &CycleContext,
        body: &str,
    ) -> Result<HandlerEffect> {
        if !ctx.is_repeat(StatusRoute::Forbidden) {
            log::error!("403 Forbidden from ticker endpoint: {}", excerpt(body));
        }
        Ok(HandlerEffect::Continue)
    }
}

/// Pre-cycle hook: feed the pulse controller and take the cycle's reading
/// from `clock`.
pub fn observe_cycle(
    clock: Arc<dyn Clock>,
) -> impl Fn(&mut PollState, &CycleContext, &TickerResponse) + Send + Sync + 'static {
    move |state: &mut PollState, _ctx: &CycleContext, response: &TickerResponse| {
        if state.pulse.update(response.status()) {
            log::info!(
                "Polling interval now {}ms",
                state.pulse.interval().as_millis()
            );
        }
        state.current_time = Some(clock.now());
    }
}

/// Post-cycle hook: remember this cycle for the next one's comparisons.
pub fn remember_cycle(state: &mut PollState, _ctx: &CycleContext, response: &TickerResponse) {
    state.previous_time = state.current_time;
    state.previous_status = response.status();
}

/// Wire the standard hooks and handlers.
pub fn build_dispatcher(
    source: Arc<dyn TickerSource>,
    clock: Arc<dyn Clock>,
    storage: Arc<dyn SampleStorage>,
    archiver: Arc<dyn DayArchiver>,
) -> StatusDispatcher {
    let mut dispatcher = StatusDispatcher::new(source);
    dispatcher
        .before_all(observe_cycle(clock))
        .after_all(remember_cycle)
        .bind(StatusRoute::Ok, SampleHandler::new(storage, archiver))
        .bind(StatusRoute::TooManyRequests, ThrottleHandler)
        .bind(StatusRoute::Forbidden, ForbiddenHandler);
    dispatcher
}
