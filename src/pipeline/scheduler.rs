//! Timer-driven polling loop.
//!
//! One task owns the timer, the dispatcher and the poll state. A tick runs a
//! full cycle to completion before the timer is polled again, so cycles never
//! overlap, and re-arming replaces the only timer there is.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::pipeline::dispatch::{HandlerEffect, StatusDispatcher};
use crate::pipeline::state::PollState;

/// Timer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Armed(Duration),
    Stopped,
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Cycles dispatched
    pub cycles: u64,
    /// Timer re-arms after the initial start
    pub restarts: u64,
    /// Responses dropped because shutdown began while they were in flight
    pub discarded: u64,
    pub final_interval: Duration,
}

/// Fires a dispatcher cycle at the pulse controller's interval.
pub struct Scheduler {
    dispatcher: StatusDispatcher,
    state: PollState,
    cancel: CancellationToken,
    ticker: Option<Interval>,
    timer: TimerState,
    summary: PollSummary,
}

impl Scheduler {
    pub fn new(dispatcher: StatusDispatcher, state: PollState, cancel: CancellationToken) -> Self {
        Self {
            dispatcher,
            state,
            cancel,
            ticker: None,
            timer: TimerState::Idle,
            summary: PollSummary::default(),
        }
    }

    pub fn timer(&self) -> TimerState {
        self.timer
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Arm the timer at the current interval. Only valid from `Idle`.
    pub fn start(&mut self) {
        if self.timer == TimerState::Idle {
            self.arm();
        }
    }

    /// Replace the pending timer with one at the current interval.
    pub fn restart(&mut self) {
        if matches!(self.timer, TimerState::Armed(_)) {
            self.arm();
            self.summary.restarts += 1;
        }
    }

    /// Drop the timer for good.
    pub fn stop(&mut self) {
        self.ticker = None;
        self.timer = TimerState::Stopped;
    }

    fn arm(&mut self) {
        let period = self.state.pulse.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Assigning drops the previous timer in the same step.
        self.ticker = Some(ticker);
        self.timer = TimerState::Armed(period);
        log::debug!("Timer armed at {}ms", period.as_millis());
    }

    /// Poll until the cancellation token fires.
    pub async fn run(&mut self) -> PollSummary {
        self.start();

        while let Some(ticker) = self.ticker.as_mut() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let response = self.dispatcher.fetch().await;
            if self.cancel.is_cancelled() {
                log::info!("Shutdown in progress, discarding in-flight response");
                self.summary.discarded += 1;
                break;
            }

            let report = self.dispatcher.dispatch(&mut self.state, response).await;
            self.summary.cycles += 1;

            let interval = self.state.pulse.interval();
            if report.effect == HandlerEffect::Reschedule
                || self.timer != TimerState::Armed(interval)
            {
                log::info!("Restarting timer at {}ms", interval.as_millis());
                self.restart();
            }
        }

        self.stop();
        self.summary.final_interval = self.state.pulse.interval();
        log::info!(
            "Polling stopped after {} cycles ({} restarts)",
            self.summary.cycles,
            self.summary.restarts
        );
        self.summary.clone()
    }
}
