//! Adaptive polling core and pipeline entry points.
//!
//! - `run_poller`: poll one pair's ticker until shutdown
//! - `run_archive`: compress one day of samples on demand

pub mod archive;
pub mod clock;
pub mod dispatch;
pub mod handlers;
pub mod poll;
pub mod pulse;
pub mod rollover;
pub mod scheduler;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use archive::run_archive;
pub use clock::{Clock, DayKey, SystemClock, TimePoint};
pub use dispatch::{
    CycleContext, CycleReport, Dispatch, HandlerEffect, StatusDispatcher, StatusHandler,
    StatusRoute,
};
pub use handlers::build_dispatcher;
pub use poll::run_poller;
pub use pulse::PulseController;
pub use rollover::ArchivalTrigger;
pub use scheduler::{PollSummary, Scheduler, TimerState};
pub use state::PollState;
