//! Process-lifetime polling state.

use crate::pipeline::clock::TimePoint;
use crate::pipeline::pulse::PulseController;
use crate::pipeline::rollover::ArchivalTrigger;

/// Everything that survives from one cycle to the next.
///
/// Owned by the scheduling loop and lent to the dispatcher one cycle at a
/// time, so only one cycle ever mutates it.
#[derive(Debug, Clone)]
pub struct PollState {
    pub pulse: PulseController,
    /// Reading taken for the cycle in progress (or the last one)
    pub current_time: Option<TimePoint>,
    /// Reading of the previous completed cycle
    pub previous_time: Option<TimePoint>,
    /// Status of the previous completed cycle; `None` before the first cycle
    /// and after a transport fault
    pub previous_status: Option<u16>,
    pub rollover: ArchivalTrigger,
}

impl PollState {
    pub fn new(pulse: PulseController) -> Self {
        Self {
            pulse,
            current_time: None,
            previous_time: None,
            previous_status: None,
            rollover: ArchivalTrigger::new(),
        }
    }
}
