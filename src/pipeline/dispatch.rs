//! Per-status routing of ticker responses.
//!
//! Every cycle runs the same sequence, each step finishing before the next:
//!
//! 1. the pre-cycle hook (feeds the pulse controller, takes the cycle's clock reading)
//! 2. the handler bound to the response's status, if any
//! 3. the post-cycle hook (snapshots the cycle for the next one)
//!
//! Only the three status codes the exchange uses meaningfully can be bound.
//! Any other code, or a transport fault, runs the hooks and nothing else.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::clock::TimePoint;
use crate::pipeline::state::PollState;
use crate::services::{TickerResponse, TickerSource};

/// Status codes that can carry a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusRoute {
    /// 200
    Ok,
    /// 403
    Forbidden,
    /// 429
    TooManyRequests,
}

impl StatusRoute {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(Self::Ok),
            403 => Some(Self::Forbidden),
            429 => Some(Self::TooManyRequests),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Forbidden => 403,
            Self::TooManyRequests => 429,
        }
    }
}

impl fmt::Display for StatusRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Ok => "OK",
            Self::Forbidden => "Forbidden",
            Self::TooManyRequests => "Too Many Requests",
        };
        write!(f, "{} {}", self.code(), reason)
    }
}

/// Snapshot of the previous cycle, taken before any hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleContext {
    pub previous_time: Option<TimePoint>,
    pub previous_status: Option<u16>,
}

impl CycleContext {
    /// Whether the previous cycle ended with the same status as `route`.
    pub fn is_repeat(&self, route: StatusRoute) -> bool {
        self.previous_status == Some(route.code())
    }
}

/// What a handler asks of the scheduling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerEffect {
    #[default]
    Continue,
    /// Re-arm the timer with the current interval.
    Reschedule,
}

/// How a response was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled(StatusRoute),
    /// A status with no bound handler; ignored.
    Unhandled(u16),
    /// Transport fault; no status code.
    NoResponse,
}

/// Summary of one dispatched cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub status: Option<u16>,
    pub dispatch: Dispatch,
    pub effect: HandlerEffect,
}

/// Response handler for one status route.
#[async_trait]
pub trait StatusHandler: Send + Sync {
    async fn handle(
        &self,
        state: &mut PollState,
        ctx: &CycleContext,
        body: &str,
    ) -> Result<HandlerEffect>;
}

/// Hook run around every cycle.
pub type CycleHook = Box<dyn Fn(&mut PollState, &CycleContext, &TickerResponse) + Send + Sync>;

/// Routes each ticker response to the handler bound for its status.
pub struct StatusDispatcher {
    source: Arc<dyn TickerSource>,
    handlers: HashMap<StatusRoute, Box<dyn StatusHandler>>,
    before_all: Option<CycleHook>,
    after_all: Option<CycleHook>,
}

impl StatusDispatcher {
    pub fn new(source: Arc<dyn TickerSource>) -> Self {
        Self {
            source,
            handlers: HashMap::new(),
            before_all: None,
            after_all: None,
        }
    }

    /// Bind `handler` to `route`, replacing any earlier binding.
    pub fn bind(&mut self, route: StatusRoute, handler: impl StatusHandler + 'static) -> &mut Self {
        if self.handlers.insert(route, Box::new(handler)).is_some() {
            log::debug!("Handler for {} replaced", route);
        }
        self
    }

    /// Set the hook run before every handler, replacing any earlier one.
    pub fn before_all(
        &mut self,
        hook: impl Fn(&mut PollState, &CycleContext, &TickerResponse) + Send + Sync + 'static,
    ) -> &mut Self {
        self.before_all = Some(Box::new(hook));
        self
    }

    /// Set the hook run after every handler, replacing any earlier one.
    pub fn after_all(
        &mut self,
        hook: impl Fn(&mut PollState, &CycleContext, &TickerResponse) + Send + Sync + 'static,
    ) -> &mut Self {
        self.after_all = Some(Box::new(hook));
        self
    }

    /// Issue one request.
    pub async fn fetch(&self) -> TickerResponse {
        self.source.fetch().await
    }

    /// Issue one request and dispatch its response.
    pub async fn send(&self, state: &mut PollState) -> CycleReport {
        let response = self.fetch().await;
        self.dispatch(state, response).await
    }

    /// Run one cycle for an already received response.
    ///
    /// Handler failures are logged and absorbed; the cycle always completes.
    pub async fn dispatch(&self, state: &mut PollState, response: TickerResponse) -> CycleReport {
        let ctx = CycleContext {
            previous_time: state.previous_time,
            previous_status: state.previous_status,
        };

        if let Some(hook) = &self.before_all {
            hook(state, &ctx, &response);
        }

        let (dispatch, effect) = match &response {
            TickerResponse::Failed { reason } => {
                log::warn!("Ticker request failed: {}", reason);
                (Dispatch::NoResponse, HandlerEffect::Continue)
            }
            TickerResponse::Received { status, body } => {
                let bound = StatusRoute::from_code(*status)
                    .and_then(|route| self.handlers.get(&route).map(|h| (route, h)));

                match bound {
                    Some((route, handler)) => {
                        let effect = match handler.handle(state, &ctx, body).await {
                            Ok(effect) => effect,
                            Err(e) => {
                                log::error!("{} handler failed: {}", route, e);
                                HandlerEffect::Continue
                            }
                        };
                        (Dispatch::Handled(route), effect)
                    }
                    None => {
                        log::trace!("No handler for status {}", status);
                        (Dispatch::Unhandled(*status), HandlerEffect::Continue)
                    }
                }
            }
        };

        if let Some(hook) = &self.after_all {
            hook(state, &ctx, &response);
        }

        CycleReport {
            status: response.status(),
            dispatch,
            effect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::AppError;
    use crate::models::PulseConfig;
    use crate::pipeline::pulse::PulseController;
    use crate::pipeline::testing::{ScriptedSource, kst};

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: &'static str,
        journal: Journal,
        effect: HandlerEffect,
    }

    #[async_trait]
    impl StatusHandler for Recording {
        async fn handle(
            &self,
            _state: &mut PollState,
            _ctx: &CycleContext,
            body: &str,
        ) -> Result<HandlerEffect> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, body));
            Ok(self.effect)
        }
    }

    struct Failing;

    #[async_trait]
    impl StatusHandler for Failing {
        async fn handle(
            &self,
            _state: &mut PollState,
            _ctx: &CycleContext,
            _body: &str,
        ) -> Result<HandlerEffect> {
            Err(AppError::validation("boom"))
        }
    }

    fn state() -> PollState {
        PollState::new(PulseController::new(&PulseConfig::default(), 4))
    }

    fn dispatcher(journal: &Journal) -> StatusDispatcher {
        let source = Arc::new(ScriptedSource::statuses(&[]));
        let mut dispatcher = StatusDispatcher::new(source);

        let before = Arc::clone(journal);
        let after = Arc::clone(journal);
        dispatcher
            .before_all(move |_, _, response| {
                before
                    .lock()
                    .unwrap()
                    .push(format!("before:{:?}", response.status()));
            })
            .after_all(move |_, _, response| {
                after
                    .lock()
                    .unwrap()
                    .push(format!("after:{:?}", response.status()));
            });
        dispatcher
    }

    fn recording(name: &'static str, journal: &Journal) -> Recording {
        Recording {
            name,
            journal: Arc::clone(journal),
            effect: HandlerEffect::Continue,
        }
    }

    #[test]
    fn test_route_codes() {
        for route in [
            StatusRoute::Ok,
            StatusRoute::Forbidden,
            StatusRoute::TooManyRequests,
        ] {
            assert_eq!(StatusRoute::from_code(route.code()), Some(route));
        }
        assert_eq!(StatusRoute::from_code(500), None);
        assert_eq!(StatusRoute::TooManyRequests.to_string(), "429 Too Many Requests");
    }

    #[tokio::test]
    async fn test_hooks_wrap_handler_in_order() {
        let journal = Journal::default();
        let mut dispatcher = dispatcher(&journal);
        dispatcher.bind(StatusRoute::Ok, recording("ok", &journal));

        let report = dispatcher
            .dispatch(&mut state(), TickerResponse::received(200, "tick"))
            .await;

        assert_eq!(report.dispatch, Dispatch::Handled(StatusRoute::Ok));
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["before:Some(200)", "ok:tick", "after:Some(200)"]
        );
    }

    #[tokio::test]
    async fn test_last_binding_wins() {
        let journal = Journal::default();
        let mut dispatcher = dispatcher(&journal);
        dispatcher
            .bind(StatusRoute::Ok, recording("first", &journal))
            .bind(StatusRoute::Ok, recording("second", &journal));

        dispatcher
            .dispatch(&mut state(), TickerResponse::received(200, "x"))
            .await;

        let entries = journal.lock().unwrap().clone();
        assert!(entries.contains(&"second:x".to_string()));
        assert!(!entries.iter().any(|e| e.starts_with("first")));
    }

    #[tokio::test]
    async fn test_unbound_status_runs_hooks_only() {
        let journal = Journal::default();
        let mut dispatcher = dispatcher(&journal);
        dispatcher.bind(StatusRoute::Ok, recording("ok", &journal));

        let report = dispatcher
            .dispatch(&mut state(), TickerResponse::received(503, "down"))
            .await;
        assert_eq!(report.dispatch, Dispatch::Unhandled(503));
        assert_eq!(report.effect, HandlerEffect::Continue);

        // A known route with nothing bound is ignored the same way.
        let report = dispatcher
            .dispatch(&mut state(), TickerResponse::received(403, "nope"))
            .await;
        assert_eq!(report.dispatch, Dispatch::Unhandled(403));

        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "before:Some(503)",
                "after:Some(503)",
                "before:Some(403)",
                "after:Some(403)"
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_fault_reaches_hooks_without_status() {
        let journal = Journal::default();
        let mut dispatcher = dispatcher(&journal);
        dispatcher.bind(StatusRoute::Ok, recording("ok", &journal));

        let report = dispatcher
            .dispatch(&mut state(), TickerResponse::failed("timeout"))
            .await;

        assert_eq!(report.status, None);
        assert_eq!(report.dispatch, Dispatch::NoResponse);
        assert_eq!(*journal.lock().unwrap(), vec!["before:None", "after:None"]);
    }

    #[tokio::test]
    async fn test_handler_error_is_absorbed() {
        let journal = Journal::default();
        let mut dispatcher = dispatcher(&journal);
        dispatcher.bind(StatusRoute::Ok, Failing);

        let report = dispatcher
            .dispatch(&mut state(), TickerResponse::received(200, "x"))
            .await;

        assert_eq!(report.effect, HandlerEffect::Continue);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["before:Some(200)", "after:Some(200)"]
        );
    }

    #[tokio::test]
    async fn test_handler_effect_is_reported() {
        let journal = Journal::default();
        let mut dispatcher = dispatcher(&journal);
        dispatcher.bind(
            StatusRoute::TooManyRequests,
            Recording {
                name: "throttle",
                journal: Arc::clone(&journal),
                effect: HandlerEffect::Reschedule,
            },
        );

        let report = dispatcher
            .dispatch(&mut state(), TickerResponse::received(429, ""))
            .await;
        assert_eq!(report.effect, HandlerEffect::Reschedule);
    }

    #[tokio::test]
    async fn test_context_carries_previous_cycle() {
        let seen: Arc<Mutex<Option<CycleContext>>> = Arc::default();
        let source = Arc::new(ScriptedSource::statuses(&[200]));
        let mut dispatcher = StatusDispatcher::new(source);
        let sink = Arc::clone(&seen);
        dispatcher.before_all(move |_, ctx, _| *sink.lock().unwrap() = Some(*ctx));

        let mut state = state();
        state.previous_time = Some(kst(18, 9, 29));
        state.previous_status = Some(429);

        let report = dispatcher.send(&mut state).await;
        assert_eq!(report.status, Some(200));

        let ctx = seen.lock().unwrap().unwrap();
        assert_eq!(ctx.previous_time, Some(kst(18, 9, 29)));
        assert!(ctx.is_repeat(StatusRoute::TooManyRequests));
        assert!(!ctx.is_repeat(StatusRoute::Ok));
    }
}
