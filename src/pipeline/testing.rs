//! In-memory collaborators for pipeline tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::pipeline::clock::{Clock, DayKey, TimePoint};
use crate::services::{TickerResponse, TickerSource};
use crate::storage::{ArchiveMetadata, DayArchiver, SampleStorage};

/// A reading in KST on the given October 2026 day.
pub fn kst(day: u32, hour: u32, minute: u32) -> TimePoint {
    let offset = FixedOffset::east_opt(9 * 3600).unwrap();
    TimePoint::new(
        offset
            .with_ymd_and_hms(2026, 10, day, hour, minute, 0)
            .unwrap(),
    )
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<TimePoint>,
}

impl ManualClock {
    pub fn new(start: TimePoint) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, time: TimePoint) {
        *self.now.lock().unwrap() = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimePoint {
        *self.now.lock().unwrap()
    }
}

/// Replays a fixed list of responses, then reports a transport fault.
pub struct ScriptedSource {
    script: Mutex<VecDeque<TickerResponse>>,
    latency: Duration,
    calls: Mutex<Vec<Instant>>,
    cancel_when_exhausted: Option<CancellationToken>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = TickerResponse>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            cancel_when_exhausted: None,
        }
    }

    /// Build from status codes, with a JSON body for each.
    pub fn statuses(codes: &[u16]) -> Self {
        Self::new(
            codes
                .iter()
                .map(|code| TickerResponse::received(*code, format!(r#"{{"last":"{code}"}}"#))),
        )
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Cancel `token` on the first fetch past the end of the script.
    pub fn cancel_when_exhausted(mut self, token: CancellationToken) -> Self {
        self.cancel_when_exhausted = Some(token);
        self
    }

    /// Start instants of every fetch so far.
    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TickerSource for ScriptedSource {
    async fn fetch(&self) -> TickerResponse {
        self.calls.lock().unwrap().push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => {
                if let Some(token) = &self.cancel_when_exhausted {
                    token.cancel();
                }
                TickerResponse::failed("script exhausted")
            }
        }
    }
}

/// Records appended lines and archive requests.
#[derive(Default)]
pub struct MemoryStorage {
    lines: Mutex<Vec<(DayKey, String)>>,
    archived: Mutex<Vec<DayKey>>,
    fail_appends: bool,
    fail_archives: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_appends() -> Self {
        Self {
            fail_appends: true,
            ..Self::default()
        }
    }

    pub fn failing_archives() -> Self {
        Self {
            fail_archives: true,
            ..Self::default()
        }
    }

    pub fn lines(&self) -> Vec<(DayKey, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn archived(&self) -> Vec<DayKey> {
        self.archived.lock().unwrap().clone()
    }
}

#[async_trait]
impl SampleStorage for MemoryStorage {
    async fn append_line(&self, day: &DayKey, line: &str) -> Result<()> {
        if self.fail_appends {
            return Err(AppError::Io(std::io::Error::other("disk full")));
        }
        self.lines.lock().unwrap().push((*day, line.to_string()));
        Ok(())
    }
}

#[async_trait]
impl DayArchiver for MemoryStorage {
    async fn archive(&self, day: &DayKey) -> Result<ArchiveMetadata> {
        self.archived.lock().unwrap().push(*day);
        if self.fail_archives {
            return Err(AppError::archive(day, "compression failed"));
        }
        Ok(ArchiveMetadata {
            day: *day,
            location: format!("memory://{day}"),
            sample_count: 0,
            original_bytes: 0,
            compressed_bytes: 0,
            timestamp: chrono::Utc::now(),
        })
    }
}
