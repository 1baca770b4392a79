// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-frame telemetry bookkeeping.

use crate::frame_stats::{FrameTimeLog, FrameTimeSummary};
use crate::report::stage_report;
use lucerna_core::math::Extent2D;
use lucerna_core::renderer::StageTimings;
use lucerna_core::Stopwatch;
use std::time::{Duration, Instant};

/// Tracks frame times, the latest GPU stage timings, and when the overlay
/// text is due for a refresh.
#[derive(Debug)]
pub struct TelemetryService {
    frame_log: FrameTimeLog,
    frame_clock: Stopwatch,
    latest_timings: Option<StageTimings>,
    last_refresh: Option<Instant>,
    refresh_interval: Duration,
    frames: u64,
}

impl TelemetryService {
    /// Creates a service refreshing the overlay every `refresh_interval`.
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            frame_log: FrameTimeLog::default(),
            frame_clock: Stopwatch::new(),
            latest_timings: None,
            last_refresh: None,
            refresh_interval,
            frames: 0,
        }
    }

    /// Marks the start of a frame. Returns the time since the previous one.
    pub fn begin_frame(&mut self) -> Duration {
        let delta = self.frame_clock.lap();
        if self.frames > 0 {
            self.frame_log.update(delta);
        }
        self.frames += 1;
        delta
    }

    /// Stores GPU timings read back for a completed frame.
    pub fn record_timings(&mut self, timings: StageTimings) {
        self.latest_timings = Some(timings);
    }

    /// The most recent GPU timings.
    pub fn latest_timings(&self) -> Option<&StageTimings> {
        self.latest_timings.as_ref()
    }

    /// The most recent frame-time summary.
    pub fn frame_summary(&self) -> Option<FrameTimeSummary> {
        self.frame_log.last_summary()
    }

    /// Frames started so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns `true` once per refresh interval. The first call is always due.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        match self.last_refresh {
            Some(last) if now.duration_since(last) < self.refresh_interval => false,
            _ => {
                log::trace!("TelemetryService: overlay refresh due");
                self.last_refresh = Some(now);
                true
            }
        }
    }

    /// The overlay lines for the current state.
    pub fn overlay_text(&self, adapter_name: &str, extent: Extent2D, lights: usize) -> Vec<String> {
        stage_report(adapter_name, extent, lights, self.latest_timings.as_ref())
    }
}

impl Default for TelemetryService {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_respects_interval() {
        let mut service = TelemetryService::new(Duration::from_secs(3600));
        assert!(service.tick());
        assert!(!service.tick());

        let mut eager = TelemetryService::new(Duration::ZERO);
        assert!(eager.tick());
        assert!(eager.tick());
    }

    #[test]
    fn test_overlay_uses_latest_timings() {
        let mut service = TelemetryService::default();
        let text = service.overlay_text("gpu", Extent2D::new(4, 4), 2);
        assert_eq!(text.last().map(String::as_str), Some("timestamp queries unavailable"));

        service.record_timings(StageTimings::default());
        let text = service.overlay_text("gpu", Extent2D::new(4, 4), 2);
        assert_eq!(text.last().map(String::as_str), Some("total: 0.000"));
    }

    #[test]
    fn test_begin_frame_counts_frames() {
        let mut service = TelemetryService::default();
        service.begin_frame();
        service.begin_frame();
        assert_eq!(service.frames(), 2);
        assert!(service.frame_summary().is_none());
    }
}
