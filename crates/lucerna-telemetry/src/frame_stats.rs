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

//! Rolling frame-time statistics.

use std::fmt;
use std::time::Duration;

/// Frames accumulated before a summary is produced.
pub const DEFAULT_WINDOW: u32 = 180;

/// Frame-time statistics over one window of frames, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTimeSummary {
    /// Shortest frame.
    pub min_ms: f32,
    /// Longest frame.
    pub max_ms: f32,
    /// Mean frame time.
    pub avg_ms: f32,
}

impl FrameTimeSummary {
    /// Frames per second derived from the mean frame time.
    pub fn fps(&self) -> u32 {
        if self.avg_ms > 0.0 {
            (1000.0 / self.avg_ms) as u32
        } else {
            0
        }
    }
}

impl fmt::Display for FrameTimeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame time min: {:.1}, max: {:.1}, avg: {:.1}, fps: {}",
            self.min_ms,
            self.max_ms,
            self.avg_ms,
            self.fps()
        )
    }
}

/// Accumulates frame times and logs a summary every `window` frames.
#[derive(Debug, Clone)]
pub struct FrameTimeLog {
    window: u32,
    count: u32,
    min_ms: f32,
    max_ms: f32,
    avg_ms: f32,
    last: Option<FrameTimeSummary>,
}

impl Default for FrameTimeLog {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl FrameTimeLog {
    /// Creates a log summarizing every `window` frames. A zero window is
    /// treated as one.
    pub fn new(window: u32) -> Self {
        Self {
            window: window.max(1),
            count: 0,
            min_ms: 0.0,
            max_ms: 0.0,
            avg_ms: 0.0,
            last: None,
        }
    }

    /// Adds one frame. When the window completes, the summary is logged at
    /// `info`, returned, and the accumulation restarts.
    pub fn update(&mut self, delta: Duration) -> Option<FrameTimeSummary> {
        let ms = delta.as_secs_f32() * 1000.0;
        if self.count == 0 {
            self.min_ms = ms;
            self.max_ms = ms;
            self.avg_ms = ms;
        } else {
            self.min_ms = self.min_ms.min(ms);
            self.max_ms = self.max_ms.max(ms);
            self.avg_ms = (self.avg_ms * self.count as f32 + ms) / (self.count + 1) as f32;
        }
        self.count += 1;

        if self.count < self.window {
            return None;
        }
        let summary = FrameTimeSummary {
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            avg_ms: self.avg_ms,
        };
        log::info!("{summary}");
        self.count = 0;
        self.last = Some(summary);
        Some(summary)
    }

    /// The most recent completed summary.
    pub fn last_summary(&self) -> Option<FrameTimeSummary> {
        self.last
    }

    /// Frames accumulated in the current window.
    pub fn pending_frames(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_summary_after_window() {
        let mut log = FrameTimeLog::new(3);
        assert!(log.update(Duration::from_millis(10)).is_none());
        assert!(log.update(Duration::from_millis(30)).is_none());
        let summary = log.update(Duration::from_millis(20)).unwrap();
        assert_relative_eq!(summary.min_ms, 10.0, epsilon = 1e-3);
        assert_relative_eq!(summary.max_ms, 30.0, epsilon = 1e-3);
        assert_relative_eq!(summary.avg_ms, 20.0, epsilon = 1e-3);
        assert_eq!(summary.fps(), 50);
        assert_eq!(log.pending_frames(), 0);
    }

    #[test]
    fn test_window_restarts() {
        let mut log = FrameTimeLog::new(2);
        log.update(Duration::from_millis(100));
        log.update(Duration::from_millis(100));
        log.update(Duration::from_millis(4));
        let summary = log.update(Duration::from_millis(6)).unwrap();
        assert_relative_eq!(summary.max_ms, 6.0, epsilon = 1e-3);
        assert_eq!(log.last_summary(), Some(summary));
    }

    #[test]
    fn test_display_format() {
        let summary = FrameTimeSummary {
            min_ms: 1.25,
            max_ms: 9.0,
            avg_ms: 4.0,
        };
        assert_eq!(
            summary.to_string(),
            "frame time min: 1.2, max: 9.0, avg: 4.0, fps: 250"
        );
    }
}
