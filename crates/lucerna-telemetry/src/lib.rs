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

//! Ambient services of the renderer: logging set-up, frame-time statistics
//! and the per-stage GPU timing report shown by the overlay.

#![warn(missing_docs)]

pub mod frame_stats;
pub mod logging;
pub mod report;
pub mod service;

pub use frame_stats::{FrameTimeLog, FrameTimeSummary};
pub use logging::{init_logging, LoggingConfig};
pub use report::stage_report;
pub use service::TelemetryService;
