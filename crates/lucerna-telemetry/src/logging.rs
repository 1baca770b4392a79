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

//! Installation of the global `env_logger` logger.

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::sync::Once;

/// Crates whose logging is clamped to [`LoggingConfig::gpu_level`].
const GPU_CRATES: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

static INIT: Once = Once::new();

/// How the logger is configured when `RUST_LOG` is not set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for every crate.
    pub level: String,
    /// Level for the graphics backend crates. Anything more verbose than
    /// `warn` is clamped to `warn`.
    pub gpu_level: String,
    /// Prefix records with a millisecond timestamp.
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            gpu_level: "warn".to_string(),
            timestamps: true,
        }
    }
}

impl LoggingConfig {
    /// The `env_logger` filter directive for this configuration.
    pub fn filter_spec(&self) -> String {
        let level = self.level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);
        let gpu = self
            .gpu_level
            .parse::<LevelFilter>()
            .unwrap_or(LevelFilter::Warn)
            .min(LevelFilter::Warn);
        let mut filters = level.to_string().to_lowercase();
        for krate in GPU_CRATES {
            filters.push_str(&format!(",{krate}={}", gpu.to_string().to_lowercase()));
        }
        filters
    }
}

/// Installs the global logger once. `RUST_LOG` overrides the configured
/// filter. Later calls do nothing.
///
/// Returns `true` if this call installed the logger.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let mut installed = false;
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or(config.filter_spec());
        let mut builder = env_logger::Builder::from_env(env);
        if config.timestamps {
            builder.format_timestamp_millis();
        } else {
            builder.format_timestamp(None);
        }
        match builder.try_init() {
            Ok(()) => installed = true,
            Err(e) => eprintln!("init_logging: a logger is already installed: {e}"),
        }
    });
    if installed {
        log::debug!("Logging: initialized with '{}'", config.filter_spec());
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_spec() {
        assert_eq!(
            LoggingConfig::default().filter_spec(),
            "info,wgpu_core=warn,wgpu_hal=warn,naga=warn"
        );
    }

    #[test]
    fn test_gpu_crates_are_clamped() {
        let config = LoggingConfig {
            level: "trace".to_string(),
            gpu_level: "debug".to_string(),
            timestamps: false,
        };
        assert_eq!(
            config.filter_spec(),
            "trace,wgpu_core=warn,wgpu_hal=warn,naga=warn"
        );

        let quiet = LoggingConfig {
            gpu_level: "error".to_string(),
            ..Default::default()
        };
        assert!(quiet.filter_spec().ends_with("naga=error"));
    }

    #[test]
    fn test_unparsable_levels_fall_back() {
        let config = LoggingConfig {
            level: "chatty".to_string(),
            gpu_level: "?".to_string(),
            timestamps: true,
        };
        assert!(config.filter_spec().starts_with("info,"));
        assert!(config.filter_spec().contains("wgpu_hal=warn"));
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        let first = init_logging(&config);
        assert!(!init_logging(&config));
        // Another test binary may have installed a logger already.
        let _ = first;
    }

    #[test]
    fn test_partial_ron() {
        let config: LoggingConfig = ron::from_str("(level: \"debug\")").unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.gpu_level, "warn");
    }
}
