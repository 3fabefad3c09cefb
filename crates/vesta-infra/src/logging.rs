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


//! Process-wide logger setup.

use env_logger::{Builder, Env};
use std::sync::Once;
use vesta_core::LogLevel;

static INIT: Once = Once::new();

/// Crates whose output is capped at `warn` unless `RUST_LOG` says otherwise.
const NOISY_MODULES: [&str; 3] = ["wgpu_hal", "wgpu_core", "naga"];

/// The filter used when `RUST_LOG` is unset: `level` for everything, with
/// the noisy GPU crates never above `warn`.
fn default_filter(level: LogLevel) -> String {
    let level = level.to_level_filter();
    let cap = level.min(log::LevelFilter::Warn);
    let mut filter = level.to_string().to_lowercase();
    for module in NOISY_MODULES {
        filter.push_str(&format!(",{module}={}", cap.to_string().to_lowercase()));
    }
    filter
}

/// Installs `env_logger` at `level`. `RUST_LOG` takes precedence when set,
/// including for the GPU crates that are otherwise capped at `warn`.
///
/// Only the first call has an effect. If another logger is already installed
/// it is left in place.
pub fn init_logging(level: LogLevel) {
    INIT.call_once(|| {
        let result = Builder::from_env(Env::default().default_filter_or(default_filter(level)))
            .try_init();
        if result.is_err() {
            log::debug!("A logger was already installed; keeping it.");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_caps_gpu_crates() {
        assert_eq!(
            default_filter(LogLevel::Trace),
            "trace,wgpu_hal=warn,wgpu_core=warn,naga=warn"
        );
        assert_eq!(
            default_filter(LogLevel::Error),
            "error,wgpu_hal=error,wgpu_core=error,naga=error"
        );
    }

    #[test]
    fn repeated_initialisation_is_harmless() {
        init_logging(LogLevel::Debug);
        init_logging(LogLevel::Off);
        log::info!("still logging");
    }
}
