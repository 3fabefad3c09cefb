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

//! Startup configuration, optionally loaded from a TOML file.
//!
//! ```toml
//! window_title = "My Game"
//! application_name = "my-game"
//! width = 1280
//! height = 720
//! renderer = "software"
//! log_level = "info"
//!
//! [flags]
//! vsync = true
//! resizable = true
//! ```

use crate::platform::WindowFlags;
use crate::renderer::Renderer;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Verbosity of the platform's diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Everything the platform needs to start. Immutable once the session is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupDescriptor {
    pub window_title: String,
    /// Used to derive the per-user data directory.
    pub application_name: String,
    /// Initial window width, in logical units.
    pub width: u32,
    /// Initial window height, in logical units.
    pub height: u32,
    pub renderer: Renderer,
    pub log_level: LogLevel,
    #[serde(with = "flag_table")]
    pub flags: WindowFlags,
}

impl Default for StartupDescriptor {
    fn default() -> Self {
        Self {
            window_title: "Vesta".to_string(),
            application_name: "vesta".to_string(),
            width: 1280,
            height: 720,
            renderer: Renderer::Default,
            log_level: LogLevel::Info,
            flags: WindowFlags::VSYNC | WindowFlags::RESIZABLE | WindowFlags::MOUSE_VISIBLE,
        }
    }
}

impl StartupDescriptor {
    /// Parses a descriptor from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let descriptor: StartupDescriptor =
            toml::from_str(content).context("Failed to parse startup descriptor")?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Loads a descriptor from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Startup config not found at {path:?}, using defaults");
            return Ok(StartupDescriptor::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read startup config: {path:?}"))?;
        let descriptor = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid startup config: {path:?}"))?;

        log::info!("Loaded startup config from {path:?}");
        log::debug!("Startup descriptor: {descriptor:?}");
        Ok(descriptor)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!(
                "window size must be non-zero, got {}x{}",
                self.width,
                self.height
            );
        }
        if self.application_name.trim().is_empty() {
            anyhow::bail!("application_name must not be empty");
        }
        Ok(())
    }
}

/// (De)serializes `WindowFlags` as a table of booleans.
mod flag_table {
    use crate::platform::WindowFlags;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(default)]
    struct FlagTable {
        fullscreen: bool,
        vsync: bool,
        resizable: bool,
        mouse_visible: bool,
    }

    impl Default for FlagTable {
        fn default() -> Self {
            Self {
                fullscreen: false,
                vsync: true,
                resizable: true,
                mouse_visible: true,
            }
        }
    }

    pub fn serialize<S: Serializer>(flags: &WindowFlags, serializer: S) -> Result<S::Ok, S::Error> {
        FlagTable {
            fullscreen: flags.contains(WindowFlags::FULLSCREEN),
            vsync: flags.contains(WindowFlags::VSYNC),
            resizable: flags.contains(WindowFlags::RESIZABLE),
            mouse_visible: flags.contains(WindowFlags::MOUSE_VISIBLE),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<WindowFlags, D::Error> {
        let table = FlagTable::deserialize(deserializer)?;
        let mut flags = WindowFlags::empty();
        flags.set(WindowFlags::FULLSCREEN, table.fullscreen);
        flags.set(WindowFlags::VSYNC, table.vsync);
        flags.set(WindowFlags::RESIZABLE, table.resizable);
        flags.set(WindowFlags::MOUSE_VISIBLE, table.mouse_visible);
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let descriptor = StartupDescriptor::from_toml_str("").unwrap();
        assert_eq!(descriptor, StartupDescriptor::default());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let descriptor = StartupDescriptor::from_toml_str(
            r#"
            window_title = "Test"
            width = 320
            renderer = "software"
            log_level = "debug"

            [flags]
            fullscreen = true
            vsync = false
            "#,
        )
        .unwrap();

        assert_eq!(descriptor.window_title, "Test");
        assert_eq!(descriptor.width, 320);
        assert_eq!(descriptor.height, 720);
        assert_eq!(descriptor.renderer, Renderer::Software);
        assert_eq!(descriptor.log_level, LogLevel::Debug);
        assert!(descriptor.flags.contains(WindowFlags::FULLSCREEN));
        assert!(!descriptor.flags.contains(WindowFlags::VSYNC));
        assert!(descriptor.flags.contains(WindowFlags::RESIZABLE));
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(StartupDescriptor::from_toml_str("width = 0").is_err());
    }

    #[test]
    fn unknown_renderer_is_rejected() {
        assert!(StartupDescriptor::from_toml_str("renderer = \"glide\"").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = StartupDescriptor::load_from_path(dir.path().join("vesta.toml")).unwrap();
        assert_eq!(descriptor, StartupDescriptor::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "application_name = \"demo\"").unwrap();
        let descriptor = StartupDescriptor::load_from_path(file.path()).unwrap();
        assert_eq!(descriptor.application_name, "demo");
    }

    #[test]
    fn serialized_descriptor_parses_back() {
        let original = StartupDescriptor {
            flags: WindowFlags::FULLSCREEN,
            ..StartupDescriptor::default()
        };
        let text = toml::to_string(&original).unwrap();
        assert_eq!(StartupDescriptor::from_toml_str(&text).unwrap(), original);
    }
}
