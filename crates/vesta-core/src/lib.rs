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


//! Core contracts of the Vesta platform layer.
//!
//! This crate defines what crosses the boundary between application code and
//! a platform backend: typed resource handles, plain-data descriptors, the
//! draw/clear command protocol, platform events and the session lifecycle.
//! Concrete backends live in `vesta-infra`.

pub mod config;
pub mod event;
pub mod input;
pub mod platform;
pub mod renderer;
pub mod session;
pub mod storage;
pub mod utils;

pub use config::{LogLevel, StartupDescriptor};
pub use event::{EventBus, PlatformEvent};
pub use session::{Session, SessionState};
