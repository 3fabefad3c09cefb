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


use std::fmt;

/// An error raised by a platform service (window creation, clipboard, images).
#[derive(Debug)]
pub enum PlatformError {
    /// The OS window or its event loop could not be created.
    WindowCreation(String),
    /// Image bytes could not be decoded.
    ImageDecode(String),
    /// Pixels could not be encoded.
    ImageEncode(String),
    /// The clipboard could not be accessed.
    Clipboard(String),
    /// An underlying I/O operation failed.
    Io(std::io::Error),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::WindowCreation(msg) => write!(f, "Window creation failed: {msg}"),
            PlatformError::ImageDecode(msg) => write!(f, "Image decode failed: {msg}"),
            PlatformError::ImageEncode(msg) => write!(f, "Image encode failed: {msg}"),
            PlatformError::Clipboard(msg) => write!(f, "Clipboard unavailable: {msg}"),
            PlatformError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlatformError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        PlatformError::Io(err)
    }
}
