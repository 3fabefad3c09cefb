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


use std::path::PathBuf;

/// The per-user data directory for `application_name`, created if missing.
///
/// `None` when the OS has no data directory or it cannot be created.
pub fn user_path(application_name: &str) -> Option<PathBuf> {
    let path = dirs::data_dir()?.join(application_name);
    match std::fs::create_dir_all(&path) {
        Ok(()) => Some(path),
        Err(e) => {
            log::warn!("Cannot create user directory {}: {e}", path.display());
            None
        }
    }
}
