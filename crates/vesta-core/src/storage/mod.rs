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

//! Read-only access to game content relative to a root directory.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A source of content files.
///
/// Paths are relative to the source's root. [`Content`] reads straight from
/// the filesystem; other implementations can serve archives or embedded data.
pub trait ContentSource {
    fn file_exists(&self, relative_path: &str) -> bool;

    fn directory_exists(&self, relative_path: &str) -> bool;

    /// `true` if a file or a directory exists at the path.
    fn exists(&self, relative_path: &str) -> bool {
        self.file_exists(relative_path) || self.directory_exists(relative_path)
    }

    /// Files under `path` whose names match `pattern` (`*` and `?` wildcards).
    /// With `recursive`, subdirectories are searched too.
    fn enumerate_files(&self, path: &str, pattern: &str, recursive: bool) -> io::Result<Vec<PathBuf>>;

    /// Directories under `path` whose names match `pattern`.
    fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        recursive: bool,
    ) -> io::Result<Vec<PathBuf>>;

    fn open_read(&self, relative_path: &str) -> io::Result<Box<dyn Read>>;

    fn read_all_bytes(&self, relative_path: &str) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.open_read(relative_path)?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn read_all_text(&self, relative_path: &str) -> io::Result<String> {
        let mut text = String::new();
        self.open_read(relative_path)?.read_to_string(&mut text)?;
        Ok(text)
    }
}

/// Filesystem content rooted at `current_directory`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    pub current_directory: PathBuf,
}

impl Content {
    pub fn new(current_directory: impl Into<PathBuf>) -> Self {
        Self {
            current_directory: current_directory.into(),
        }
    }

    /// Resolves a relative path against the content root.
    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        self.current_directory.join(relative_path)
    }

    fn enumerate(
        &self,
        path: &str,
        pattern: &str,
        recursive: bool,
        want_dirs: bool,
    ) -> io::Result<Vec<PathBuf>> {
        let root = self.resolve(path);
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("content directory not found: {}", root.display()),
            ));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut found = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1).max_depth(max_depth) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_dir() != want_dirs {
                continue;
            }
            if matches_pattern(&entry.file_name().to_string_lossy(), pattern) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        Ok(found)
    }
}

impl ContentSource for Content {
    fn file_exists(&self, relative_path: &str) -> bool {
        self.resolve(relative_path).is_file()
    }

    fn directory_exists(&self, relative_path: &str) -> bool {
        self.resolve(relative_path).is_dir()
    }

    fn enumerate_files(&self, path: &str, pattern: &str, recursive: bool) -> io::Result<Vec<PathBuf>> {
        self.enumerate(path, pattern, recursive, false)
    }

    fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        recursive: bool,
    ) -> io::Result<Vec<PathBuf>> {
        self.enumerate(path, pattern, recursive, true)
    }

    fn open_read(&self, relative_path: &str) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(File::open(self.resolve(relative_path))?))
    }

    fn read_all_bytes(&self, relative_path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(relative_path))
    }

    fn read_all_text(&self, relative_path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(relative_path))
    }
}

impl AsRef<Path> for Content {
    fn as_ref(&self) -> &Path {
        &self.current_directory
    }
}

/// Matches a file name against a pattern where `*` matches any run of
/// characters and `?` matches exactly one.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut n, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            n += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = backtrack {
            p = star_p + 1;
            n = star_n + 1;
            backtrack = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn content_tree() -> (tempfile::TempDir, Content) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sprites/characters")).unwrap();
        fs::write(dir.path().join("sprites/player.png"), b"png").unwrap();
        fs::write(dir.path().join("sprites/enemy.png"), b"png").unwrap();
        fs::write(dir.path().join("sprites/readme.txt"), b"hello").unwrap();
        fs::write(dir.path().join("sprites/characters/hero.png"), b"png").unwrap();
        let content = Content::new(dir.path());
        (dir, content)
    }

    #[test]
    fn wildcard_patterns() {
        assert!(matches_pattern("player.png", "*.png"));
        assert!(matches_pattern("player.png", "*"));
        assert!(matches_pattern("a1.txt", "a?.txt"));
        assert!(!matches_pattern("a12.txt", "a?.txt"));
        assert!(matches_pattern("level_01_boss.json", "level_*_boss.*"));
        assert!(!matches_pattern("player.png", "*.txt"));
    }

    #[test]
    fn existence_checks() {
        let (_dir, content) = content_tree();
        assert!(content.file_exists("sprites/player.png"));
        assert!(!content.file_exists("sprites"));
        assert!(content.directory_exists("sprites/characters"));
        assert!(content.exists("sprites"));
        assert!(!content.exists("missing"));
    }

    #[test]
    fn enumerate_top_level_files() {
        let (dir, content) = content_tree();
        let files = content.enumerate_files("sprites", "*.png", false).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("sprites/enemy.png"),
                dir.path().join("sprites/player.png"),
            ]
        );
    }

    #[test]
    fn enumerate_recursively() {
        let (_dir, content) = content_tree();
        let files = content.enumerate_files("sprites", "*.png", true).unwrap();
        assert_eq!(files.len(), 3);
        let dirs = content.enumerate_directories("", "*", true).unwrap();
        assert_eq!(dirs.len(), 2);
    }

    #[test]
    fn enumerate_missing_directory_fails() {
        let (_dir, content) = content_tree();
        let err = content.enumerate_files("nope", "*", false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn reads_bytes_and_text() {
        let (_dir, content) = content_tree();
        assert_eq!(content.read_all_bytes("sprites/player.png").unwrap(), b"png");
        assert_eq!(content.read_all_text("sprites/readme.txt").unwrap(), "hello");

        let mut text = String::new();
        content
            .open_read("sprites/readme.txt")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "hello");
    }
}
