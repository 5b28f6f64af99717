// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::data_dir;

pub const PAGE_SIZE_OPTIONS: [usize; 4] = [5, 10, 20, 30];
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// User preferences persisted as `settings.json`. The page size is kept as
/// text because that is how it is stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub is_dark_mode: bool,
    #[serde(default = "default_page_size_text")]
    pub page_size: String,
}

fn default_page_size_text() -> String {
    DEFAULT_PAGE_SIZE.to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            is_dark_mode: false,
            page_size: default_page_size_text(),
        }
    }
}

impl AppSettings {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Read settings {}", path.display()));
            }
        };
        serde_json::from_str(&content)
            .with_context(|| format!("Parse settings {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Create settings dir {}", parent.display()))?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload).with_context(|| format!("Write settings {}", path.display()))?;
        Ok(())
    }

    /// Unparsable or non-positive values fall back to the default.
    pub fn page_size(&self) -> usize {
        match self.page_size.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    /// Only the fixed options are accepted.
    pub fn set_page_size(&mut self, size: usize) -> bool {
        if !PAGE_SIZE_OPTIONS.contains(&size) {
            return false;
        }
        self.page_size = size.to_string();
        true
    }
}

pub fn default_settings_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_falls_back_to_ten() {
        let mut s = AppSettings::default();
        assert_eq!(s.page_size(), 10);
        s.page_size = "abc".into();
        assert_eq!(s.page_size(), 10);
        s.page_size = "0".into();
        assert_eq!(s.page_size(), 10);
        s.page_size = " 20 ".into();
        assert_eq!(s.page_size(), 20);
    }

    #[test]
    fn only_listed_sizes_can_be_set() {
        let mut s = AppSettings::default();
        assert!(!s.set_page_size(7));
        assert!(s.set_page_size(30));
        assert_eq!(s.page_size, "30");
    }

    #[test]
    fn missing_file_loads_defaults_and_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        assert_eq!(AppSettings::load(&path).unwrap(), AppSettings::default());

        let s = AppSettings {
            is_dark_mode: true,
            page_size: "5".into(),
        };
        s.save(&path).unwrap();
        assert_eq!(AppSettings::load(&path).unwrap(), s);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let s: AppSettings = serde_json::from_str(r#"{"is_dark_mode": true}"#).unwrap();
        assert_eq!(s.page_size(), 10);
        assert!(s.is_dark_mode);
    }
}
