// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{arg, command, ArgMatches, Command};
use std::path::PathBuf;

pub const DEFAULT_USER: &str = "me";

pub fn build_cli() -> Command {
    command!()
        .about("Track income and expenses, browse them page by page, and report on them")
        .arg(arg!(--db <PATH> "SQLite database file (default: platform data dir)").required(false))
        .arg(arg!(--settings <PATH> "settings.json location (default: beside the database)").required(false))
        .arg(arg!(--user <NAME> "Session user; created on first use").required(false))
}

/// Process options after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub db: Option<PathBuf>,
    pub settings: Option<PathBuf>,
    pub user: String,
}

impl Options {
    pub fn from_matches(m: &ArgMatches) -> Self {
        let path = |id: &str| {
            m.get_one::<String>(id)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        };
        let user = m
            .get_one::<String>("user")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string());
        Self {
            db: path("db"),
            settings: path("settings"),
            user,
        }
    }
}
