// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use fynance::cli::{self, Options};
use fynance::db::{self, Store};
use fynance::settings::{self, AppSettings};
use fynance::shell::Shell;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fynance=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Options::from_matches(&cli::build_cli().get_matches());

    let db_path = match &opts.db {
        Some(p) => p.clone(),
        None => db::db_path()?,
    };
    let settings_path = match &opts.settings {
        Some(p) => p.clone(),
        None => match db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.join("settings.json"),
            None => settings::default_settings_path()?,
        },
    };

    let store = Store::open(&db_path)?;
    let settings = match AppSettings::load(&settings_path) {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!("{err:#}; using default settings");
            AppSettings::default()
        }
    };
    tracing::info!(db = %db_path.display(), settings = %settings_path.display(), "starting");

    let mut shell = Shell::open(store, settings, settings_path, &opts.user).await?;
    if let Err(err) = shell.run().await {
        tracing::error!("{err:#}");
        return Err(err);
    }
    Ok(())
}
