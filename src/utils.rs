// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, Local};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rust_decimal::{Decimal, RoundingStrategy};

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

/// Compact rendering for dashboard figures: `1.5K`, `2.0M`, `12.34`.
pub fn format_amount(amount: Decimal) -> String {
    const UNITS: [(i64, &str); 4] = [
        (1_000_000_000_000, "T"),
        (1_000_000_000, "B"),
        (1_000_000, "M"),
        (1_000, "K"),
    ];
    let abs = amount.abs();
    for (scale, suffix) in UNITS {
        let scale = Decimal::from(scale);
        if abs >= scale {
            let scaled =
                (amount / scale).round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            return format!("{:.1}{}", scaled, suffix);
        }
    }
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Current local calendar year as the 4-digit string records store.
pub fn current_year() -> String {
    Local::now().year().to_string()
}
