// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Monthly income/expense report and the dashboard summary.
//!
//! Totals are recomputed on every call and never persisted. A failed
//! aggregation degrades the affected figure to zero and is noted in the
//! result; it never aborts the rest of the report.

use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

use crate::error::StoreResult;
use crate::models::{Month, MonthlyTotal, ReportRow};
use crate::store::LedgerGateway;
use crate::utils::current_year;

/// Number of categories shown per kind on the dashboard.
pub const TOP_CATEGORIES: usize = 5;

/// Two decimal places, halves rounded away from zero.
pub fn round_money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub year: String,
    pub rows: Vec<ReportRow>,
    /// One line per degraded figure.
    pub failures: Vec<String>,
}

impl Report {
    pub fn total_income(&self) -> Decimal {
        self.rows.iter().map(|r| r.total_income).sum()
    }

    pub fn total_expense(&self) -> Decimal {
        self.rows.iter().map(|r| r.total_expense).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub year: String,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    pub top_income: Vec<(String, Decimal)>,
    pub top_expense: Vec<(String, Decimal)>,
    pub failures: Vec<String>,
}

pub struct ReportAggregator {
    income: Arc<dyn LedgerGateway>,
    expense: Arc<dyn LedgerGateway>,
}

impl ReportAggregator {
    pub fn new(income: Arc<dyn LedgerGateway>, expense: Arc<dyn LedgerGateway>) -> Self {
        Self { income, expense }
    }

    pub async fn build_report(&self, year: &str, months: &[Month]) -> Report {
        let mut rows = Vec::with_capacity(months.len());
        let mut failures = Vec::new();
        for &month in months {
            let (income, expense) = tokio::join!(
                self.income.sum_by_month(year, month),
                self.expense.sum_by_month(year, month)
            );
            let total_income = settle(income, month, "income", &mut failures);
            let total_expense = settle(expense, month, "expense", &mut failures);
            rows.push(ReportRow {
                month,
                total_income,
                total_expense,
                balance: total_income - total_expense,
            });
        }
        Report {
            year: year.to_string(),
            rows,
            failures,
        }
    }

    pub async fn build_current_year_report(&self) -> Report {
        self.build_report(&current_year(), &Month::ALL).await
    }

    pub async fn dashboard(&self, year: &str) -> Dashboard {
        let mut failures = Vec::new();
        let (income, expense, top_income, top_expense) = tokio::join!(
            self.income.sum_by_year(year),
            self.expense.sum_by_year(year),
            self.income.totals_by_category(year),
            self.expense.totals_by_category(year)
        );

        let mut total = |res: StoreResult<Decimal>, what: &str| match res {
            Ok(v) => round_money(v),
            Err(err) => {
                tracing::warn!(year, "{what} total failed: {err}");
                failures.push(format!("{what} total unavailable: {err}"));
                Decimal::ZERO
            }
        };
        let total_income = total(income, "income");
        let total_expense = total(expense, "expense");

        let mut top = |res: StoreResult<Vec<(String, Decimal)>>, what: &str| match res {
            Ok(items) => items
                .into_iter()
                .take(TOP_CATEGORIES)
                .map(|(name, v)| (name, round_money(v)))
                .collect(),
            Err(err) => {
                tracing::warn!(year, "{what} categories failed: {err}");
                failures.push(format!("{what} categories unavailable: {err}"));
                Vec::new()
            }
        };
        let top_income = top(top_income, "income");
        let top_expense = top(top_expense, "expense");

        Dashboard {
            year: year.to_string(),
            total_income,
            total_expense,
            balance: total_income - total_expense,
            top_income,
            top_expense,
            failures,
        }
    }
}

fn settle(
    res: StoreResult<MonthlyTotal>,
    month: Month,
    kind: &str,
    failures: &mut Vec<String>,
) -> Decimal {
    match res {
        Ok(t) => round_money(t.total),
        Err(err) => {
            tracing::warn!(%month, "{kind} aggregation failed: {err}");
            failures.push(format!("{month}: {kind} unavailable ({err})"));
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        let d = |s: &str| s.parse::<Decimal>().unwrap();
        assert_eq!(round_money(d("500.005")), d("500.01"));
        assert_eq!(round_money(d("-500.005")), d("-500.01"));
        assert_eq!(round_money(d("200.004")), d("200.00"));
    }
}
