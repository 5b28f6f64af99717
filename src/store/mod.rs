// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Record store gateway.
//!
//! Every collection the views page through is reached through [`Gateway`],
//! typed by the entity it holds. Income and expense records additionally
//! expose the aggregation queries of [`LedgerGateway`]. Gateways are picked
//! when a view is constructed; nothing downstream dispatches on collection
//! names.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;

use crate::error::StoreResult;
use crate::models::{Category, Month, MonthlyTotal, Record, RecordId};

mod sqlite;

pub use sqlite::{SqliteAuditStore, SqliteGateway, ensure_user, find_user};

/// Fixed collection names of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Income,
    Expenses,
    IncomeDetails,
    ExpenseDetails,
    Logs,
    Notifications,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Income => "income",
            Collection::Expenses => "expenses",
            Collection::IncomeDetails => "income_details",
            Collection::ExpenseDetails => "expense_details",
            Collection::Logs => "logs",
            Collection::Notifications => "notifications",
        }
    }

    /// Human label used in notifications and audit lines.
    pub fn label(self) -> &'static str {
        match self {
            Collection::Users => "User",
            Collection::Income => "Income",
            Collection::Expenses => "Expense",
            Collection::IncomeDetails => "Income Category",
            Collection::ExpenseDetails => "Expense Category",
            Collection::Logs => "Log",
            Collection::Notifications => "Notification",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Anything a list view can page through and edit.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> RecordId;
    /// Short description used as the target of audit and notification text.
    fn describe(&self) -> String;
}

impl Entity for Record {
    fn id(&self) -> RecordId {
        self.id
    }

    fn describe(&self) -> String {
        self.category.clone()
    }
}

impl Entity for Category {
    fn id(&self) -> RecordId {
        self.id
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

#[async_trait]
pub trait Gateway<E: Entity>: Send + Sync {
    fn collection(&self) -> Collection;

    async fn insert(&self, item: &E) -> StoreResult<()>;

    /// Returns `StoreError::NotFound` when no document has `id`.
    async fn find_by_id(&self, id: RecordId) -> StoreResult<E>;

    /// Full replace keyed by the item's id.
    async fn update(&self, item: &E) -> StoreResult<()>;

    async fn delete(&self, id: RecordId) -> StoreResult<()>;

    async fn find_page(&self, skip: usize, limit: usize) -> StoreResult<Vec<E>>;

    async fn count(&self) -> StoreResult<u64>;

    /// Case-insensitive substring match over the collection's text fields.
    async fn search_by_text(&self, pattern: &str) -> StoreResult<Vec<E>>;

    async fn find_all(&self) -> StoreResult<Vec<E>>;
}

#[async_trait]
pub trait LedgerGateway: Gateway<Record> {
    /// Zero total, not an error, when nothing matches.
    async fn sum_by_month(&self, year: &str, month: Month) -> StoreResult<MonthlyTotal>;

    async fn sum_by_year(&self, year: &str) -> StoreResult<Decimal>;

    /// Per-category totals for `year`, largest first.
    async fn totals_by_category(&self, year: &str) -> StoreResult<Vec<(String, Decimal)>>;
}
