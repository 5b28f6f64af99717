// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::{Regex, RegexBuilder};
use rusqlite::{Connection, OptionalExtension, Params, Row, params, params_from_iter};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::marker::PhantomData;

use super::{Collection, Entity, Gateway, LedgerGateway};
use crate::audit::AuditStore;
use crate::db::Store;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    AuditEntry, Category, Month, MonthlyTotal, Notification, Record, RecordId, User,
};

const RECORD_COLUMNS: &[&str] = &[
    "id",
    "category",
    "month",
    "year",
    "amount",
    "created_at",
    "updated_at",
];
const INCOME_CATEGORY_COLUMNS: &[&str] = &["id", "income_category", "created_at", "updated_at"];
const EXPENSE_CATEGORY_COLUMNS: &[&str] = &["id", "expense_category", "created_at", "updated_at"];

/// Column mapping between an entity and its table. All columns are TEXT.
pub trait SqlRow: Entity {
    fn columns(collection: Collection) -> &'static [&'static str];
    /// Text fields matched by `search_by_text`.
    fn search_text(&self) -> Vec<&str>;
    fn from_row(row: &Row<'_>, collection: Collection) -> StoreResult<Self>;
    /// Values in `columns` order.
    fn values(&self) -> Vec<String>;
}

fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(collection: Collection, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| corrupt(collection, format!("timestamp '{}': {}", raw, err)))
}

fn parse_id(collection: Collection, raw: &str) -> StoreResult<RecordId> {
    raw.parse().map_err(|err| corrupt(collection, format!("{}", err)))
}

fn parse_amount(collection: Collection, raw: &str) -> StoreResult<Decimal> {
    raw.parse::<Decimal>()
        .map_err(|err| corrupt(collection, format!("amount '{}': {}", raw, err)))
}

fn corrupt(collection: Collection, reason: String) -> StoreError {
    StoreError::Corrupt {
        collection: collection.name(),
        reason,
    }
}

/// Case-insensitive literal substring matcher. Folds Unicode case on both
/// sides, which SQLite's `lower()` and `LIKE` do not.
fn text_matcher(collection: Collection, pattern: &str) -> StoreResult<Regex> {
    RegexBuilder::new(&regex::escape(pattern))
        .case_insensitive(true)
        .build()
        .map_err(|err| StoreError::Query {
            collection: collection.name(),
            reason: err.to_string(),
        })
}

impl SqlRow for Record {
    fn columns(_collection: Collection) -> &'static [&'static str] {
        RECORD_COLUMNS
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.category.as_str(), self.month.label()]
    }

    fn from_row(row: &Row<'_>, collection: Collection) -> StoreResult<Self> {
        let id: String = row.get(0)?;
        let category: String = row.get(1)?;
        let month: String = row.get(2)?;
        let year: String = row.get(3)?;
        let amount: String = row.get(4)?;
        let created_at: String = row.get(5)?;
        let updated_at: String = row.get(6)?;
        Ok(Record {
            id: parse_id(collection, &id)?,
            category,
            month: month
                .parse::<Month>()
                .map_err(|err| corrupt(collection, err.to_string()))?,
            year,
            amount: parse_amount(collection, &amount)?,
            created_at: parse_ts(collection, &created_at)?,
            updated_at: parse_ts(collection, &updated_at)?,
        })
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.category.clone(),
            self.month.label().to_string(),
            self.year.clone(),
            self.amount.to_string(),
            fmt_ts(&self.created_at),
            fmt_ts(&self.updated_at),
        ]
    }
}

impl SqlRow for Category {
    fn columns(collection: Collection) -> &'static [&'static str] {
        match collection {
            Collection::ExpenseDetails => EXPENSE_CATEGORY_COLUMNS,
            _ => INCOME_CATEGORY_COLUMNS,
        }
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn from_row(row: &Row<'_>, collection: Collection) -> StoreResult<Self> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let created_at: String = row.get(2)?;
        let updated_at: String = row.get(3)?;
        Ok(Category {
            id: parse_id(collection, &id)?,
            name,
            created_at: parse_ts(collection, &created_at)?,
            updated_at: parse_ts(collection, &updated_at)?,
        })
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            fmt_ts(&self.created_at),
            fmt_ts(&self.updated_at),
        ]
    }
}

fn query_rows<E: SqlRow, P: Params>(
    conn: &Connection,
    collection: Collection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<E>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        out.push(E::from_row(r, collection)?);
    }
    Ok(out)
}

/// SQLite-backed gateway for one collection.
pub struct SqliteGateway<E> {
    store: Store,
    collection: Collection,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SqliteGateway<E> {
    fn with_collection(store: Store, collection: Collection) -> Self {
        Self {
            store,
            collection,
            _entity: PhantomData,
        }
    }
}

impl SqliteGateway<Record> {
    pub fn income(store: Store) -> Self {
        Self::with_collection(store, Collection::Income)
    }

    pub fn expenses(store: Store) -> Self {
        Self::with_collection(store, Collection::Expenses)
    }
}

impl SqliteGateway<Category> {
    pub fn income_categories(store: Store) -> Self {
        Self::with_collection(store, Collection::IncomeDetails)
    }

    pub fn expense_categories(store: Store) -> Self {
        Self::with_collection(store, Collection::ExpenseDetails)
    }
}

impl<E: SqlRow> SqliteGateway<E> {
    fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {}",
            E::columns(self.collection).join(", "),
            self.collection.name()
        )
    }
}

#[async_trait]
impl<E: SqlRow> Gateway<E> for SqliteGateway<E> {
    fn collection(&self) -> Collection {
        self.collection
    }

    async fn insert(&self, item: &E) -> StoreResult<()> {
        let collection = self.collection;
        let cols = E::columns(collection);
        let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {}({}) VALUES ({})",
            collection.name(),
            cols.join(", "),
            placeholders.join(", ")
        );
        let values = item.values();
        self.store
            .call(move |conn| {
                conn.execute(&sql, params_from_iter(values.iter()))?;
                Ok(())
            })
            .await
    }

    async fn find_by_id(&self, id: RecordId) -> StoreResult<E> {
        let collection = self.collection;
        let sql = format!("{} WHERE id=?1", self.select_sql());
        self.store
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let found = stmt
                    .query_row(params![id.to_string()], |r| {
                        Ok(E::from_row(r, collection))
                    })
                    .optional()?;
                match found {
                    Some(item) => item,
                    None => Err(StoreError::NotFound {
                        collection: collection.name(),
                        id,
                    }),
                }
            })
            .await
    }

    async fn update(&self, item: &E) -> StoreResult<()> {
        let collection = self.collection;
        let cols = E::columns(collection);
        let assignments: Vec<String> = cols
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| format!("{}=?{}", c, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id=?1",
            collection.name(),
            assignments.join(", ")
        );
        let id = item.id();
        let values = item.values();
        self.store
            .call(move |conn| {
                let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
                if changed == 0 {
                    return Err(StoreError::NotFound {
                        collection: collection.name(),
                        id,
                    });
                }
                Ok(())
            })
            .await
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        let collection = self.collection;
        let sql = format!("DELETE FROM {} WHERE id=?1", collection.name());
        self.store
            .call(move |conn| {
                let changed = conn.execute(&sql, params![id.to_string()])?;
                if changed == 0 {
                    return Err(StoreError::NotFound {
                        collection: collection.name(),
                        id,
                    });
                }
                Ok(())
            })
            .await
    }

    async fn find_page(&self, skip: usize, limit: usize) -> StoreResult<Vec<E>> {
        let collection = self.collection;
        let sql = format!("{} ORDER BY rowid LIMIT ?1 OFFSET ?2", self.select_sql());
        self.store
            .call(move |conn| {
                query_rows(conn, collection, &sql, params![limit as i64, skip as i64])
            })
            .await
    }

    async fn count(&self) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.collection.name());
        self.store
            .call(move |conn| {
                let n: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
                Ok(n.max(0) as u64)
            })
            .await
    }

    async fn search_by_text(&self, pattern: &str) -> StoreResult<Vec<E>> {
        if pattern.trim().is_empty() {
            return Ok(Vec::new());
        }
        let collection = self.collection;
        let matcher = text_matcher(collection, pattern.trim())?;
        let sql = format!("{} ORDER BY rowid", self.select_sql());
        self.store
            .call(move |conn| {
                let rows: Vec<E> = query_rows(conn, collection, &sql, [])?;
                Ok(rows
                    .into_iter()
                    .filter(|row| row.search_text().iter().any(|t| matcher.is_match(t)))
                    .collect())
            })
            .await
    }

    async fn find_all(&self) -> StoreResult<Vec<E>> {
        let collection = self.collection;
        let sql = format!("{} ORDER BY rowid", self.select_sql());
        self.store
            .call(move |conn| query_rows(conn, collection, &sql, []))
            .await
    }
}

fn sum_amounts<P: Params>(
    conn: &Connection,
    collection: Collection,
    sql: &str,
    params: P,
) -> StoreResult<Decimal> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let raw: String = r.get(0)?;
        total += parse_amount(collection, &raw)?;
    }
    Ok(total)
}

#[async_trait]
impl LedgerGateway for SqliteGateway<Record> {
    async fn sum_by_month(&self, year: &str, month: Month) -> StoreResult<MonthlyTotal> {
        let collection = self.collection;
        let sql = format!(
            "SELECT amount FROM {} WHERE year=?1 AND month=?2",
            collection.name()
        );
        let year = year.trim().to_string();
        let total = self
            .store
            .call(move |conn| {
                sum_amounts(conn, collection, &sql, params![year, month.label()])
            })
            .await?;
        Ok(MonthlyTotal { month, total })
    }

    async fn sum_by_year(&self, year: &str) -> StoreResult<Decimal> {
        let collection = self.collection;
        let sql = format!("SELECT amount FROM {} WHERE year=?1", collection.name());
        let year = year.trim().to_string();
        self.store
            .call(move |conn| sum_amounts(conn, collection, &sql, params![year]))
            .await
    }

    async fn totals_by_category(&self, year: &str) -> StoreResult<Vec<(String, Decimal)>> {
        let collection = self.collection;
        let sql = format!(
            "SELECT category, amount FROM {} WHERE year=?1",
            collection.name()
        );
        let year = year.trim().to_string();
        self.store
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params![year])?;
                let mut agg: HashMap<String, Decimal> = HashMap::new();
                while let Some(r) = rows.next()? {
                    let category: String = r.get(0)?;
                    let raw: String = r.get(1)?;
                    *agg.entry(category).or_insert(Decimal::ZERO) +=
                        parse_amount(collection, &raw)?;
                }
                let mut items: Vec<_> = agg.into_iter().collect();
                items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                Ok(items)
            })
            .await
    }
}

/// Audit log and notification tables.
#[derive(Clone)]
pub struct SqliteAuditStore {
    store: Store,
}

impl SqliteAuditStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append_log(&self, entry: &AuditEntry) -> StoreResult<()> {
        let entry = entry.clone();
        self.store
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO logs(id, timestamp, details, status) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        entry.id.to_string(),
                        fmt_ts(&entry.timestamp),
                        entry.details,
                        entry.status.as_str()
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn push_notification(&self, notification: &Notification) -> StoreResult<()> {
        let n = notification.clone();
        self.store
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO notifications(id, user_id, message, is_read, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        n.id.to_string(),
                        n.user_id.to_string(),
                        n.message,
                        n.is_read,
                        fmt_ts(&n.created_at)
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn unread_count(&self, user_id: RecordId) -> StoreResult<u64> {
        self.store
            .call(move |conn| {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM notifications WHERE user_id=?1 AND is_read=0",
                    params![user_id.to_string()],
                    |r| r.get(0),
                )?;
                Ok(n.max(0) as u64)
            })
            .await
    }

    async fn notifications(&self, user_id: RecordId) -> StoreResult<Vec<Notification>> {
        let collection = Collection::Notifications;
        self.store
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, message, is_read, created_at FROM notifications
                     WHERE user_id=?1 ORDER BY created_at DESC, rowid DESC",
                )?;
                let mut rows = stmt.query(params![user_id.to_string()])?;
                let mut out = Vec::new();
                while let Some(r) = rows.next()? {
                    let id: String = r.get(0)?;
                    let created_at: String = r.get(3)?;
                    out.push(Notification {
                        id: parse_id(collection, &id)?,
                        user_id,
                        message: r.get(1)?,
                        is_read: r.get(2)?,
                        created_at: parse_ts(collection, &created_at)?,
                    });
                }
                Ok(out)
            })
            .await
    }

    async fn mark_all_read(&self, user_id: RecordId) -> StoreResult<u64> {
        self.store
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE notifications SET is_read=1 WHERE user_id=?1 AND is_read=0",
                    params![user_id.to_string()],
                )?;
                Ok(changed as u64)
            })
            .await
    }
}

/// Looks the user up by name, creating it on first use.
pub async fn ensure_user(store: &Store, username: &str) -> StoreResult<User> {
    let username = username.trim().to_string();
    let collection = Collection::Users;
    store
        .call(move |conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE username=?1",
                    params![username],
                    |r| r.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                return Ok(User {
                    id: parse_id(collection, &id)?,
                    username,
                });
            }
            let user = User {
                id: RecordId::new(),
                username,
            };
            conn.execute(
                "INSERT INTO users(id, username, created_at) VALUES (?1, ?2, ?3)",
                params![user.id.to_string(), user.username, fmt_ts(&Utc::now())],
            )?;
            Ok(user)
        })
        .await
}

pub async fn find_user(store: &Store, id: RecordId) -> StoreResult<User> {
    let collection = Collection::Users;
    store
        .call(move |conn| {
            let name: Option<String> = conn
                .query_row(
                    "SELECT username FROM users WHERE id=?1",
                    params![id.to_string()],
                    |r| r.get(0),
                )
                .optional()?;
            name.map(|username| User { id, username })
                .ok_or(StoreError::NotFound {
                    collection: collection.name(),
                    id,
                })
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::text_matcher;
    use crate::store::Collection;

    #[test]
    fn matcher_is_literal_and_folds_unicode_case() {
        let m = text_matcher(Collection::Expenses, "50%_off").unwrap();
        assert!(m.is_match("Deal 50%_OFF today"));
        assert!(!m.is_match("50 off"));

        let m = text_matcher(Collection::Expenses, "a.b").unwrap();
        assert!(!m.is_match("axb"));

        let m = text_matcher(Collection::Expenses, "épicerie").unwrap();
        assert!(m.is_match("Épicerie fine"));
        assert!(m.is_match("ÉPICERIE"));
    }
}
