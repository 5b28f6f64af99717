// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use regex::RegexBuilder;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fynance::audit::{AuditSink, AuditStore};
use fynance::editor::ViewContext;
use fynance::error::{StoreError, StoreResult};
use fynance::models::{
    AuditEntry, Category, Month, MonthlyTotal, Notification, Record, RecordId, User,
};
use fynance::store::{Collection, Entity, Gateway, LedgerGateway};

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn record(category: &str, month: Month, year: &str, amount: &str) -> Record {
    let now = Utc::now();
    Record {
        id: RecordId::new(),
        category: category.to_string(),
        month,
        year: year.to_string(),
        amount: dec(amount),
        created_at: now,
        updated_at: now,
    }
}

pub fn category(name: &str) -> Category {
    let now = Utc::now();
    Category {
        id: RecordId::new(),
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn user(name: &str) -> User {
    User {
        id: RecordId::new(),
        username: name.to_string(),
    }
}

/// Text fields the fake matches searches against.
pub trait Haystack {
    fn haystack(&self) -> Vec<String>;
}

impl Haystack for Record {
    fn haystack(&self) -> Vec<String> {
        vec![self.category.clone(), self.month.label().to_string()]
    }
}

impl Haystack for Category {
    fn haystack(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

/// In-memory gateway with scripted latency and failure injection.
pub struct FakeGateway<E> {
    collection: Collection,
    items: Mutex<Vec<E>>,
    page_delays: Mutex<HashMap<usize, Duration>>,
    search_delay: Mutex<Option<Duration>>,
    failing: AtomicBool,
    failing_months: Mutex<HashSet<Month>>,
    search_calls: AtomicUsize,
}

impl<E: Entity + Haystack> FakeGateway<E> {
    pub fn new(collection: Collection, items: Vec<E>) -> Arc<Self> {
        Arc::new(Self {
            collection,
            items: Mutex::new(items),
            page_delays: Mutex::new(HashMap::new()),
            search_delay: Mutex::new(None),
            failing: AtomicBool::new(false),
            failing_months: Mutex::new(HashSet::new()),
            search_calls: AtomicUsize::new(0),
        })
    }

    /// `find_page` calls with this `skip` sleep for `delay` first.
    pub fn delay_page(&self, skip: usize, delay: Duration) {
        self.page_delays.lock().unwrap().insert(skip, delay);
    }

    pub fn delay_search(&self, delay: Duration) {
        *self.search_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fail_month(&self, month: Month) {
        self.failing_months.lock().unwrap().insert(month);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity("fake store offline".into()));
        }
        Ok(())
    }

    fn not_found(&self, id: RecordId) -> StoreError {
        StoreError::NotFound {
            collection: self.collection.name(),
            id,
        }
    }
}

pub fn records(n: usize) -> Vec<Record> {
    (1..=n)
        .map(|i| record(&format!("Item {:02}", i), Month::Jan, "2024", "1"))
        .collect()
}

#[async_trait]
impl<E: Entity + Haystack> Gateway<E> for FakeGateway<E> {
    fn collection(&self) -> Collection {
        self.collection
    }

    async fn insert(&self, item: &E) -> StoreResult<()> {
        self.check()?;
        self.items.lock().unwrap().push(item.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: RecordId) -> StoreResult<E> {
        self.check()?;
        let items = self.items.lock().unwrap();
        items
            .iter()
            .find(|e| e.id() == id)
            .cloned()
            .ok_or_else(|| self.not_found(id))
    }

    async fn update(&self, item: &E) -> StoreResult<()> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        match items.iter_mut().find(|e| e.id() == item.id()) {
            Some(slot) => {
                *slot = item.clone();
                Ok(())
            }
            None => Err(self.not_found(item.id())),
        }
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|e| e.id() != id);
        if items.len() == before {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    async fn find_page(&self, skip: usize, limit: usize) -> StoreResult<Vec<E>> {
        let delay = self.page_delays.lock().unwrap().get(&skip).copied();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        self.check()?;
        let items = self.items.lock().unwrap();
        Ok(items.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        self.check()?;
        Ok(self.items.lock().unwrap().len() as u64)
    }

    async fn search_by_text(&self, pattern: &str) -> StoreResult<Vec<E>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.search_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        self.check()?;
        let re = RegexBuilder::new(&regex::escape(pattern))
            .case_insensitive(true)
            .build()
            .unwrap();
        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .filter(|e| e.haystack().iter().any(|h| re.is_match(h)))
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> StoreResult<Vec<E>> {
        self.check()?;
        Ok(self.items.lock().unwrap().clone())
    }
}

#[async_trait]
impl LedgerGateway for FakeGateway<Record> {
    async fn sum_by_month(&self, year: &str, month: Month) -> StoreResult<MonthlyTotal> {
        self.check()?;
        if self.failing_months.lock().unwrap().contains(&month) {
            return Err(StoreError::Connectivity(format!("{month} unavailable")));
        }
        let items = self.items.lock().unwrap();
        let total = items
            .iter()
            .filter(|r| r.year == year && r.month == month)
            .map(|r| r.amount)
            .sum();
        Ok(MonthlyTotal { month, total })
    }

    async fn sum_by_year(&self, year: &str) -> StoreResult<Decimal> {
        self.check()?;
        let items = self.items.lock().unwrap();
        Ok(items.iter().filter(|r| r.year == year).map(|r| r.amount).sum())
    }

    async fn totals_by_category(&self, year: &str) -> StoreResult<Vec<(String, Decimal)>> {
        self.check()?;
        let items = self.items.lock().unwrap();
        let mut agg: HashMap<String, Decimal> = HashMap::new();
        for r in items.iter().filter(|r| r.year == year) {
            *agg.entry(r.category.clone()).or_default() += r.amount;
        }
        let mut out: Vec<_> = agg.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(out)
    }
}

/// Audit store that keeps everything in memory; either write can be made to
/// fail independently.
#[derive(Default)]
pub struct FakeAuditStore {
    pub logs: Mutex<Vec<AuditEntry>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub fail_log: AtomicBool,
    pub fail_notify: AtomicBool,
}

impl FakeAuditStore {
    pub fn log_details(&self) -> Vec<String> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.details.clone())
            .collect()
    }
}

#[async_trait]
impl AuditStore for FakeAuditStore {
    async fn append_log(&self, entry: &AuditEntry) -> StoreResult<()> {
        if self.fail_log.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity("logs offline".into()));
        }
        self.logs.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn push_notification(&self, notification: &Notification) -> StoreResult<()> {
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity("notifications offline".into()));
        }
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn unread_count(&self, user_id: RecordId) -> StoreResult<u64> {
        let n = self.notifications.lock().unwrap();
        Ok(n.iter().filter(|x| x.user_id == user_id && !x.is_read).count() as u64)
    }

    async fn notifications(&self, user_id: RecordId) -> StoreResult<Vec<Notification>> {
        let n = self.notifications.lock().unwrap();
        Ok(n.iter().rev().filter(|x| x.user_id == user_id).cloned().collect())
    }

    async fn mark_all_read(&self, user_id: RecordId) -> StoreResult<u64> {
        let mut n = self.notifications.lock().unwrap();
        let mut changed = 0;
        for x in n.iter_mut().filter(|x| x.user_id == user_id && !x.is_read) {
            x.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

pub fn context(username: &str) -> (Arc<ViewContext>, Arc<FakeAuditStore>) {
    let audit = Arc::new(FakeAuditStore::default());
    let sink = AuditSink::new(audit.clone());
    (Arc::new(ViewContext::new(user(username), sink)), audit)
}
