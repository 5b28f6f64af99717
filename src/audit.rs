// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Append-only audit log and per-user notifications.

use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::models::{AuditEntry, AuditStatus, Notification, RecordId, User};

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_log(&self, entry: &AuditEntry) -> StoreResult<()>;
    async fn push_notification(&self, notification: &Notification) -> StoreResult<()>;
    async fn unread_count(&self, user_id: RecordId) -> StoreResult<u64>;
    /// Newest first.
    async fn notifications(&self, user_id: RecordId) -> StoreResult<Vec<Notification>>;
    /// Returns how many notifications flipped to read.
    async fn mark_all_read(&self, user_id: RecordId) -> StoreResult<u64>;
}

/// Which of the two independent writes of [`AuditSink::record`] landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub logged: bool,
    pub notified: bool,
}

#[derive(Clone)]
pub struct AuditSink {
    store: Arc<dyn AuditStore>,
}

impl AuditSink {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Writes a SUCCESS log entry and an unread notification for `actor`.
    /// The writes are best-effort and independent of each other.
    pub async fn record(&self, actor: &User, action: &str, target: &str) -> Delivery {
        let details = format!("{} {} {}", actor.username, action, target);
        let now = Utc::now();
        let entry = AuditEntry {
            id: RecordId::new(),
            timestamp: now,
            details: details.clone(),
            status: AuditStatus::Success,
        };
        let notification = Notification {
            id: RecordId::new(),
            user_id: actor.id,
            message: details,
            is_read: false,
            created_at: now,
        };

        let (logged, notified) = tokio::join!(
            self.store.append_log(&entry),
            self.store.push_notification(&notification)
        );
        if let Err(err) = &logged {
            tracing::warn!(details = %entry.details, "audit log write failed: {err}");
        }
        if let Err(err) = &notified {
            tracing::warn!(user = %actor.username, "notification write failed: {err}");
        }
        Delivery {
            logged: logged.is_ok(),
            notified: notified.is_ok(),
        }
    }

    /// Writes an ERROR log entry only; failed mutations do not notify.
    pub async fn record_failure(
        &self,
        actor: &User,
        action: &str,
        target: &str,
        error: &dyn fmt::Display,
    ) -> bool {
        let entry = AuditEntry {
            id: RecordId::new(),
            timestamp: Utc::now(),
            details: format!("{} failed to {} {}: {}", actor.username, action, target, error),
            status: AuditStatus::Error,
        };
        match self.store.append_log(&entry).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(details = %entry.details, "audit log write failed: {err}");
                false
            }
        }
    }

    pub async fn unread_count(&self, user_id: RecordId) -> StoreResult<u64> {
        self.store.unread_count(user_id).await
    }

    pub async fn notifications(&self, user_id: RecordId) -> StoreResult<Vec<Notification>> {
        self.store.notifications(user_id).await
    }

    pub async fn mark_all_read(&self, user_id: RecordId) -> StoreResult<u64> {
        self.store.mark_all_read(user_id).await
    }
}
