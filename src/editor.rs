// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Mutations issued from a list view.
//!
//! Every successful create, update or delete pushes one audit entry and one
//! notification for the session user, refreshes the unread badge, and starts
//! a refresh of the owning controller. Failed store calls leave an ERROR log
//! entry and no notification. A CSV upload is summarized by one entry.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::audit::AuditSink;
use crate::controller::ListController;
use crate::csv_io::{ImportSummary, ParsedCsv, import_records};
use crate::error::{EditError, StoreResult};
use crate::forms::{CategoryForm, RecordForm};
use crate::models::{Category, Record, User};
use crate::settings::AppSettings;
use crate::store::{Entity, Gateway};

/// Per-session collaborators shared by every open view.
pub struct ViewContext {
    pub session: User,
    pub sink: AuditSink,
    badge: watch::Sender<u64>,
}

impl ViewContext {
    pub fn new(session: User, sink: AuditSink) -> Self {
        let (badge, _rx) = watch::channel(0);
        Self {
            session,
            sink,
            badge,
        }
    }

    /// Unread notification count, updated by [`ViewContext::refresh_badge`].
    pub fn badge(&self) -> watch::Receiver<u64> {
        self.badge.subscribe()
    }

    pub fn unread(&self) -> u64 {
        *self.badge.borrow()
    }

    /// Re-reads the unread count. On failure the badge keeps its last value.
    pub async fn refresh_badge(&self) -> u64 {
        match self.sink.unread_count(self.session.id).await {
            Ok(n) => {
                self.badge.send_replace(n);
                n
            }
            Err(err) => {
                tracing::warn!(user = %self.session.username, "unread count failed: {err}");
                self.unread()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    Edit,
    Delete,
}

impl Action {
    fn past(self) -> &'static str {
        match self {
            Action::Add => "added",
            Action::Edit => "edited",
            Action::Delete => "deleted",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

/// A list controller plus the mutations its view can issue.
pub struct Editor<E: Entity> {
    controller: ListController<E>,
    ctx: Arc<ViewContext>,
}

impl<E: Entity> Editor<E> {
    pub fn new(controller: ListController<E>, ctx: Arc<ViewContext>) -> Self {
        Self { controller, ctx }
    }

    pub fn controller(&self) -> &ListController<E> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ListController<E> {
        &mut self.controller
    }

    pub fn context(&self) -> &Arc<ViewContext> {
        &self.ctx
    }

    /// Opens the view afresh: search and page state are dropped and the
    /// page size is re-read from `settings`.
    pub fn reopen(&mut self, settings: &AppSettings) -> JoinHandle<()> {
        let gateway = Arc::clone(self.controller.gateway());
        self.controller = ListController::from_settings(gateway, settings);
        self.controller.refresh()
    }

    fn target(&self, item: &E) -> String {
        format!(
            "{} {}",
            self.controller.gateway().collection().label(),
            item.describe()
        )
    }

    pub async fn create(&mut self, item: E) -> Result<JoinHandle<()>, EditError> {
        let gateway = Arc::clone(self.controller.gateway());
        let outcome = gateway.insert(&item).await;
        self.finish(Action::Add, &item, outcome).await
    }

    pub async fn update(&mut self, item: E) -> Result<JoinHandle<()>, EditError> {
        let gateway = Arc::clone(self.controller.gateway());
        let outcome = gateway.update(&item).await;
        self.finish(Action::Edit, &item, outcome).await
    }

    pub async fn delete(&mut self, item: &E) -> Result<JoinHandle<()>, EditError> {
        let gateway = Arc::clone(self.controller.gateway());
        let outcome = gateway.delete(item.id()).await;
        self.finish(Action::Delete, item, outcome).await
    }

    async fn finish(
        &mut self,
        action: Action,
        item: &E,
        outcome: StoreResult<()>,
    ) -> Result<JoinHandle<()>, EditError> {
        let target = self.target(item);
        let session = &self.ctx.session;
        match outcome {
            Ok(()) => {
                tracing::info!(user = %session.username, id = %item.id(), "{} {}", action.past(), target);
                self.ctx.sink.record(session, action.past(), &target).await;
                self.ctx.refresh_badge().await;
                self.controller.notify_mutated();
                Ok(self.controller.refresh())
            }
            Err(err) => {
                tracing::warn!(user = %session.username, id = %item.id(), "failed to {} {}: {err}", action.verb(), target);
                self.ctx
                    .sink
                    .record_failure(session, action.verb(), &target, &err)
                    .await;
                Err(err.into())
            }
        }
    }
}

impl Editor<Record> {
    /// Validates against the current categories of the matching kind, then
    /// inserts.
    pub async fn add_record(
        &mut self,
        form: &RecordForm,
        categories: &dyn Gateway<Category>,
    ) -> Result<JoinHandle<()>, EditError> {
        let known = categories.find_all().await?;
        let record = form.build(&known)?;
        self.create(record).await
    }

    pub async fn edit_record(
        &mut self,
        existing: &Record,
        form: &RecordForm,
        categories: &dyn Gateway<Category>,
    ) -> Result<JoinHandle<()>, EditError> {
        let known = categories.find_all().await?;
        let record = form.apply_to(existing, &known)?;
        self.update(record).await
    }

    /// Bulk-inserts parsed CSV rows, then pushes a single audit entry and
    /// notification summarizing the upload and refreshes the view.
    pub async fn import(
        &mut self,
        parsed: &ParsedCsv,
        progress: Option<&(dyn Fn(f32) + Send + Sync)>,
    ) -> (ImportSummary, JoinHandle<()>) {
        let gateway = Arc::clone(self.controller.gateway());
        let summary = import_records(gateway.as_ref(), &parsed.records, progress).await;
        let target = format!(
            "{} {} record(s) ({} failed, {} skipped)",
            gateway.collection().label(),
            summary.inserted,
            summary.failed,
            parsed.skipped
        );
        let session = &self.ctx.session;
        tracing::info!(user = %session.username, "bulk uploaded {}", target);
        self.ctx.sink.record(session, "bulk uploaded", &target).await;
        self.ctx.refresh_badge().await;
        self.controller.notify_mutated();
        (summary, self.controller.refresh())
    }
}

impl Editor<Category> {
    pub async fn add_category(&mut self, form: &CategoryForm) -> Result<JoinHandle<()>, EditError> {
        let category = form.build()?;
        self.create(category).await
    }

    pub async fn edit_category(
        &mut self,
        existing: &Category,
        form: &CategoryForm,
    ) -> Result<JoinHandle<()>, EditError> {
        let category = form.apply_to(existing)?;
        self.update(category).await
    }
}
