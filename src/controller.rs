// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Paginated, searchable list controller.
//!
//! One controller backs one open list view. It keeps the caller's intent
//! (mode, query, requested page) and publishes the committed result of
//! background loads as a [`View`] snapshot through a `watch` channel.
//!
//! Every [`ListController::refresh`] draws a token from a generation
//! counter before spawning its load. A load commits only while its token is
//! still the latest one issued, so a slow load that was overtaken by a newer
//! page change or search is dropped when it finally returns.
//!
//! Browse mode pages at the store with skip/limit. Search mode materializes
//! every hit once and pages over that list in memory; the list is reused for
//! page changes until the query changes or [`ListController::notify_mutated`]
//! invalidates it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{ControllerError, StoreError};
use crate::settings::AppSettings;
use crate::store::{Entity, Gateway};

/// Receives load progress in `[0, 1]`.
pub type ProgressSink = Arc<dyn Fn(f32) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Search,
}

/// `ceil(total / page_size)`; an empty result set has zero pages.
pub fn total_pages(total: u64, page_size: usize) -> usize {
    let size = page_size.max(1) as u64;
    total.div_ceil(size) as usize
}

/// Back/forward enablement for `page` out of `total_pages`.
pub fn page_bounds(page: usize, total_pages: usize) -> (bool, bool) {
    (page > 1, page < total_pages)
}

/// Committed state of a list view. Replaced as a whole on every commit.
#[derive(Debug, Clone)]
pub struct View<E> {
    pub mode: Mode,
    pub query: String,
    pub rows: Vec<E>,
    pub total_count: u64,
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub can_prev: bool,
    pub can_next: bool,
    /// Set by a failed load; the rest of the view is the last good commit.
    pub failure: Option<String>,
    /// Token of the refresh that produced this view, 0 before the first.
    pub generation: u64,
    search_hits: Option<Arc<Vec<E>>>,
    hits_epoch: u64,
}

impl<E> View<E> {
    fn initial(page_size: usize) -> Self {
        Self {
            mode: Mode::Browse,
            query: String::new(),
            rows: Vec::new(),
            total_count: 0,
            current_page: 1,
            page_size,
            total_pages: 0,
            can_prev: false,
            can_next: false,
            failure: None,
            generation: 0,
            search_hits: None,
            hits_epoch: 0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.generation > 0
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.current_page, self.total_pages)
    }
}

struct Request<E> {
    token: u64,
    mode: Mode,
    query: String,
    page: usize,
    page_size: usize,
    epoch: u64,
    cached_hits: Option<Arc<Vec<E>>>,
}

struct Loaded<E> {
    rows: Vec<E>,
    total: u64,
    hits: Option<Arc<Vec<E>>>,
}

pub struct ListController<E: Entity> {
    gateway: Arc<dyn Gateway<E>>,
    page_size: usize,
    mode: Mode,
    query: String,
    page: usize,
    // bumped whenever cached search hits must not be reused
    epoch: u64,
    generation: Arc<AtomicU64>,
    view: Arc<watch::Sender<View<E>>>,
}

impl<E: Entity> ListController<E> {
    pub fn new(gateway: Arc<dyn Gateway<E>>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let (tx, _rx) = watch::channel(View::initial(page_size));
        Self {
            gateway,
            page_size,
            mode: Mode::Browse,
            query: String::new(),
            page: 1,
            epoch: 0,
            generation: Arc::new(AtomicU64::new(0)),
            view: Arc::new(tx),
        }
    }

    /// Page size is read from settings once, at construction.
    pub fn from_settings(gateway: Arc<dyn Gateway<E>>, settings: &AppSettings) -> Self {
        Self::new(gateway, settings.page_size())
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway<E>> {
        &self.gateway
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The requested page, which may be ahead of the committed one while a
    /// load is in flight.
    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn snapshot(&self) -> View<E> {
        self.view.borrow().clone()
    }

    /// Receivers are notified after every commit.
    pub fn subscribe(&self) -> watch::Receiver<View<E>> {
        self.view.subscribe()
    }

    /// Starts a background load for the current intent. Must be called from
    /// within a tokio runtime. The handle may be awaited or dropped.
    pub fn refresh(&self) -> JoinHandle<()> {
        self.refresh_with_progress(None)
    }

    pub fn refresh_with_progress(&self, progress: Option<ProgressSink>) -> JoinHandle<()> {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cached_hits = {
            let committed = self.view.borrow();
            match (&committed.search_hits, self.mode) {
                (Some(hits), Mode::Search)
                    if committed.query == self.query && committed.hits_epoch == self.epoch =>
                {
                    Some(Arc::clone(hits))
                }
                _ => None,
            }
        };
        let req = Request {
            token,
            mode: self.mode,
            query: self.query.clone(),
            page: self.page,
            page_size: self.page_size,
            epoch: self.epoch,
            cached_hits,
        };
        tracing::debug!(
            collection = %self.gateway.collection(),
            token,
            page = req.page,
            mode = ?req.mode,
            "refresh started"
        );

        let gateway = Arc::clone(&self.gateway);
        let generation = Arc::clone(&self.generation);
        let view = Arc::clone(&self.view);
        tokio::spawn(async move {
            let outcome = load(gateway.as_ref(), &req, progress.as_deref()).await;
            commit(&view, &generation, gateway.as_ref(), req, outcome);
        })
    }

    /// Moves to `page` if it is reachable from the committed page count.
    pub fn go_to_page(&mut self, page: usize) -> Result<JoinHandle<()>, ControllerError> {
        let last = self.view.borrow().total_pages.max(1);
        if page == 0 || page > last {
            return Err(ControllerError::PageOutOfRange { page, last });
        }
        self.page = page;
        Ok(self.refresh())
    }

    /// Forward affordance; `None` when disabled.
    pub fn next_page(&mut self) -> Option<JoinHandle<()>> {
        let total = self.view.borrow().total_pages;
        if !page_bounds(self.page, total).1 {
            return None;
        }
        self.page += 1;
        Some(self.refresh())
    }

    /// Back affordance; `None` when disabled.
    pub fn prev_page(&mut self) -> Option<JoinHandle<()>> {
        if self.page <= 1 {
            return None;
        }
        self.page -= 1;
        Some(self.refresh())
    }

    /// An empty query returns to browsing; anything else runs a fresh search.
    /// Either way the view goes back to page 1.
    pub fn set_search(&mut self, query: &str) -> JoinHandle<()> {
        let query = query.trim();
        if query.is_empty() {
            self.mode = Mode::Browse;
            self.query.clear();
        } else {
            self.mode = Mode::Search;
            self.query = query.to_string();
            self.epoch += 1;
        }
        self.page = 1;
        self.refresh()
    }

    /// Called after a create, update or delete on this collection so the
    /// next refresh re-runs the active search instead of reusing its hits.
    pub fn notify_mutated(&mut self) {
        self.epoch += 1;
    }
}

async fn load<E: Entity>(
    gateway: &dyn Gateway<E>,
    req: &Request<E>,
    progress: Option<&(dyn Fn(f32) + Send + Sync)>,
) -> Result<Loaded<E>, StoreError> {
    let report = |p: f32| {
        if let Some(sink) = progress {
            sink(p);
        }
    };
    report(0.0);

    let outcome = match req.mode {
        Mode::Browse => {
            let skip = (req.page - 1) * req.page_size;
            let page = async {
                let rows = gateway.find_page(skip, req.page_size).await;
                report(0.5);
                rows
            };
            let (rows, total) = tokio::join!(page, gateway.count());
            match (rows, total) {
                (Ok(rows), Ok(total)) => Ok(Loaded {
                    rows,
                    total,
                    hits: None,
                }),
                (Err(err), _) | (_, Err(err)) => Err(err),
            }
        }
        Mode::Search => {
            let hits = match &req.cached_hits {
                Some(hits) => Ok(Arc::clone(hits)),
                None => gateway.search_by_text(&req.query).await.map(Arc::new),
            };
            hits.map(|hits| {
                let start = ((req.page - 1) * req.page_size).min(hits.len());
                let end = (start + req.page_size).min(hits.len());
                Loaded {
                    rows: hits[start..end].to_vec(),
                    total: hits.len() as u64,
                    hits: Some(hits),
                }
            })
        }
    };

    report(1.0);
    outcome
}

fn commit<E: Entity>(
    view: &watch::Sender<View<E>>,
    generation: &AtomicU64,
    gateway: &dyn Gateway<E>,
    req: Request<E>,
    outcome: Result<Loaded<E>, StoreError>,
) {
    let collection = gateway.collection();
    let token = req.token;
    view.send_if_modified(move |v| {
        let latest = generation.load(Ordering::SeqCst);
        if latest != token {
            tracing::debug!(%collection, token, latest, "discarding superseded refresh");
            return false;
        }
        match outcome {
            Ok(loaded) => {
                let pages = total_pages(loaded.total, req.page_size);
                let (can_prev, can_next) = page_bounds(req.page, pages);
                v.mode = req.mode;
                v.query = req.query;
                v.rows = loaded.rows;
                v.total_count = loaded.total;
                v.current_page = req.page;
                v.page_size = req.page_size;
                v.total_pages = pages;
                v.can_prev = can_prev;
                v.can_next = can_next;
                v.failure = None;
                v.generation = token;
                v.search_hits = loaded.hits;
                v.hits_epoch = req.epoch;
                tracing::debug!(%collection, token, rows = v.rows.len(), total = v.total_count, "refresh committed");
            }
            Err(err) => {
                tracing::warn!(%collection, token, "refresh failed: {err}");
                v.failure = Some(format!("Failed to load {}: {}", collection.label(), err));
                v.generation = token;
            }
        }
        true
    });
}
