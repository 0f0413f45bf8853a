//! Paged list state with stale-response suppression.
//!
//! Every load takes a ticket. Only the answer carrying the newest ticket is
//! applied; older answers that arrive late are dropped. While a newer load is
//! in flight the previous page stays visible, flagged as a placeholder.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::api::models::{Page, UserProfileDto};
use crate::api::{ApiClient, ALL_TAGS};
use crate::error::{RequestError, RequestResult};

/// Identifies one load; larger is newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// What a list view renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedSnapshot<T> {
    pub data: Option<Page<T>>,
    /// `data` belongs to an older query than the one in flight.
    pub placeholder: bool,
    pub fetching: bool,
    pub error: Option<RequestError>,
}

impl<T> PagedSnapshot<T> {
    /// Nothing to show yet; the view renders skeletons.
    pub fn is_initial_loading(&self) -> bool { self.fetching && self.data.is_none() }
}

struct Slot<T> {
    data: Option<Page<T>>,
    data_ticket: Option<Ticket>,
    error: Option<RequestError>,
}

pub struct PagedQuery<T> {
    issued: AtomicU64,
    slot: Mutex<Slot<T>>,
}

impl<T> Default for PagedQuery<T> {
    fn default() -> Self {
        Self { issued: AtomicU64::new(0), slot: Mutex::new(Slot { data: None, data_ticket: None, error: None }) }
    }
}

impl<T: Clone> PagedQuery<T> {
    pub fn new() -> Self { Self::default() }

    /// Start a load; supersedes every earlier ticket.
    pub fn begin(&self) -> Ticket { Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1) }

    pub fn latest(&self) -> Option<Ticket> {
        match self.issued.load(Ordering::SeqCst) {
            0 => None,
            n => Some(Ticket(n)),
        }
    }

    /// Apply the outcome of `ticket`'s load. Returns false when a newer load
    /// has been started meanwhile and the outcome was dropped.
    pub fn complete(&self, ticket: Ticket, outcome: RequestResult<Page<T>>) -> bool {
        let mut slot = self.slot.lock();
        if self.latest() != Some(ticket) {
            debug!(ticket = ticket.0, "dropping stale page response");
            return false;
        }
        match outcome {
            Ok(page) => {
                if !page.is_consistent() {
                    warn!(number = page.number, total_pages = page.total_pages, len = page.content.len(), "inconsistent page received");
                }
                slot.data = Some(page);
                slot.data_ticket = Some(ticket);
                slot.error = None;
            }
            // The previous page stays on screen next to the error.
            Err(e) => {
                slot.data_ticket = Some(ticket);
                slot.error = Some(e);
            }
        }
        true
    }

    /// Begin, await `load`, complete.
    pub async fn run<F>(&self, load: F) -> bool
    where
        F: Future<Output = RequestResult<Page<T>>>,
    {
        let ticket = self.begin();
        let outcome = load.await;
        self.complete(ticket, outcome)
    }

    pub fn snapshot(&self) -> PagedSnapshot<T> {
        let slot = self.slot.lock();
        let latest = self.latest();
        let fetching = latest.is_some() && slot.data_ticket != latest;
        PagedSnapshot {
            data: slot.data.clone(),
            placeholder: fetching && slot.data.is_some(),
            fetching,
            error: slot.error.clone(),
        }
    }
}

/// Filter of the volunteer directory. `tag == None` shows every volunteer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub tag: Option<String>,
    pub page: u32,
}

/// State behind the organization's "available volunteers" view.
pub struct VolunteerDirectory {
    page_size: u32,
    filter: Mutex<DirectoryFilter>,
    tags: Mutex<Vec<String>>,
    // Tag filter of the query that produced the visible page.
    loaded_tag: Mutex<Option<Option<String>>>,
    query: PagedQuery<UserProfileDto>,
}

impl VolunteerDirectory {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            filter: Mutex::new(DirectoryFilter::default()),
            tags: Mutex::new(Vec::new()),
            loaded_tag: Mutex::new(None),
            query: PagedQuery::new(),
        }
    }

    pub fn page_size(&self) -> u32 { self.page_size }

    pub fn filter(&self) -> DirectoryFilter { self.filter.lock().clone() }

    pub fn snapshot(&self) -> PagedSnapshot<UserProfileDto> { self.query.snapshot() }

    pub fn known_tags(&self) -> Vec<String> { self.tags.lock().clone() }

    /// Change the tag filter; `"all"` or blank clears it. Going back to page 0
    /// happens on every change.
    pub fn select_tag(&self, tag: Option<&str>) -> DirectoryFilter {
        let tag = tag.map(str::trim).filter(|t| !t.is_empty() && *t != ALL_TAGS).map(str::to_string);
        let mut f = self.filter.lock();
        if f.tag != tag {
            f.tag = tag;
            f.page = 0;
        }
        f.clone()
    }

    /// Page count of the current filter, 0 while unknown. A page loaded for
    /// another tag says nothing about this one.
    fn total_pages(&self, tag: &Option<String>) -> u32 {
        let loaded = self.loaded_tag.lock();
        if loaded.as_ref() != Some(tag) {
            return 0;
        }
        self.query.snapshot().data.map(|p| p.total_pages).unwrap_or(0)
    }

    /// Advance one page, never past the last known page.
    pub fn next_page(&self) -> DirectoryFilter {
        let mut f = self.filter.lock();
        let total = self.total_pages(&f.tag);
        if total > 0 {
            f.page = f.page.saturating_add(1).min(total - 1);
        }
        f.clone()
    }

    pub fn previous_page(&self) -> DirectoryFilter {
        let mut f = self.filter.lock();
        f.page = f.page.saturating_sub(1);
        f.clone()
    }

    pub fn go_to_page(&self, page: u32) -> DirectoryFilter {
        let mut f = self.filter.lock();
        let total = self.total_pages(&f.tag);
        f.page = if total > 0 { page.min(total - 1) } else { page };
        f.clone()
    }

    /// Load the page for the current filter. Returns whether the answer was
    /// applied (false if a newer load overtook it).
    pub async fn refresh(&self, api: &ApiClient) -> bool {
        let f = self.filter();
        let ticket = self.query.begin();
        let outcome = api.volunteers(f.tag.as_deref(), f.page, self.page_size).await;
        self.complete(ticket, f.tag, outcome)
    }

    // Applies the outcome and remembers which tag the visible page belongs to.
    fn complete(&self, ticket: Ticket, tag: Option<String>, outcome: RequestResult<Page<UserProfileDto>>) -> bool {
        let mut loaded = self.loaded_tag.lock();
        let replaces_data = outcome.is_ok();
        let applied = self.query.complete(ticket, outcome);
        if applied && replaces_data {
            *loaded = Some(tag);
        }
        applied
    }

    /// Reload the list of filterable tags.
    pub async fn refresh_tags(&self, api: &ApiClient) -> RequestResult<Vec<String>> {
        let tags = api.all_tags().await?;
        *self.tags.lock() = tags.clone();
        Ok(tags)
    }

    pub fn query(&self) -> &PagedQuery<UserProfileDto> { &self.query }
}
