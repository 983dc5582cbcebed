//! Which slice of the filtered listing is on screen: numbered pages or a growing window.

use std::ops::{Range, RangeInclusive};
use tracing::debug;

use crate::listing;
use crate::models::{FilterState, JobPosting};
use crate::tech_stack::TechStackVocabulary;

pub const ITEMS_PER_PAGE: usize = 10;
pub const PAGE_BUTTONS: usize = 5;
pub const WINDOW_STEP: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayoutMode {
    #[default]
    Paged,
    Incremental,
}

// --- Paged mode ---

#[derive(Debug, Clone)]
pub struct Pager {
    current: usize,
    total_items: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self { current: 1, total_items: 0 }
    }
}

impl Pager {
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(ITEMS_PER_PAGE)
    }

    /// Highest reachable page. An empty listing still shows page 1.
    fn last(&self) -> usize {
        self.total_pages().max(1)
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn set_total(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.current = self.current.clamp(1, self.last());
    }

    pub fn go_to(&mut self, page: usize) -> usize {
        self.current = page.clamp(1, self.last());
        self.current
    }

    pub fn first(&mut self) -> usize {
        self.go_to(1)
    }

    pub fn prev(&mut self) -> usize {
        self.go_to(self.current.saturating_sub(1))
    }

    pub fn next(&mut self) -> usize {
        self.go_to(self.current + 1)
    }

    pub fn last_page(&mut self) -> usize {
        self.go_to(self.last())
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }

    pub fn range(&self) -> Range<usize> {
        let start = ((self.current - 1) * ITEMS_PER_PAGE).min(self.total_items);
        let end = (start + ITEMS_PER_PAGE).min(self.total_items);
        start..end
    }

    /// Up to five page numbers centred on the current page, shifted to stay in bounds.
    pub fn page_buttons(&self) -> RangeInclusive<usize> {
        let last = self.last();
        let mut start = self.current.saturating_sub(PAGE_BUTTONS / 2).max(1);
        let mut end = start + PAGE_BUTTONS - 1;
        if end > last {
            end = last;
            start = end.saturating_sub(PAGE_BUTTONS - 1).max(1);
        }
        start..=end
    }
}

// --- Incremental mode ---

#[derive(Debug, Clone)]
pub struct IncrementalWindow {
    displayed: usize,
    loading: bool,
}

impl Default for IncrementalWindow {
    fn default() -> Self {
        Self { displayed: WINDOW_STEP, loading: false }
    }
}

impl IncrementalWindow {
    pub fn displayed_count(&self) -> usize {
        self.displayed
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.displayed < total
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Visibility signal from the end of the list. Grows only when there is more
    /// to show and nothing is in flight.
    pub fn on_visible(&mut self, total: usize) -> bool {
        if self.loading || !self.has_more(total) {
            return false;
        }
        self.displayed += WINDOW_STEP;
        true
    }

    pub fn range(&self, total: usize) -> Range<usize> {
        0..self.displayed.min(total)
    }

    pub fn reset(&mut self) {
        self.displayed = WINDOW_STEP;
    }
}

// --- Stale fetch guard ---

/// Hands out increasing tickets; only the newest ticket may apply its result.
#[derive(Debug, Default)]
pub struct FetchGuard {
    latest: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

impl FetchGuard {
    pub fn begin(&mut self) -> FetchTicket {
        self.latest += 1;
        FetchTicket(self.latest)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.latest
    }
}

// --- Listing controller ---

/// Owns the fetched collection and everything derived from it.
#[derive(Debug, Default)]
pub struct ListingView {
    jobs: Vec<JobPosting>,
    vocabulary: TechStackVocabulary,
    filter: FilterState,
    visible: Vec<usize>,
    mode: LayoutMode,
    pager: Pager,
    window: IncrementalWindow,
    guard: FetchGuard,
}

impl ListingView {
    pub fn new(mode: LayoutMode) -> Self {
        Self { mode, ..Default::default() }
    }

    #[cfg(test)]
    pub fn with_jobs(mode: LayoutMode, jobs: Vec<JobPosting>) -> Self {
        let mut view = Self::new(mode);
        view.replace_jobs(jobs);
        view
    }

    /// Start a refetch. Growth of the incremental window is held until it settles.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.window.set_loading(true);
        self.guard.begin()
    }

    /// Apply a refetched collection unless a newer fetch has started since.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, jobs: Vec<JobPosting>) -> bool {
        if !self.guard.is_current(ticket) {
            debug!("Dropping superseded listing fetch ({} postings)", jobs.len());
            return false;
        }
        self.window.set_loading(false);
        self.replace_jobs(jobs);
        true
    }

    pub fn fail_fetch(&mut self, ticket: FetchTicket) {
        if self.guard.is_current(ticket) {
            self.window.set_loading(false);
        }
    }

    pub fn replace_jobs(&mut self, jobs: Vec<JobPosting>) {
        self.jobs = jobs;
        self.vocabulary = TechStackVocabulary::build(&self.jobs);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.visible = listing::select(&self.jobs, &self.filter);
        self.pager.set_total(self.visible.len());
    }

    pub fn jobs(&self) -> &[JobPosting] {
        &self.jobs
    }

    pub fn vocabulary(&self) -> &TechStackVocabulary {
        &self.vocabulary
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Replace the criteria. Any change returns both modes to their first slice.
    pub fn set_filter(&mut self, filter: FilterState) -> bool {
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.pager.reset();
        self.window.reset();
        self.recompute();
        true
    }

    pub fn update_filter(&mut self, edit: impl FnOnce(&mut FilterState)) -> bool {
        let mut next = self.filter.clone();
        edit(&mut next);
        self.set_filter(next)
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn filtered_len(&self) -> usize {
        self.visible.len()
    }

    fn displayed_range(&self) -> Range<usize> {
        match self.mode {
            LayoutMode::Paged => self.pager.range(),
            LayoutMode::Incremental => self.window.range(self.visible.len()),
        }
    }

    pub fn displayed(&self) -> Vec<&JobPosting> {
        self.visible[self.displayed_range()]
            .iter()
            .map(|&i| &self.jobs[i])
            .collect()
    }

    /// Company ids on screen, first appearance order, no repeats.
    pub fn displayed_company_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for job in self.displayed() {
            if let Some(id) = job.company_id {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    // paged navigation

    pub fn current_page(&self) -> usize {
        self.pager.current()
    }

    pub fn total_pages(&self) -> usize {
        self.pager.total_pages()
    }

    pub fn page_buttons(&self) -> RangeInclusive<usize> {
        self.pager.page_buttons()
    }

    pub fn go_to_page(&mut self, page: usize) -> usize {
        self.pager.go_to(page)
    }

    pub fn first_page(&mut self) -> usize {
        self.pager.first()
    }

    pub fn prev_page(&mut self) -> usize {
        self.pager.prev()
    }

    pub fn next_page(&mut self) -> usize {
        self.pager.next()
    }

    pub fn last_page(&mut self) -> usize {
        self.pager.last_page()
    }

    // incremental growth

    pub fn displayed_count(&self) -> usize {
        self.window.displayed_count()
    }

    pub fn has_more(&self) -> bool {
        self.window.has_more(self.visible.len())
    }

    pub fn on_visible(&mut self) -> bool {
        self.window.on_visible(self.visible.len())
    }

    #[cfg(test)]
    pub fn job(&self, id: i64) -> Option<&JobPosting> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Local view bump ahead of the server round trip. Returns the new count.
    pub fn increment_view(&mut self, id: i64) -> Option<u64> {
        let job = self.jobs.iter_mut().find(|j| j.id == id)?;
        job.view_count = job.view_count.saturating_add(1);
        Some(job.view_count)
    }
}
