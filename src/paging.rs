//! Paging - Page windows and paged results.
//!
//! `PageWindow` owns the arithmetic (skip, take, page count) and
//! `PagedResult::new` assembles the metadata. Every source of rows goes
//! through those two: in-memory collections and store cursors via
//! [`Paginate`], store queries via `EntityRepository::get_paged` and
//! `find_paged`.

use serde::{Deserialize, Serialize};

/// A requested page. `size == 0` means "everything on one page".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RequestedWindow")]
pub struct PageWindow {
    page: u64,
    size: u64,
}

/// Wire form of a `PageWindow`; normalised through `PageWindow::new`.
#[derive(Deserialize)]
struct RequestedWindow {
    #[serde(default)]
    page: u64,
    #[serde(default)]
    size: u64,
}

impl From<RequestedWindow> for PageWindow {
    fn from(requested: RequestedWindow) -> Self {
        PageWindow::new(requested.page, requested.size)
    }
}

impl PageWindow {
    /// `page` is 1-based; 0 is treated as 1.
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page: page.max(1),
            size,
        }
    }

    /// A window returning every row.
    pub fn unpaged() -> Self {
        Self::new(1, 0)
    }

    pub fn page(&self) -> u64 {
        if self.is_unpaged() {
            1
        } else {
            self.page
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_unpaged(&self) -> bool {
        self.size == 0
    }

    /// Rows to skip before the page starts.
    pub fn skip(&self) -> u64 {
        if self.is_unpaged() {
            0
        } else {
            self.size.saturating_mul(self.page.saturating_sub(1))
        }
    }

    /// Rows on the page, `None` when unpaged.
    pub fn take(&self) -> Option<u64> {
        (!self.is_unpaged()).then_some(self.size)
    }

    /// `ceil(row_count / size)`, or 1 when unpaged.
    pub fn page_count(&self, row_count: u64) -> u64 {
        if self.is_unpaged() {
            1
        } else {
            row_count.div_ceil(self.size)
        }
    }

    /// Whether the row at zero-based `position` falls inside this window.
    pub fn contains(&self, position: u64) -> bool {
        match self.take() {
            None => true,
            Some(take) => position >= self.skip() && position - self.skip() < take,
        }
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::unpaged()
    }
}

/// One page of results with its position in the full result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub results: Vec<T>,
    pub page_current: u64,
    pub page_count: u64,
    /// 0 when the result is unpaged.
    pub page_size: u64,
    pub row_count: u64,
}

impl<T> PagedResult<T> {
    /// Assemble a result from rows already cut to `window`.
    pub fn new(window: PageWindow, row_count: u64, results: Vec<T>) -> Self {
        Self {
            results,
            page_current: window.page(),
            page_count: window.page_count(row_count),
            page_size: window.size(),
            row_count,
        }
    }

    /// 1-based index of the first row on this page.
    pub fn first_row_on_page(&self) -> u64 {
        self.page_current
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .saturating_add(1)
    }

    /// 1-based index of the last row on this page.
    pub fn last_row_on_page(&self) -> u64 {
        if self.page_size == 0 {
            return self.row_count;
        }
        self.page_current
            .saturating_mul(self.page_size)
            .min(self.row_count)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagedResult<U> {
        PagedResult {
            results: self.results.into_iter().map(f).collect(),
            page_current: self.page_current,
            page_count: self.page_count,
            page_size: self.page_size,
            row_count: self.row_count,
        }
    }
}

/// Page any sequence of rows: vectors, slices, iterators, store cursors.
///
/// The sequence is consumed once; every row is counted, only rows inside the
/// window are kept.
pub trait Paginate: IntoIterator + Sized {
    fn paginate(self, page: u64, page_size: u64) -> PagedResult<Self::Item> {
        let window = PageWindow::new(page, page_size);
        let mut row_count = 0u64;
        let mut results = Vec::new();

        for row in self {
            if window.contains(row_count) {
                results.push(row);
            }
            row_count += 1;
        }

        PagedResult::new(window, row_count, results)
    }
}

impl<I: IntoIterator> Paginate for I {}
