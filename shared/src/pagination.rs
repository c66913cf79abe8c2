use crate::view::FilteredView;
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationInfo {
    pub current_page: usize,
    pub total_pages: usize,
}

impl PaginationInfo {
    pub fn label(&self) -> String {
        format!("Page {} / {}", self.current_page, self.total_pages)
    }
}

/// Page navigation over a filtered view. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    current_page: usize,
    len: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    /// A zero page size is treated as one.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current_page: 1,
            len: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.len.div_ceil(self.page_size).max(1)
    }

    pub fn info(&self) -> PaginationInfo {
        PaginationInfo {
            current_page: self.current_page,
            total_pages: self.total_pages(),
        }
    }

    /// Ignores pages outside `1..=total_pages`.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.current_page > 1 && self.go_to_page(self.current_page - 1)
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    /// Updates the item count, keeping the current page inside the new bounds.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.current_page = self.current_page.clamp(1, self.total_pages());
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn page_range(&self) -> Range<usize> {
        let start = ((self.current_page - 1) * self.page_size).min(self.len);
        let end = (start + self.page_size).min(self.len);
        start..end
    }

    pub fn page_items<'a>(&self, view: &'a FilteredView) -> &'a [usize] {
        let range = self.page_range();
        let indices = view.indices();
        let end = range.end.min(indices.len());
        &indices[range.start.min(end)..end]
    }
}
