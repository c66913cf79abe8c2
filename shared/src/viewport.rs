//! Window math for the virtualized list.
//!
//! [`VirtualWindow`] keeps no DOM: it turns a scroll offset into the range of view
//! positions that must exist and drives a [`RowSink`] with exactly those rows.
//! The frontend's element pool implements the sink.

use crate::error::ViewportError;
use crate::row::RowSet;
use crate::selection::SelectionStore;
use crate::view::FilteredView;
use std::ops::Range;

pub const DEFAULT_OVERSCAN: usize = 2;
pub const DEFAULT_ITEM_HEIGHT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Idle,
    Initialized,
    Rendering,
}

/// One row handed to the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow<'a> {
    /// Position in the filtered view.
    pub position: usize,
    /// Index into the canonical row set.
    pub index: usize,
    pub name: &'a str,
    pub time: Option<&'a str>,
    pub checked: bool,
    /// Distance from the top of the scroll content, in pixels.
    pub offset: f64,
}

pub trait RowSink {
    fn clear(&mut self);
    fn row(&mut self, row: RenderedRow<'_>);
    fn set_checked(&mut self, position: usize, checked: bool);
}

#[derive(Debug, Clone)]
pub struct VirtualWindow {
    item_height: f64,
    overscan: usize,
    state: WindowState,
    visible_count: usize,
    total: usize,
    scroll_top: f64,
    range: Range<usize>,
}

impl VirtualWindow {
    pub fn new(item_height: f64) -> Result<Self, ViewportError> {
        Self::with_overscan(item_height, DEFAULT_OVERSCAN)
    }

    pub fn with_overscan(item_height: f64, overscan: usize) -> Result<Self, ViewportError> {
        if !item_height.is_finite() || item_height <= 0.0 {
            return Err(ViewportError::InvalidItemHeight(item_height));
        }
        Ok(Self {
            item_height,
            overscan,
            state: WindowState::Idle,
            visible_count: 0,
            total: 0,
            scroll_top: 0.0,
            range: 0..0,
        })
    }

    /// Falls back to the default row height when `item_height` is unusable.
    pub fn or_default_height(item_height: f64, overscan: usize) -> Self {
        Self::with_overscan(item_height, overscan).unwrap_or(Self {
            item_height: DEFAULT_ITEM_HEIGHT,
            overscan,
            state: WindowState::Idle,
            visible_count: 0,
            total: 0,
            scroll_top: 0.0,
            range: 0..0,
        })
    }

    /// Measures the viewport. Can be called again after a resize.
    pub fn initialize(&mut self, viewport_height: f64) -> Result<Range<usize>, ViewportError> {
        if !viewport_height.is_finite() || viewport_height <= 0.0 {
            self.state = WindowState::Idle;
            return Err(ViewportError::NotMeasurable(viewport_height));
        }
        self.visible_count = (viewport_height / self.item_height).ceil() as usize;
        self.state = WindowState::Initialized;
        self.range = self.compute_range();
        Ok(self.range.clone())
    }

    /// Returns the new window only when it differs from the previous one.
    pub fn scroll_to(&mut self, scroll_top: f64) -> Option<Range<usize>> {
        self.scroll_top = if scroll_top.is_finite() { scroll_top.max(0.0) } else { 0.0 };
        let range = self.compute_range();
        if range == self.range {
            return None;
        }
        self.range = range.clone();
        Some(range)
    }

    /// New data or new filter: scroll goes back to the top.
    pub fn set_total(&mut self, total: usize) -> Range<usize> {
        self.total = total;
        self.scroll_top = 0.0;
        self.range = self.compute_range();
        self.range.clone()
    }

    fn compute_range(&self) -> Range<usize> {
        if self.state == WindowState::Idle {
            return 0..0;
        }
        let start = ((self.scroll_top / self.item_height).floor() as usize).min(self.total);
        let end = (start + self.visible_count + self.overscan).min(self.total);
        start..end
    }

    pub fn render(
        &mut self,
        rows: &RowSet,
        view: &FilteredView,
        selection: &SelectionStore,
        sink: &mut impl RowSink,
    ) {
        sink.clear();
        if self.state == WindowState::Idle {
            return;
        }
        self.state = WindowState::Rendering;
        for position in self.range.clone() {
            let Some(index) = view.indices().get(position).copied() else {
                break;
            };
            let Some(row) = rows.get(index) else {
                continue;
            };
            sink.row(RenderedRow {
                position,
                index,
                name: &row.name,
                time: row.time.as_deref(),
                checked: selection.has(&row.name),
                offset: self.item_offset(position),
            });
        }
    }

    /// Pushes the current checked state of every rendered row without rebuilding it.
    pub fn refresh_selection(
        &self,
        rows: &RowSet,
        view: &FilteredView,
        selection: &SelectionStore,
        sink: &mut impl RowSink,
    ) {
        for position in self.range.clone() {
            if let Some(row) = view.row(rows, position) {
                sink.set_checked(position, selection.has(&row.name));
            }
        }
    }

    pub fn content_height(&self) -> f64 {
        self.total as f64 * self.item_height
    }

    pub fn item_offset(&self, position: usize) -> f64 {
        position as f64 * self.item_height
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn item_height(&self) -> f64 {
        self.item_height
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }
}
