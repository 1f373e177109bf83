//! Cursor and scroll state over the visible projection
//!
//! Rows are identified by URN. The cursor remembers the URN it sits on so
//! that rebuilding the projection (new events, filter changes) keeps the
//! same resource selected when it is still visible, and otherwise clamps
//! the old position into the new range instead of jumping to the top.

use serde::Serialize;

/// Selection and viewport state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cursor {
    position: usize,
    scroll_offset: usize,
    selected: Option<String>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index into the visible rows
    pub fn position(&self) -> usize {
        self.position
    }

    /// First visible row of the viewport
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// URN of the selected row, if any row is visible
    pub fn selected_urn(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Move by `delta` rows, clamped to the visible range
    ///
    /// Returns `true` if the position changed.
    pub fn move_cursor(&mut self, delta: isize, rows: &[&str]) -> bool {
        let before = self.position;
        let target = self.position.saturating_add_signed(delta);
        self.position = clamp(target, rows.len());
        self.remember(rows);
        self.position != before
    }

    /// Move a full viewport up (negative) or down (positive)
    pub fn page(&mut self, pages: isize, viewport_height: usize, rows: &[&str]) -> bool {
        let step = viewport_height.max(1) as isize;
        self.move_cursor(pages.saturating_mul(step), rows)
    }

    /// Jump to the first row
    pub fn home(&mut self, rows: &[&str]) -> bool {
        let before = self.position;
        self.position = 0;
        self.remember(rows);
        self.position != before
    }

    /// Jump to the last row
    pub fn end(&mut self, rows: &[&str]) -> bool {
        let before = self.position;
        self.position = rows.len().saturating_sub(1);
        self.remember(rows);
        self.position != before
    }

    /// Select the row showing `urn`
    ///
    /// Returns `false` and leaves the cursor alone if it is not visible.
    pub fn select(&mut self, urn: &str, rows: &[&str]) -> bool {
        match rows.iter().position(|r| *r == urn) {
            Some(position) => {
                self.position = position;
                self.selected = Some(urn.to_string());
                true
            }
            None => false,
        }
    }

    /// Re-anchor after the visible rows were rebuilt
    ///
    /// Follows the selected URN to its new position if it is still visible,
    /// otherwise clamps the previous position into the new range.
    pub fn resync(&mut self, rows: &[&str]) {
        let followed = self
            .selected
            .as_deref()
            .and_then(|urn| rows.iter().position(|r| *r == urn));
        self.position = match followed {
            Some(position) => position,
            None => clamp(self.position, rows.len()),
        };
        self.remember(rows);
    }

    /// Scroll so the cursor is inside a viewport of `viewport_height` rows
    pub fn ensure_visible(&mut self, item_count: usize, viewport_height: usize) -> usize {
        self.scroll_offset = ensure_visible(
            self.scroll_offset,
            self.position,
            item_count,
            viewport_height,
        );
        self.scroll_offset
    }

    fn remember(&mut self, rows: &[&str]) {
        self.selected = rows.get(self.position).map(|urn| (*urn).to_string());
    }
}

fn clamp(position: usize, len: usize) -> usize {
    position.min(len.saturating_sub(1))
}

/// Scroll offset that keeps `cursor` within `[offset, offset + viewport_height)`
///
/// Starts from the current `offset` and moves it as little as possible. The
/// result never exceeds `max(0, item_count - viewport_height)`.
pub fn ensure_visible(
    offset: usize,
    cursor: usize,
    item_count: usize,
    viewport_height: usize,
) -> usize {
    if item_count == 0 || viewport_height == 0 {
        return 0;
    }

    let max_offset = item_count.saturating_sub(viewport_height);
    let mut offset = offset.min(max_offset);
    if cursor < offset {
        offset = cursor;
    } else if cursor >= offset + viewport_height {
        offset = cursor + 1 - viewport_height;
    }
    offset.min(max_offset)
}
