//! Cursor pagination driver
//!
//! The content listing API is cursor-based and not entirely trustworthy: it
//! can repeat a cursor while content remains, which would loop forever if
//! followed naively. The driver owns the cursor and decides after each page
//! whether the loop continues, including the synthetic bump that breaks a
//! stall.

use crate::types::ContentPage;

/// Verdict after observing one fetched page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageDecision {
    /// Fetch another page
    Continue,
    /// The listing is exhausted
    Stop,
}

/// Tracks the cursor across a pagination loop.
#[derive(Debug)]
pub struct PaginationDriver {
    cursor: u64,
}

impl PaginationDriver {
    /// A fresh driver at the sentinel cursor.
    pub fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Current cursor to request the next page with.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Advance the driver past a fetched page.
    ///
    /// - An empty page always stops the loop.
    /// - A new cursor is adopted; the response's `has_more` decides.
    /// - A repeated cursor is a stall: while the declared total has not been
    ///   reached the cursor is bumped by one to dislodge the listing,
    ///   otherwise the loop stops.
    pub fn observe(&mut self, page: &ContentPage, downloaded: u64, total: u64) -> PageDecision {
        if page.items.is_empty() {
            return PageDecision::Stop;
        }

        if page.cursor == self.cursor {
            if downloaded < total {
                tracing::warn!(
                    cursor = self.cursor,
                    downloaded,
                    total,
                    "Cursor stalled with content remaining, bumping"
                );
                self.cursor += 1;
                return PageDecision::Continue;
            }
            return PageDecision::Stop;
        }

        self.cursor = page.cursor;
        if page.has_more {
            PageDecision::Continue
        } else {
            PageDecision::Stop
        }
    }
}

impl Default for PaginationDriver {
    fn default() -> Self {
        Self::new()
    }
}
