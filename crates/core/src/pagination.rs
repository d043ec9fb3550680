//! Page-window accounting for offset-based search pagination.
//!
//! The search API returns results in pages addressed by `startAt` and
//! `maxResults`. These functions decide the window for each call and when
//! to stop, so the fetch loop itself stays a dumb repeat-until-`None`.

/// Results requested per search page.
pub const PAGE_SIZE: usize = 50;

/// One window into an offset-paginated result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start_at: usize,
    pub max_results: usize,
}

/// The window for the first page of a search capped at `cap` results.
pub fn first_window(cap: usize) -> PageWindow {
    PageWindow {
        start_at: 0,
        max_results: PAGE_SIZE.min(cap),
    }
}

/// The window for the next page, or `None` when fetching is finished.
///
/// Fetching stops once the server-reported total is reached, the caller's
/// cap is reached, or the server returned a short page. The next window
/// never requests more than the cap still allows.
pub fn next_window(
    window: PageWindow,
    fetched: usize,
    page_len: usize,
    server_total: usize,
    cap: usize,
) -> Option<PageWindow> {
    if fetched >= server_total || fetched >= cap {
        return None;
    }
    if page_len < window.max_results {
        return None;
    }
    Some(PageWindow {
        start_at: window.start_at + window.max_results,
        max_results: PAGE_SIZE.min(cap - fetched),
    })
}
