//! Pagination windows and page-link metadata
//!
//! Two-phase protocol:
//! 1. `Pager::new(page, items_per_page)` fixes the fetch window
//!    (`skip`/`take`) from the *requested* page.
//! 2. Once the total is known, `configure(total, url_format)` derives the page
//!    count, clamps the reported current page, and computes the page links.
//!
//! The window is never moved by `configure`: asking for page 9 of 3 serves an
//! empty page instead of silently serving page 3.

use serde::Serialize;

/// Placeholder replaced by the page number in link templates
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Maximum number of numbered page links shown at once
const MAX_PAGE_LINKS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pager {
    current_page: u64,
    items_per_page: u64,
    skip: u64,
    total_items: u64,
    total_pages: u64,
    start_page: u64,
    end_page: u64,
    url_format: String,
}

impl Pager {
    /// Page values below 1 are treated as 1; an items-per-page of 0 as 1.
    pub fn new(page: i64, items_per_page: u32) -> Self {
        let current_page = u64::try_from(page).unwrap_or(0).max(1);
        let items_per_page = u64::from(items_per_page.max(1));
        Self {
            current_page,
            items_per_page,
            skip: (current_page - 1).saturating_mul(items_per_page),
            total_items: 0,
            total_pages: 0,
            start_page: 1,
            end_page: 0,
            url_format: String::new(),
        }
    }

    /// Record the total item count and the link template.
    pub fn configure(&mut self, total_items: u64, url_format: impl Into<String>) {
        self.total_items = total_items;
        self.total_pages = total_items.div_ceil(self.items_per_page);
        self.url_format = url_format.into();

        if self.total_pages >= 1 && self.current_page > self.total_pages {
            self.current_page = self.total_pages;
        }

        let (start, end) = page_link_window(self.current_page, self.total_pages);
        self.start_page = start;
        self.end_page = end;
    }

    /// Items to skip, computed from the requested page
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Items to take
    pub fn take(&self) -> u64 {
        self.items_per_page
    }

    /// `(skip, take)` as slice bounds
    pub fn window(&self) -> (usize, usize) {
        (
            usize::try_from(self.skip).unwrap_or(usize::MAX),
            usize::try_from(self.items_per_page).unwrap_or(usize::MAX),
        )
    }

    /// Slice an in-memory, already ordered list to this pager's window
    pub fn page_of<T>(&self, items: Vec<T>) -> Vec<T> {
        let (skip, take) = self.window();
        items.into_iter().skip(skip).take(take).collect()
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn items_per_page(&self) -> u64 {
        self.items_per_page
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// First numbered page link
    pub fn start_page(&self) -> u64 {
        self.start_page
    }

    /// Last numbered page link; below `start_page` when there are no pages
    pub fn end_page(&self) -> u64 {
        self.end_page
    }

    pub fn url_format(&self) -> &str {
        &self.url_format
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Page numbers to render as links
    pub fn page_links(&self) -> impl Iterator<Item = u64> {
        self.start_page..=self.end_page
    }

    /// Link for `page`, rendered from the configured template
    pub fn url(&self, page: u64) -> String {
        self.url_format.replace(PAGE_PLACEHOLDER, &page.to_string())
    }
}

/// At most ten links: pages 1..=10 near the start, the last ten near the end,
/// otherwise five before and four after the current page.
fn page_link_window(current: u64, total: u64) -> (u64, u64) {
    if total <= MAX_PAGE_LINKS {
        (1, total)
    } else if current <= 6 {
        (1, MAX_PAGE_LINKS)
    } else if current + 4 >= total {
        (total - (MAX_PAGE_LINKS - 1), total)
    } else {
        (current - 5, current + 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_computes_window() {
        let pager = Pager::new(3, 5);
        assert_eq!(pager.skip(), 10);
        assert_eq!(pager.take(), 5);
        assert_eq!(pager.current_page(), 3);
    }

    #[test]
    fn test_non_positive_page_is_first_page() {
        for page in [0, -1, i64::MIN] {
            let pager = Pager::new(page, 5);
            assert_eq!(pager.current_page(), 1);
            assert_eq!(pager.skip(), 0);
        }
    }

    #[test]
    fn test_zero_items_per_page_is_one() {
        let pager = Pager::new(2, 0);
        assert_eq!(pager.items_per_page(), 1);
        assert_eq!(pager.skip(), 1);
    }

    #[test]
    fn test_configure_total_pages() {
        let mut pager = Pager::new(1, 5);
        pager.configure(11, "page={page}");
        assert_eq!(pager.total_items(), 11);
        assert_eq!(pager.total_pages(), 3);
        assert_eq!(pager.url_format(), "page={page}");
    }

    #[test]
    fn test_configure_zero_items() {
        let mut pager = Pager::new(1, 5);
        pager.configure(0, "");
        assert_eq!(pager.total_pages(), 0);
        assert_eq!(pager.current_page(), 1);
        assert_eq!(pager.page_links().count(), 0);
        assert!(!pager.has_next_page());
        assert!(!pager.has_previous_page());
    }

    #[test]
    fn test_out_of_range_page_keeps_window() {
        let mut pager = Pager::new(9, 5);
        pager.configure(12, "page={page}");
        // window still points past the end
        assert_eq!(pager.skip(), 40);
        // reported page is clamped for link rendering
        assert_eq!(pager.current_page(), 3);
        assert!(pager.page_of((0..12).collect::<Vec<_>>()).is_empty());
    }

    #[test]
    fn test_page_of() {
        let pager = Pager::new(2, 3);
        assert_eq!(pager.page_of((0..8).collect::<Vec<_>>()), vec![3, 4, 5]);
        let pager = Pager::new(3, 3);
        assert_eq!(pager.page_of((0..8).collect::<Vec<_>>()), vec![6, 7]);
    }

    #[test]
    fn test_previous_next() {
        let mut pager = Pager::new(2, 5);
        pager.configure(15, "");
        assert!(pager.has_previous_page());
        assert!(pager.has_next_page());

        let mut pager = Pager::new(3, 5);
        pager.configure(15, "");
        assert!(!pager.has_next_page());
    }

    #[test]
    fn test_url_rendering() {
        let mut pager = Pager::new(1, 5);
        pager.configure(20, "page={page}&q=rust+search");
        assert_eq!(pager.url(2), "page=2&q=rust+search");
    }

    #[test]
    fn test_page_link_window() {
        assert_eq!(page_link_window(1, 4), (1, 4));
        assert_eq!(page_link_window(3, 20), (1, 10));
        assert_eq!(page_link_window(6, 20), (1, 10));
        assert_eq!(page_link_window(10, 20), (5, 14));
        assert_eq!(page_link_window(17, 20), (11, 20));
        assert_eq!(page_link_window(20, 20), (11, 20));
    }

    proptest! {
        #[test]
        fn prop_total_pages_is_ceiling(count in 0u64..10_000, per_page in 1u32..500) {
            let mut pager = Pager::new(1, per_page);
            pager.configure(count, "");
            let per_page = u64::from(per_page);
            prop_assert_eq!(pager.total_pages(), (count + per_page - 1) / per_page);
            if per_page > count && count > 0 {
                prop_assert_eq!(pager.total_pages(), 1);
            }
        }

        #[test]
        fn prop_page_never_exceeds_items_per_page(
            len in 0usize..200,
            page in -3i64..30,
            per_page in 1u32..20,
        ) {
            let pager = Pager::new(page, per_page);
            let slice = pager.page_of((0..len).collect::<Vec<_>>());
            prop_assert!(slice.len() <= per_page as usize);
        }
    }
}
