use serde::Serialize;
use url::{Position, Url};

use super::filters::Window;
use crate::config::PaginationSettings;

/// Normalizes a requested window against the total count.
///
/// Rules apply in order: `from < 1`, a `from` off the page grid, `to` past
/// `count + 1`, `to < from`, and a span wider than `max_page_span`. Every
/// reset lands on the first page, itself bounded by `count + 1` and by
/// `max_page_span`.
pub fn clamp_window(from: i64, to: i64, count: u64, settings: &PaginationSettings) -> Window {
    let page_size = settings.page_size.max(1) as i64;
    let upper = count.saturating_add(1).min(i64::MAX as u64) as i64;
    let span = settings.max_page_span.saturating_add(1).min(i64::MAX as u64) as i64;
    let first_page = (1, page_size.min(span).min(upper));

    let (mut from, mut to) = (from, to);
    if from < 1 {
        (from, to) = first_page;
    }
    if (from - 1) % page_size != 0 {
        (from, to) = first_page;
    }
    if to > upper {
        to = upper;
    }
    if to < from {
        (from, to) = first_page;
    }
    if to - from > settings.max_page_span as i64 {
        (from, to) = first_page;
    }

    Window::new(from as u64, to as u64)
}

/// A link to one page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    /// Zero-based page index.
    pub ranking: u64,
    pub from: u64,
    pub to: u64,
    pub active: bool,
    pub url: String,
}

/// Computes the page links shown under a result list.
#[derive(Debug, Clone)]
pub struct PaginationManager {
    count: u64,
    current: Window,
    full_path_url: String,
    settings: PaginationSettings,
}

const PLACEHOLDER_BASE: &str = "http://localhost/";

/// Rewrites the `from`/`to` query parameters and keeps every other one.
/// Relative paths stay relative.
fn rewrite_window_params(full_path_url: &str, from: u64, to: u64) -> String {
    let (mut url, relative) = match Url::parse(full_path_url) {
        Ok(url) => (url, false),
        Err(_) => match Url::parse(PLACEHOLDER_BASE).and_then(|base| base.join(full_path_url)) {
            Ok(url) => (url, true),
            Err(_) => return format!("?from={from}&to={to}"),
        },
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "from" && key != "to")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("from", &from.to_string())
        .append_pair("to", &to.to_string());

    if relative {
        url[Position::BeforePath..].to_string()
    } else {
        url.to_string()
    }
}

impl PaginationManager {
    pub fn new(
        count: u64,
        current: Window,
        full_path_url: impl Into<String>,
        settings: &PaginationSettings,
    ) -> Self {
        Self {
            count,
            current,
            full_path_url: full_path_url.into(),
            settings: settings.clone(),
        }
    }

    fn page_size(&self) -> u64 {
        self.settings.page_size.max(1)
    }

    pub fn page_count(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            1 + (self.count - 1) / self.page_size()
        }
    }

    /// One-based page holding the current window.
    pub fn current_page(&self) -> u64 {
        1 + self.current.from.saturating_sub(1) / self.page_size()
    }

    /// One-based inclusive bounds of the sliding window of pages. The window
    /// keeps its full width near either end of the list.
    fn window_bounds(&self) -> Option<(u64, u64)> {
        let page_count = self.page_count();
        if page_count == 0 {
            return None;
        }
        let half = self.settings.half_width();
        let width = (2 * half + 1).min(page_count);
        let current = self.current_page().min(page_count);
        let lower = current
            .saturating_sub(half)
            .max(1)
            .min(page_count - width + 1);
        Some((lower, lower + width - 1))
    }

    fn link(&self, ranking: u64) -> PageLink {
        let page_size = self.page_size();
        let from = 1 + ranking * page_size;
        let to = ((ranking + 1) * page_size).min(self.count);
        PageLink {
            ranking,
            from,
            to,
            active: from == self.current.from,
            url: rewrite_window_params(&self.full_path_url, from, to),
        }
    }

    pub fn pages(&self) -> Vec<PageLink> {
        match self.window_bounds() {
            Some((lower, upper)) => (lower..=upper).map(|page| self.link(page - 1)).collect(),
            None => Vec::new(),
        }
    }

    pub fn first_page(&self) -> Option<PageLink> {
        self.window_bounds()
            .filter(|(lower, _)| *lower > 1)
            .map(|_| self.link(0))
    }

    pub fn last_page(&self) -> Option<PageLink> {
        let page_count = self.page_count();
        self.window_bounds()
            .filter(|(_, upper)| *upper < page_count)
            .map(|_| self.link(page_count - 1))
    }

    pub fn should_show(&self) -> bool {
        self.page_count() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PaginationSettings {
        PaginationSettings::default()
    }

    #[test]
    fn misaligned_window_resets_to_first_page() {
        assert_eq!(clamp_window(15, 24, 100, &settings()), Window::new(1, 10));
    }

    #[test]
    fn to_is_clamped_to_count_plus_one() {
        assert_eq!(clamp_window(1, 10, 7, &settings()), Window::new(1, 8));
    }

    #[test]
    fn out_of_range_requests_reset_to_first_page() {
        assert_eq!(clamp_window(0, 10, 100, &settings()), Window::new(1, 10));
        assert_eq!(clamp_window(-9, -1, 100, &settings()), Window::new(1, 10));
        assert_eq!(clamp_window(21, 30, 5, &settings()), Window::new(1, 6));
        assert_eq!(clamp_window(11, 40, 100, &settings()), Window::new(1, 10));
        assert_eq!(clamp_window(11, 20, 100, &settings()), Window::new(11, 20));
    }

    #[test]
    fn clamped_windows_always_hold_the_bounds() {
        let narrow = PaginationSettings {
            max_page_span: 4,
            ..settings()
        };
        for settings in [settings(), narrow] {
            for count in [0u64, 1, 7, 10, 11, 95] {
                for from in -3i64..40 {
                    for to in -3i64..60 {
                        let window = clamp_window(from, to, count, &settings);
                        assert!(1 <= window.from, "{from}/{to}/{count} -> {window:?}");
                        assert!(window.from <= window.to, "{from}/{to}/{count} -> {window:?}");
                        assert!(window.to <= count + 1, "{from}/{to}/{count} -> {window:?}");
                        assert!(window.to - window.from <= settings.max_page_span);
                    }
                }
            }
        }
    }

    #[test]
    fn counts_pages_and_locates_the_current_one() {
        let manager = PaginationManager::new(95, Window::new(31, 40), "/search", &settings());
        assert_eq!(manager.page_count(), 10);
        assert_eq!(manager.current_page(), 4);
        assert!(manager.should_show());

        let empty = PaginationManager::new(0, Window::new(1, 1), "/search", &settings());
        assert_eq!(empty.page_count(), 0);
        assert!(empty.pages().is_empty());
        assert!(!empty.should_show());
    }

    #[test]
    fn sliding_window_with_first_and_last_links() {
        let manager = PaginationManager::new(200, Window::new(91, 100), "/search", &settings());

        let rankings: Vec<_> = manager.pages().iter().map(|p| p.ranking).collect();
        assert_eq!(rankings, vec![6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(manager.first_page().map(|p| p.ranking), Some(0));
        assert_eq!(manager.last_page().map(|p| p.ranking), Some(19));

        let active: Vec<_> = manager.pages().into_iter().filter(|p| p.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!((active[0].from, active[0].to), (91, 100));
    }

    #[test]
    fn window_keeps_its_width_at_both_ends() {
        let first = PaginationManager::new(200, Window::new(1, 10), "/search", &settings());
        let rankings: Vec<_> = first.pages().iter().map(|p| p.ranking).collect();
        assert_eq!(rankings, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(first.first_page().is_none());
        assert_eq!(first.last_page().map(|p| p.ranking), Some(19));

        let second = PaginationManager::new(200, Window::new(11, 20), "/search", &settings());
        assert_eq!(second.pages().first().map(|p| p.ranking), Some(0));
        assert_eq!(second.pages().len(), 7);

        let last = PaginationManager::new(200, Window::new(191, 200), "/search", &settings());
        let rankings: Vec<_> = last.pages().iter().map(|p| p.ranking).collect();
        assert_eq!(rankings, vec![13, 14, 15, 16, 17, 18, 19]);
        assert_eq!(last.first_page().map(|p| p.ranking), Some(0));
        assert!(last.last_page().is_none());
    }

    #[test]
    fn reset_window_respects_a_narrow_page_span() {
        let narrow = PaginationSettings {
            max_page_span: 5,
            ..settings()
        };
        assert_eq!(clamp_window(1, 10, 100, &narrow), Window::new(1, 6));
        assert_eq!(clamp_window(15, 24, 100, &narrow), Window::new(1, 6));
        assert_eq!(clamp_window(1, 10, 3, &narrow), Window::new(1, 4));
    }

    #[test]
    fn short_result_lists_need_no_first_or_last_link() {
        let manager = PaginationManager::new(23, Window::new(1, 10), "/search", &settings());

        let pages = manager.pages();
        assert_eq!(pages.len(), 3);
        assert_eq!((pages[2].from, pages[2].to), (21, 23));
        assert!(manager.first_page().is_none());
        assert!(manager.last_page().is_none());
    }

    #[test]
    fn links_rewrite_from_and_to_and_keep_other_params() {
        let manager = PaginationManager::new(
            30,
            Window::new(1, 10),
            "/entreprises/boulanger?d=10&from=1&to=10&sort=distance",
            &settings(),
        );

        let pages = manager.pages();
        assert_eq!(
            pages[1].url,
            "/entreprises/boulanger?d=10&sort=distance&from=11&to=20"
        );

        let absolute = rewrite_window_params("https://lbb.example/search?q=a", 21, 30);
        assert_eq!(absolute, "https://lbb.example/search?q=a&from=21&to=30");
    }
}
