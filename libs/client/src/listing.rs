//! Note listing: search, sort, favourites filter and pagination

use crate::models::Note;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One entry of the pagination bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    /// Gap after the first page; selecting it jumps to the first page
    LeftEllipsis,
    /// Gap before the last page; selecting it jumps to the last page
    RightEllipsis,
}

/// Pages to show for `total_pages` pages with `current` selected
///
/// With `siblings` pages on each side of the current one, up to
/// `7 + siblings` pages are listed in full; beyond that the bar collapses
/// into ellipses.
pub fn pagination_range(total_pages: usize, current: usize, siblings: usize) -> Vec<PageItem> {
    let pages = |start: usize, end: usize| (start..=end).map(PageItem::Page);

    if 7 + siblings >= total_pages {
        return pages(1, total_pages).collect();
    }

    let left_sibling = current.saturating_sub(siblings).max(1);
    let right_sibling = (current + siblings).min(total_pages);
    let show_left = left_sibling > 1;
    let show_right = right_sibling < total_pages - 1;
    let edge_count = 3 + 2 * siblings;

    match (show_left, show_right) {
        (false, true) => pages(1, edge_count)
            .chain([PageItem::RightEllipsis, PageItem::Page(total_pages)])
            .collect(),
        (true, false) => [PageItem::Page(1), PageItem::LeftEllipsis]
            .into_iter()
            .chain(pages(total_pages - edge_count + 1, total_pages))
            .collect(),
        _ => [PageItem::Page(1), PageItem::LeftEllipsis]
            .into_iter()
            .chain(pages(left_sibling, right_sibling))
            .chain([PageItem::RightEllipsis, PageItem::Page(total_pages)])
            .collect(),
    }
}

/// View state of the notes list
#[derive(Debug, Clone)]
pub struct Listing {
    notes: Vec<Note>,
    search: String,
    oldest_first: bool,
    favourites_only: bool,
    page_size: usize,
    current_page: usize,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            notes: Vec::new(),
            search: String::new(),
            oldest_first: false,
            favourites_only: false,
            page_size: DEFAULT_PAGE_SIZE,
            current_page: 1,
        }
    }
}

impl Listing {
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            notes,
            ..Self::default()
        }
    }

    pub fn set_notes(&mut self, notes: Vec<Note>) {
        self.notes = notes;
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn toggle_sort(&mut self) {
        self.oldest_first = !self.oldest_first;
    }

    pub fn is_oldest_first(&self) -> bool {
        self.oldest_first
    }

    pub fn set_favourites_only(&mut self, favourites_only: bool) {
        self.favourites_only = favourites_only;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Notes matching the search and filter, in display order
    pub fn filtered(&self) -> Vec<&Note> {
        let query = self.search.to_lowercase();
        let mut notes: Vec<&Note> = self
            .notes
            .iter()
            .filter(|note| {
                note.heading.to_lowercase().contains(&query)
                    || note.content.to_lowercase().contains(&query)
            })
            .filter(|note| !self.favourites_only || note.is_favourite)
            .collect();

        if self.oldest_first {
            notes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        } else {
            notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        notes
    }

    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size)
    }

    /// The selected page, pulled back to the last page when the list shrank
    pub fn current_page(&self) -> usize {
        self.current_page.min(self.total_pages()).max(1)
    }

    /// Notes on the current page
    pub fn page(&self) -> Vec<&Note> {
        let start = (self.current_page() - 1) * self.page_size;
        self.filtered()
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page() > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page() < self.total_pages()
    }

    pub fn previous(&mut self) {
        if self.has_previous() {
            self.current_page = self.current_page() - 1;
        }
    }

    pub fn next(&mut self) {
        if self.has_next() {
            self.current_page = self.current_page() + 1;
        }
    }

    /// Select an entry of [`Listing::pagination`]
    pub fn select(&mut self, item: PageItem) {
        self.current_page = match item {
            PageItem::Page(page) => page,
            PageItem::LeftEllipsis => 1,
            PageItem::RightEllipsis => self.total_pages(),
        };
        self.current_page = self.current_page();
    }

    /// The pagination bar for the current state
    pub fn pagination(&self) -> Vec<PageItem> {
        pagination_range(self.total_pages(), self.current_page(), 1)
    }
}
