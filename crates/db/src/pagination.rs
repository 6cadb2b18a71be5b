//! Page-number pagination.
//!
//! Listings are split into fixed-size pages addressed by a 1-based number
//! taken from the `page` query parameter. Resolution is forgiving: a missing
//! or non-numeric value yields the first page and an out-of-range number
//! yields the last one, so a listing never answers 404 because of `?page=`.

use serde::Serialize;

/// One page of an ordered listing plus the metadata needed to render
/// navigation links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page, in listing order.
    pub items: Vec<T>,
    /// 1-based page number.
    pub number: u64,
    /// Total number of pages (at least 1).
    pub num_pages: u64,
    /// Total number of items across all pages.
    pub count: u64,
    /// Page size.
    pub per_page: u64,
}

impl<T> Page<T> {
    /// Create a page from already-fetched items.
    #[must_use]
    pub const fn new(items: Vec<T>, number: u64, num_pages: u64, count: u64, per_page: u64) -> Self {
        Self {
            items,
            number,
            num_pages,
            count,
            per_page,
        }
    }

    /// The single page of an empty listing.
    #[must_use]
    pub const fn empty(per_page: u64) -> Self {
        Self::new(Vec::new(), 1, 1, 0, per_page)
    }

    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Whether there is more than one page.
    #[must_use]
    pub const fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    /// Number of the next page, if any.
    #[must_use]
    pub const fn next_page_number(&self) -> Option<u64> {
        if self.has_next() {
            Some(self.number + 1)
        } else {
            None
        }
    }

    /// Number of the previous page, if any.
    #[must_use]
    pub const fn previous_page_number(&self) -> Option<u64> {
        if self.has_previous() {
            Some(self.number - 1)
        } else {
            None
        }
    }

    /// 1-based index of the first item on this page, 0 for an empty page.
    #[must_use]
    pub const fn start_index(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            (self.number - 1) * self.per_page + 1
        }
    }

    /// 1-based index of the last item on this page, 0 for an empty page.
    #[must_use]
    pub const fn end_index(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.start_index() + self.items.len() as u64 - 1
        }
    }

    /// Number of items on this page.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page holds no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Transform the items, keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
        }
    }

    /// Page numbers `1..=num_pages`, for navigation links.
    pub fn page_range(&self) -> impl Iterator<Item = u64> {
        1..=self.num_pages
    }

    /// Zero-based row offset of this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }
}

/// Number of pages needed for `count` items; an empty listing still has
/// one (empty) page.
#[must_use]
pub const fn num_pages(count: u64, per_page: u64) -> u64 {
    if per_page == 0 || count == 0 {
        return 1;
    }
    count.div_ceil(per_page)
}

/// Resolve the requested page number against the number of pages.
///
/// - absent or not an integer: page 1
/// - integer below 1 or above `num_pages`: the last page
/// - otherwise the requested page
#[must_use]
pub fn resolve_page_number(requested: Option<&str>, num_pages: u64) -> u64 {
    let num_pages = num_pages.max(1);

    let Some(raw) = requested else {
        return 1;
    };

    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 && (n as u64) <= num_pages => n as u64,
        Ok(_) => num_pages,
        // Too many digits for i64 is still an integer, just out of range
        Err(_) if is_integer(raw) => num_pages,
        Err(_) => 1,
    }
}

/// Optional sign followed by at least one ASCII digit.
fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
