//! `?page=&per_page=` query parameters for paged admin listings.

use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, IntoParams)]
#[serde(default)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Zero-based page index and a page size clamped to `1..=MAX_PER_PAGE`.
    pub fn normalize(self) -> (u64, u64) {
        let page = self.page.max(1);
        let per_page = self.per_page.clamp(1, MAX_PER_PAGE);
        ((page - 1) as u64, per_page as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: DEFAULT_PER_PAGE } }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, opts: Pagination) -> Self {
        let (idx, per_page) = opts.normalize();
        Self { items, total, page: idx as u32 + 1, per_page: per_page as u32 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_fall_back_to_first_page_of_one() {
        assert_eq!(Pagination { page: 0, per_page: 0 }.normalize(), (0, 1));
    }

    #[test]
    fn page_size_is_capped() {
        assert_eq!(Pagination { page: 5, per_page: 1000 }.normalize(), (4, 100));
    }

    #[test]
    fn page_echoes_normalized_values() {
        let p: Page<i32> = Page::new(vec![1, 2], 7, Pagination { page: 0, per_page: 500 });
        assert_eq!((p.page, p.per_page, p.total), (1, 100, 7));
    }
}
