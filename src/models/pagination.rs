//! Pagination types shared by every list query

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create pagination parameters, clamping `page` to at least 1 and
    /// `per_page` to `1..=100`.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Row offset for `LIMIT ? OFFSET ?`
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// One page of results plus the total across all pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Number of pages needed for `total` items; 0 when there are none.
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        u32::try_from((self.total + per_page - 1) / per_page).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Convert the items while keeping the page metadata
    pub fn map<U, F>(self, f: F) -> PagedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_clamps_values() {
        let params = ListParams::new(0, 0);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 1);

        let params = ListParams::new(3, 500);
        assert_eq!(params.page, 3);
        assert_eq!(params.per_page, 100);
    }

    #[test]
    fn test_list_params_offset() {
        assert_eq!(ListParams::new(1, 10).offset(), 0);
        assert_eq!(ListParams::new(3, 10).offset(), 20);
        assert_eq!(ListParams::new(2, 25).limit(), 25);
    }

    #[test]
    fn test_paged_result_navigation() {
        let params = ListParams::new(2, 10);
        let result = PagedResult::new(vec![1, 2, 3], 23, &params);

        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next());
        assert!(result.has_prev());
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_paged_result_empty() {
        let result: PagedResult<i32> = PagedResult::default();
        assert_eq!(result.total_pages(), 0);
        assert!(!result.has_next());
        assert!(!result.has_prev());
        assert!(result.is_empty());
    }

    #[test]
    fn test_paged_result_map_keeps_metadata() {
        let params = ListParams::new(1, 2);
        let result = PagedResult::new(vec![1, 2], 5, &params).map(|n| n.to_string());

        assert_eq!(result.items, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(result.total, 5);
        assert_eq!(result.total_pages(), 3);
    }
}
