//! Page/limit pagination arithmetic.

use serde::Deserialize;

/// Limit applied when the caller does not send one.
pub const DEFAULT_PAGE_LIMIT: u32 = 30;

/// Largest limit a caller may request; larger values are clamped.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A 1-indexed page request, as sent in `?page=&limit=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageRequest {
    #[must_use]
    pub const fn new(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Requested page, with 0 and missing treated as 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Requested limit clamped to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    /// Number of records to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }
}

/// Total page count by ceiling division.
#[must_use]
pub const fn page_count(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageRequest::default();
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let page = PageRequest {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), MAX_PAGE_LIMIT);

        let zero_limit = PageRequest {
            page: None,
            limit: Some(0),
        };
        assert_eq!(zero_limit.limit(), 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(2, 30).offset(), 30);
        assert_eq!(PageRequest::new(4, 25).offset(), 75);
    }

    #[test]
    fn test_page_count_ceiling() {
        assert_eq!(page_count(45, 30), 2);
        assert_eq!(page_count(60, 30), 2);
        assert_eq!(page_count(61, 30), 3);
        assert_eq!(page_count(0, 30), 0);
    }
}
