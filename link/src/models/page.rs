//! Pagination wire types.
//!
//! [`PaginatedResponse`] is what list endpoints return; [`Page`] is the subset
//! the [`PaginatedAccumulator`](crate::PaginatedAccumulator) consumes.

use serde::{Deserialize, Serialize};

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// One page of results, as consumed by the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// 1-based page number
    pub page_number: u32,
    /// Requested page size
    pub page_size: u32,
    /// Items in server order
    pub items: Vec<T>,
    /// Whether the server has another page after this one
    pub has_next_page: bool,
}

impl<T> Page<T> {
    /// Build a page.
    pub fn new(page_number: u32, page_size: u32, items: Vec<T>, has_next_page: bool) -> Self {
        Self {
            page_number,
            page_size,
            items,
            has_next_page,
        }
    }

    /// Whether this is the first page of a result set.
    pub fn is_first(&self) -> bool {
        self.page_number <= 1
    }
}

/// Paginated list response returned by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    /// Items on this page
    pub data: Vec<T>,
    /// Another page follows
    pub has_next_page: bool,
    /// A page precedes this one
    #[serde(default)]
    pub has_previous_page: bool,
    /// 1-based page number
    pub page: u32,
    /// Page size used by the server
    pub page_size: u32,
    /// Total items across all pages
    #[serde(default)]
    pub total_items: u64,
    /// Total number of pages
    #[serde(default)]
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    /// Drop the informational fields and keep what the accumulator needs.
    pub fn into_page(self) -> Page<T> {
        Page {
            page_number: self.page,
            page_size: self.page_size,
            items: self.data,
            has_next_page: self.has_next_page,
        }
    }
}

impl<T> From<PaginatedResponse<T>> for Page<T> {
    fn from(response: PaginatedResponse<T>) -> Self {
        response.into_page()
    }
}

/// Page cursor sent with list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    /// Items per page
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Cursor for `page`, clamped to the valid ranges (`page >= 1`, `page_size > 0`).
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Query-string pairs for this cursor.
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [("page", self.page.to_string()), ("pageSize", self.page_size.to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginated_response_into_page() {
        let raw = r#"{
            "data": [1, 2, 3],
            "hasNextPage": true,
            "hasPreviousPage": false,
            "page": 1,
            "pageSize": 3,
            "totalItems": 10,
            "totalPages": 4
        }"#;
        let response: PaginatedResponse<u32> = serde_json::from_str(raw).unwrap();
        assert_eq!(response.total_pages, 4);

        let page = response.into_page();
        assert_eq!(page.page_number, 1);
        assert_eq!(page.items, vec![1, 2, 3]);
        assert!(page.has_next_page);
        assert!(page.is_first());
    }

    #[test]
    fn test_informational_fields_are_optional() {
        let raw = r#"{"data": [], "hasNextPage": false, "page": 2, "pageSize": 20}"#;
        let response: PaginatedResponse<u32> = serde_json::from_str(raw).unwrap();
        assert_eq!(response.total_items, 0);
        assert!(!response.has_previous_page);
    }

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest::new(0, 0);
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 1);
        assert_eq!(PageRequest::default().page_size, DEFAULT_PAGE_SIZE);
    }
}
