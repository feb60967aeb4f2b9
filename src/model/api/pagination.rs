use serde::{Deserialize, Serialize};

/// A request for a specific page of results.
#[derive(Debug, Clone, Copy, Eq, PartialEq, FromForm, UriDisplayQuery, Serialize, Deserialize)]
pub struct PaginationRequest {
    /// 1-indexed page number.
    #[field(default = 1)]
    pub page_num: u32,
    /// Number of items per page.
    #[field(default = 50)]
    pub page_size: u32,
}

impl PaginationRequest {
    /// How many items to skip over to reach the requested page.
    pub fn skip(&self) -> u32 {
        self.page_num.saturating_sub(1) * self.page_size
    }

    /// Package a page of items up with its pagination metadata.
    pub fn to_paginated<T>(self, total: u64, items: Vec<T>) -> Paginated<T> {
        Paginated {
            items,
            pagination: PaginationInfo {
                page_num: self.page_num,
                page_size: self.page_size,
                total,
            },
        }
    }
}

/// A single page of results.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

/// Metadata describing a page of results.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page_num: u32,
    pub page_size: u32,
    /// Total number of items across all pages.
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_whole_pages() {
        let pagination = PaginationRequest {
            page_num: 3,
            page_size: 20,
        };
        assert_eq!(pagination.skip(), 40);
    }

    #[test]
    fn page_zero_does_not_underflow() {
        let pagination = PaginationRequest {
            page_num: 0,
            page_size: 20,
        };
        assert_eq!(pagination.skip(), 0);
    }
}
