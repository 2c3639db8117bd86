use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 50;
// Form range validation works on `isize`.
const MAX_PAGE_SIZE: isize = 200;

/// Page selection from the query string. Pages are numbered from 1.
#[derive(Debug, Copy, Clone, FromForm)]
pub struct PaginationRequest {
    #[field(default = 1, validate = range(1..))]
    page_num: u32,
    #[field(default = DEFAULT_PAGE_SIZE, validate = range(1..=MAX_PAGE_SIZE))]
    page_size: u32,
}

impl PaginationRequest {
    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items before this page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page_num - 1) * u64::from(self.page_size)
    }

    /// Wrap a page of results together with how to find the rest.
    pub fn to_paginated<T>(self, total: u64, items: Vec<T>) -> Paginated<T> {
        Paginated {
            items,
            pagination: PaginationResult {
                page_num: self.page_num,
                page_size: self.page_size,
                total,
            },
        }
    }
}

/// A single page of results.
#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationResult,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub page_num: u32,
    pub page_size: u32,
    pub total: u64,
}
