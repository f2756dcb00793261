// File: voltledger-common/src/models/mod.rs

pub mod carbon;
pub mod catalog;
pub mod chat;
pub mod notification;
pub mod payment;
pub mod transaction;
pub mod usage;
pub mod user;
pub mod wallet;

pub use carbon::*;
pub use catalog::*;
pub use chat::*;
pub use notification::*;
pub use payment::*;
pub use transaction::*;
pub use usage::*;
pub use user::*;
pub use wallet::*;

use serde::{Deserialize, Serialize};

/// 1-based page request. `limit` is clamped to `MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, req: PageRequest, total: i64) -> Self {
        let limit = req.limit.max(1) as i64;
        Self {
            items,
            page: req.page,
            limit: req.limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}
