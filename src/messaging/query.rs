//! Message listing filters and page-number pagination.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messaging::types::Message;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Narrows a message listing. Both time bounds are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageFilter {
    pub conversation_id: Option<Uuid>,
    pub sender: Option<String>,
    pub sent_after: Option<NaiveDateTime>,
    pub sent_before: Option<NaiveDateTime>,
}

impl MessageFilter {
    pub fn matches(&self, message: &Message) -> bool {
        self.conversation_id.map_or(true, |id| message.conversation_id == id)
            && self.sender.as_deref().map_or(true, |s| message.sender == s)
            && self.sent_after.map_or(true, |t| message.sent_at >= t)
            && self.sent_before.map_or(true, |t| message.sent_at <= t)
    }
}

/// 1-based page number and page size, both optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// Requested size, falling back to the default for zero and capped at the maximum.
    pub fn size(&self) -> usize {
        match self.page_size {
            Some(0) | None => DEFAULT_PAGE_SIZE,
            Some(size) => size.min(MAX_PAGE_SIZE),
        }
    }

    pub fn number(&self) -> usize {
        self.page.unwrap_or(1)
    }
}

/// One page of results plus the total count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Cut `page` out of `items`. `None` when the page does not exist; the
    /// first page always exists, even when empty.
    pub fn paginate(items: Vec<T>, page: PageRequest) -> Option<Self> {
        let count = items.len();
        let size = page.size();
        let number = page.number();
        let pages = count.div_ceil(size).max(1);
        if number == 0 || number > pages {
            return None;
        }

        let results = items.into_iter().skip((number - 1) * size).take(size).collect();
        Some(Self {
            count,
            page: number,
            page_size: size,
            results,
        })
    }
}
