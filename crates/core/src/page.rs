//! Paging for list endpoints (1-based `current` page, table-client style).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_current")]
    pub current: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_current() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            current: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(current: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            current: current.unwrap_or(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
        .normalized()
    }

    /// Clamp to `current >= 1` and `1 <= page_size <= MAX_PAGE_SIZE`.
    pub fn normalized(self) -> Self {
        Self {
            current: self.current.max(1),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        let n = self.normalized();
        (n.current as usize - 1) * n.page_size as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub current: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            current: self.current,
            page_size: self.page_size,
        }
    }
}

/// Inclusive date range check used by list filters; open ends match anything.
pub fn date_in_range(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    from.is_none_or(|f| date >= f) && to.is_none_or(|t| date <= t)
}

/// Slice an already filtered and ordered list into a page.
pub fn paginate<T>(items: Vec<T>, request: &PageRequest) -> Page<T> {
    let request = request.normalized();
    let total = items.len() as u64;
    let data = items
        .into_iter()
        .skip(request.offset())
        .take(request.page_size as usize)
        .collect();
    Page {
        data,
        total,
        current: request.current,
        page_size: request.page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_requested_page() {
        let page = paginate((1..=45).collect::<Vec<_>>(), &PageRequest::new(Some(3), Some(20)));
        assert_eq!(page.total, 45);
        assert_eq!(page.data, (41..=45).collect::<Vec<_>>());
    }

    #[test]
    fn clamps_out_of_range_requests() {
        let req = PageRequest::new(Some(0), Some(10_000));
        assert_eq!(req.current, 1);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);

        let page = paginate(vec![1, 2, 3], &PageRequest::new(Some(9), Some(2)));
        assert!(page.data.is_empty());
        assert_eq!(page.total, 3);
    }
}
