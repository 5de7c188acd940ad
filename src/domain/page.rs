//! Pagination parameters for transaction reads.

use serde::Deserialize;

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 500;

/// Zero-based page request. `page_size` is clamped to [1, 500].
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Page size after clamping.
    pub fn limit(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Offset into the ordered sequence.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.limit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p: PageParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p.page, 0);
        assert_eq!(p.limit(), 50);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(PageParams::new(0, 0).limit(), 1);
        assert_eq!(PageParams::new(0, 9999).limit(), 500);
        assert_eq!(PageParams::new(3, 9999).offset(), 1500);
    }

    #[test]
    fn test_offset_is_zero_based() {
        assert_eq!(PageParams::new(2, 50).offset(), 100);
    }
}
