//! This modules defines the common functionality for paging data.

use crate::Error;

/// The config for pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may request.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 50,
            max_page_size: 100,
        }
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// The 1-based page number.
    pub number: u64,
    /// The number of items per page.
    pub size: u64,
}

impl Page {
    /// The number of rows to skip to reach this page.
    ///
    /// Pages too far out to count rows for saturate at [i64::MAX], which is
    /// past the end of any table.
    pub fn offset(&self) -> i64 {
        let offset = self.number.saturating_sub(1).saturating_mul(self.size);

        i64::try_from(offset).unwrap_or(i64::MAX)
    }
}

impl PaginationConfig {
    /// Fill in defaults for `page` and `size` and check that they are in range.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidPagination] if `page` is zero or `size` is not
    /// between 1 and [PaginationConfig::max_page_size].
    pub fn page(&self, page: Option<u64>, size: Option<u64>) -> Result<Page, Error> {
        let number = page.unwrap_or(self.default_page);
        let size = size.unwrap_or(self.default_page_size);

        if number < 1 {
            return Err(Error::InvalidPagination("page must be at least 1".to_owned()));
        }

        if !(1..=self.max_page_size).contains(&size) {
            return Err(Error::InvalidPagination(format!(
                "size must be between 1 and {}",
                self.max_page_size
            )));
        }

        Ok(Page { number, size })
    }
}

/// The number of pages needed to show `total` items `page_size` at a time.
pub fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }

    total.div_ceil(page_size)
}
