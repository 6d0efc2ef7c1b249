use crate::{Error, Result};

/// Default number of rows per page.
pub const DEFAULT_ROWS_PER_PAGE: usize = 1_000_000;

/// Default number of pages per file.
pub const DEFAULT_PAGES_PER_FILE: usize = 5;

/// Capacity limits of a [`PagedSink`](crate::PagedSink).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkLimits {
    rows_per_page: usize,
    pages_per_file: usize,
}

impl SinkLimits {
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if either limit is zero.
    pub fn new(rows_per_page: usize, pages_per_file: usize) -> Result<Self> {
        if rows_per_page == 0 {
            return Err(Error::invalid("rows per page must be greater than 0"));
        }
        if pages_per_file == 0 {
            return Err(Error::invalid("pages per file must be greater than 0"));
        }
        Ok(Self {
            rows_per_page,
            pages_per_file,
        })
    }

    pub const fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    pub const fn pages_per_file(&self) -> usize {
        self.pages_per_file
    }

    /// Maximum number of rows a single file can hold.
    pub const fn rows_per_file(&self) -> usize {
        self.rows_per_page.saturating_mul(self.pages_per_file)
    }
}

impl Default for SinkLimits {
    fn default() -> Self {
        Self {
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            pages_per_file: DEFAULT_PAGES_PER_FILE,
        }
    }
}
