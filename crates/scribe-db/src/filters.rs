use scribe_types::envelope::Pagination;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
const MAX_PAGE: u32 = 10_000_000;

/// Page/size request for list endpoints. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filters {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Filters {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        let defaults = Self::default();
        Self {
            page: page.unwrap_or(defaults.page),
            page_size: page_size.unwrap_or(defaults.page_size),
        }
    }

    /// `(field, message)` pairs, empty when the filters are usable.
    pub fn validate(&self) -> Vec<(&'static str, String)> {
        let mut errors = Vec::new();
        if self.page == 0 || self.page > MAX_PAGE {
            errors.push(("page", format!("page must be between 1 and {MAX_PAGE}")));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            errors.push((
                "page_size",
                format!("page_size must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        errors
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

pub fn calculate_metadata(total_records: u64, page: u32, page_size: u32) -> Pagination {
    if total_records == 0 || page_size == 0 {
        return Pagination::default();
    }
    Pagination {
        current_page: page,
        page_size,
        first_page: 1,
        last_page: total_records.div_ceil(u64::from(page_size)) as u32,
        total_records,
    }
}
