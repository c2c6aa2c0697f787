use serde::Serialize;

use crate::error::IntakeError;

/// 1-indexed page selection. Construct through [`PageRequest::new`] so a
/// zero page or page size never reaches a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Result<Self, IntakeError> {
        if page <= 0 {
            return Err(IntakeError::Validation(format!("page must be at least 1, got {page}")));
        }
        if page_size <= 0 {
            return Err(IntakeError::Validation(format!(
                "page size must be at least 1, got {page_size}"
            )));
        }
        let page = u32::try_from(page)
            .map_err(|_| IntakeError::Validation(format!("page {page} is out of range")))?;
        let page_size = u32::try_from(page_size)
            .map_err(|_| IntakeError::Validation(format!("page size {page_size} is out of range")))?;
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        let size = i64::from(self.page_size.max(1));
        (self.total + size - 1) / size
    }
}
