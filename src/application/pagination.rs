//! Page-number pagination over counted result sets.

use std::num::NonZeroU32;

use thiserror::Error;

use crate::application::repos::PageRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page number `{0}` is not an integer")]
    NotAnInteger(String),
    #[error("page number is less than 1")]
    LessThanOne,
    #[error("page {requested} contains no results (last page is {last})")]
    OutOfRange { requested: u64, last: u64 },
}

/// Page requested by the client: an explicit number or the literal `last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    Number(u64),
    Last,
}

impl PageSelector {
    /// Absent or blank values select the first page.
    pub fn parse(raw: Option<&str>) -> Result<Self, PaginationError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::Number(1)),
            Some("last") => Ok(Self::Last),
            Some(value) => value
                .parse::<u64>()
                .map(Self::Number)
                .map_err(|_| PaginationError::NotAnInteger(value.to_string())),
        }
    }
}

impl Default for PageSelector {
    fn default() -> Self {
        Self::Number(1)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: NonZeroU32,
    total: u64,
}

impl Paginator {
    pub fn new(per_page: NonZeroU32, total: u64) -> Self {
        Self { per_page, total }
    }

    /// An empty result set still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        let per_page = u64::from(self.per_page.get());
        self.total.div_ceil(per_page).max(1)
    }

    pub fn page(&self, selector: PageSelector) -> Result<PageWindow, PaginationError> {
        let last = self.num_pages();
        let number = match selector {
            PageSelector::Number(0) => return Err(PaginationError::LessThanOne),
            PageSelector::Number(number) => number,
            PageSelector::Last => last,
        };

        if number > last {
            return Err(PaginationError::OutOfRange {
                requested: number,
                last,
            });
        }

        Ok(PageWindow {
            number,
            num_pages: last,
            per_page: self.per_page.get(),
            total: self.total,
        })
    }
}

/// A validated page of a counted result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub per_page: u32,
    pub total: u64,
}

impl PageWindow {
    pub fn request(&self) -> PageRequest {
        let offset = (self.number - 1).saturating_mul(u64::from(self.per_page));
        PageRequest::new(self.per_page, offset)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}
