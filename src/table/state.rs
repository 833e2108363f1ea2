use std::ops::Range;

use super::types::PaginationResponse;

pub struct PaginationInput {
    pub total_records: u64,
    pub per_page: usize,
    pub per_page_options: Vec<usize>,
    pub page: usize,
}

/// Resolved paging of a table: page count, current page and the row window
/// of that page.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaginationState {
    pub per_page_options: Vec<usize>,
    pub per_page: usize,
    pub page_count: usize,
    /// One-based, clamped to `1..=page_count`.
    pub page: usize,
    pub total_records: u64,
    pub window_start: usize,
    pub window_count: usize,
}

impl PaginationState {
    pub fn resolve(input: PaginationInput) -> Self {
        let per_page = input.per_page.max(1);
        let mut per_page_options = input
            .per_page_options
            .into_iter()
            .map(|value| value.max(1))
            .collect::<Vec<_>>();
        if !per_page_options.contains(&per_page) {
            per_page_options.push(per_page);
        }
        per_page_options.sort_unstable();
        per_page_options.dedup();

        let total = usize::try_from(input.total_records).unwrap_or(usize::MAX);
        let page_count = total.div_ceil(per_page).max(1);
        let page = input.page.clamp(1, page_count);

        Self {
            per_page_options,
            per_page,
            page_count,
            page,
            total_records: input.total_records,
            window_start: (page - 1).saturating_mul(per_page),
            window_count: per_page,
        }
    }

    /// State reported by a server page. A negative `per_page` means every
    /// record fits on one page.
    pub fn from_response<T>(response: &PaginationResponse<T>, per_page_options: Vec<usize>) -> Self {
        let per_page = usize::try_from(response.per_page)
            .ok()
            .filter(|per_page| *per_page > 0)
            .unwrap_or_else(|| usize::try_from(response.total_records).unwrap_or(usize::MAX));
        Self::resolve(PaginationInput {
            total_records: response.total_records,
            per_page,
            per_page_options,
            page: usize::try_from(response.current_page).unwrap_or(1),
        })
    }

    /// Row indexes of the current page within `total_rows` loaded rows.
    pub fn row_window(&self, total_rows: usize) -> Range<usize> {
        let start = self.window_start.min(total_rows);
        let end = self.window_start.saturating_add(self.window_count).min(total_rows);
        start..end
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }

    /// First and last one-based record numbers shown on the page; zeros when
    /// there are no records.
    pub fn record_range(&self) -> (u64, u64) {
        if self.total_records == 0 {
            return (0, 0);
        }
        let first = self.window_start as u64 + 1;
        let last = (self.window_start as u64 + self.window_count as u64).min(self.total_records);
        (first, last)
    }
}
