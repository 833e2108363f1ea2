use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::filters::combine_filters;
use super::state::{PaginationInput, PaginationState};
use super::types::{
    DataProvider, DataProviderEvent, Sort, SortDirection, TableError, TableResult, ToolbarFilter,
};
use crate::form::FieldValue;

#[derive(Clone, Debug, PartialEq)]
pub struct ServerTableOptions {
    pub per_page: usize,
    pub per_page_options: Vec<usize>,
    pub initial_sorts: Vec<Sort>,
    /// Applied to every request and never cleared by the user.
    pub fixed_filters: Vec<ToolbarFilter>,
    pub initial_filters: Vec<ToolbarFilter>,
    /// Several sort fields at once instead of one.
    pub multi_sort: bool,
}

impl Default for ServerTableOptions {
    fn default() -> Self {
        Self {
            per_page: 25,
            per_page_options: vec![10, 25, 50, 100],
            initial_sorts: Vec::new(),
            fixed_filters: Vec::new(),
            initial_filters: Vec::new(),
            multi_sort: false,
        }
    }
}

struct TableStore {
    page: usize,
    per_page: usize,
    sorts: Vec<Sort>,
    filters: Vec<ToolbarFilter>,
    records: Vec<FieldValue>,
    total_records: u64,
    loading: bool,
}

/// Server-paginated table state driven by a [`DataProvider`]. Clones share
/// the same state.
pub struct ServerTable<P> {
    provider: Arc<P>,
    options: Arc<ServerTableOptions>,
    state: Arc<RwLock<TableStore>>,
}

impl<P> Clone for ServerTable<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            options: self.options.clone(),
            state: self.state.clone(),
        }
    }
}

impl<P: DataProvider> ServerTable<P> {
    pub fn new(provider: P, options: ServerTableOptions) -> Self {
        let state = TableStore {
            page: 1,
            per_page: options.per_page.max(1),
            sorts: options.initial_sorts.clone(),
            filters: options.initial_filters.clone(),
            records: Vec::new(),
            total_records: 0,
            loading: false,
        };
        Self {
            provider: Arc::new(provider),
            options: Arc::new(options),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Request for the current page, sorts and filters.
    pub fn event(&self) -> TableResult<DataProviderEvent> {
        let state = read_lock(&self.state, "building provider event")?;
        Ok(DataProviderEvent {
            page: state.page as u64,
            per_page: i64::try_from(state.per_page).unwrap_or(i64::MAX),
            sorts: state.sorts.clone(),
            filters: combine_filters(&self.options.fixed_filters, &state.filters),
        })
    }

    /// Fetches the current page. Returns `false` when a load is already
    /// running.
    pub async fn load(&self) -> TableResult<bool> {
        {
            let mut state = write_lock(&self.state, "starting table load")?;
            if state.loading {
                return Ok(false);
            }
            state.loading = true;
        }

        let mut loading = LoadingReset::new(&self.state);
        let event = self.event()?;
        tracing::debug!(page = event.page, per_page = event.per_page, "loading table page");
        let response = self.provider.fetch_page(event).await;

        let mut state = write_lock(&self.state, "storing table page")?;
        state.loading = false;
        loading.disarm();
        let response = match response {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "table page load failed");
                return Err(error);
            }
        };
        state.total_records = response.total_records;
        if let Ok(page) = usize::try_from(response.current_page) {
            state.page = page.max(1);
        }
        state.records = response.data;
        Ok(true)
    }

    pub fn set_page(&self, page: usize) -> TableResult<()> {
        let mut state = write_lock(&self.state, "changing page")?;
        state.page = page.max(1);
        Ok(())
    }

    /// Changes the page size and goes back to the first page.
    pub fn set_per_page(&self, per_page: usize) -> TableResult<()> {
        let mut state = write_lock(&self.state, "changing page size")?;
        state.per_page = per_page.max(1);
        state.page = 1;
        Ok(())
    }

    pub fn set_sorts(&self, sorts: Vec<Sort>) -> TableResult<()> {
        write_lock(&self.state, "replacing sorts")?.sorts = sorts;
        Ok(())
    }

    /// Cycles a field through ascending, descending and unsorted.
    pub fn toggle_sort(&self, field: &str) -> TableResult<()> {
        let mut state = write_lock(&self.state, "toggling sort")?;
        let position = state.sorts.iter().position(|sort| sort.field == field);
        match position {
            Some(index) if state.sorts[index].direction == SortDirection::Asc => {
                state.sorts[index].direction = SortDirection::Desc;
            }
            Some(index) => {
                state.sorts.remove(index);
            }
            None => {
                if !self.options.multi_sort {
                    state.sorts.clear();
                }
                state.sorts.push(Sort::asc(field));
            }
        }
        Ok(())
    }

    /// Replaces the user filters and goes back to the first page.
    pub fn set_filters(&self, filters: Vec<ToolbarFilter>) -> TableResult<()> {
        let mut state = write_lock(&self.state, "replacing filters")?;
        state.filters = filters;
        state.page = 1;
        Ok(())
    }

    pub fn sorts(&self) -> TableResult<Vec<Sort>> {
        Ok(read_lock(&self.state, "reading sorts")?.sorts.clone())
    }

    pub fn filters(&self) -> TableResult<Vec<ToolbarFilter>> {
        Ok(read_lock(&self.state, "reading filters")?.filters.clone())
    }

    pub fn records(&self) -> TableResult<Vec<FieldValue>> {
        Ok(read_lock(&self.state, "reading records")?.records.clone())
    }

    pub fn is_loading(&self) -> TableResult<bool> {
        Ok(read_lock(&self.state, "reading loading flag")?.loading)
    }

    pub fn pagination(&self) -> TableResult<PaginationState> {
        let state = read_lock(&self.state, "resolving pagination")?;
        Ok(PaginationState::resolve(PaginationInput {
            total_records: state.total_records,
            per_page: state.per_page,
            per_page_options: self.options.per_page_options.clone(),
            page: state.page,
        }))
    }
}

/// Clears the loading flag when a load ends early, including when its future
/// is dropped before the provider answers.
struct LoadingReset<'a> {
    state: &'a RwLock<TableStore>,
    armed: bool,
}

impl<'a> LoadingReset<'a> {
    fn new(state: &'a RwLock<TableStore>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingReset<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.loading = false;
        tracing::debug!("table load abandoned");
    }
}

fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> TableResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| TableError::StatePoisoned(context))
}

fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> TableResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| TableError::StatePoisoned(context))
}
