use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures_timer::Delay;
use serde::Serialize;

use super::{label_text, list_key};
use crate::form::FieldValue;
use crate::subscription::{Registry, Subscription};
use crate::table::{MatchMode, SortDirection, ToolbarFilter};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ListError {
    StatePoisoned(&'static str),
    Source(String),
}

impl Display for ListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ListError::StatePoisoned(context) => {
                write!(f, "list state lock poisoned while {context}")
            }
            ListError::Source(error) => write!(f, "list source failed: {error}"),
        }
    }
}

impl std::error::Error for ListError {}

pub type ListResult<T> = Result<T, ListError>;

/// Request sent to a [`ListSource`]. `per_page == -1` asks for every item.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub per_page: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<ToolbarFilter>,
}

pub type BoxedListFuture = Pin<Box<dyn Future<Output = ListResult<Vec<FieldValue>>> + Send>>;

/// Where a [`ListStore`] loads its items from, typically an HTTP endpoint.
pub trait ListSource: Send + Sync + 'static {
    fn fetch(&self, query: ListQuery) -> BoxedListFuture;
}

impl<F, Fut> ListSource for F
where
    F: Fn(ListQuery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ListResult<Vec<FieldValue>>> + Send + 'static,
{
    fn fetch(&self, query: ListQuery) -> BoxedListFuture {
        Box::pin(self(query))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListStoreOptions {
    pub id_property: String,
    pub label_property: String,
    pub is_active_property: String,
    pub disabled_property: String,
    /// `None` keeps the source order.
    pub sort_by: Option<String>,
    pub sort_direction: SortDirection,
    /// Only active items are requested unless inactive ones are included.
    pub has_active_items: bool,
    /// Property holding nested items, flattened by [`ListStore::flat_list`].
    pub children_property: Option<String>,
    pub refreshable: bool,
    pub refresh_minutes: u64,
}

impl Default for ListStoreOptions {
    fn default() -> Self {
        Self {
            id_property: "id".to_string(),
            label_property: "name".to_string(),
            is_active_property: "is_active".to_string(),
            disabled_property: "disabled".to_string(),
            sort_by: Some("uses".to_string()),
            sort_direction: SortDirection::Asc,
            has_active_items: false,
            children_property: None,
            refreshable: true,
            refresh_minutes: 5,
        }
    }
}

pub type RefreshCallback = Arc<dyn Fn(&[FieldValue]) + Send + Sync>;

#[derive(Default)]
struct ListState {
    items: Option<Vec<FieldValue>>,
    loading: bool,
    include_inactive: bool,
}

/// Cached list loaded from a [`ListSource`]. Clones share the cache.
pub struct ListStore<S> {
    source: Arc<S>,
    options: Arc<ListStoreOptions>,
    state: Arc<RwLock<ListState>>,
    callbacks: Arc<Registry<RefreshCallback>>,
}

impl<S> Clone for ListStore<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            options: self.options.clone(),
            state: self.state.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<S: ListSource> ListStore<S> {
    pub fn new(source: S, options: ListStoreOptions) -> Self {
        Self {
            source: Arc::new(source),
            options: Arc::new(options),
            state: Arc::new(RwLock::new(ListState::default())),
            callbacks: Registry::new(),
        }
    }

    pub fn options(&self) -> &ListStoreOptions {
        &self.options
    }

    /// Reloads the items. Returns `false` without fetching when a refresh is
    /// already running.
    pub async fn refresh(&self) -> ListResult<bool> {
        let include_inactive = {
            let mut state = write_lock(&self.state, "starting list refresh")?;
            if state.loading {
                return Ok(false);
            }
            state.loading = true;
            state.include_inactive
        };

        let mut loading = LoadingReset::new(&self.state);
        let query = self.query(include_inactive);
        let fetched = self.source.fetch(query).await;

        let items = {
            let mut state = write_lock(&self.state, "storing list items")?;
            state.loading = false;
            loading.disarm();
            let mut items = match fetched {
                Ok(items) => items,
                Err(error) => {
                    tracing::warn!(%error, "list refresh failed");
                    return Err(error);
                }
            };
            if let Some(property) = &self.options.sort_by {
                sort_items(&mut items, property, self.options.sort_direction);
            }
            state.items = Some(items.clone());
            items
        };
        tracing::debug!(items = items.len(), "list refreshed");

        for callback in self.callbacks.collect(|callback| Some(callback.clone())) {
            callback(&items);
        }
        Ok(true)
    }

    pub async fn refresh_if_not_initialized(&self) -> ListResult<()> {
        if !self.is_initialized()? {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Switches whether inactive items are requested and refreshes when the
    /// setting changed.
    pub async fn include_inactive(&self, include: bool) -> ListResult<()> {
        {
            let mut state = write_lock(&self.state, "toggling inactive items")?;
            if state.include_inactive == include {
                return Ok(());
            }
            state.include_inactive = include;
        }
        self.refresh().await.map(|_| ())
    }

    /// Refreshes every `refresh_minutes` until the returned future is
    /// dropped. Returns at once for stores that are not refreshable.
    pub async fn run_refresh_loop(&self) {
        if !self.options.refreshable {
            return;
        }
        let period = Duration::from_secs(self.options.refresh_minutes.max(1) * 60);
        loop {
            Delay::new(period).await;
            if let Err(error) = self.refresh().await {
                tracing::warn!(%error, "scheduled list refresh failed");
            }
        }
    }

    /// Calls `callback` with the items after every successful refresh until
    /// the guard is dropped.
    pub fn on_refresh(
        &self,
        callback: impl Fn(&[FieldValue]) + Send + Sync + 'static,
    ) -> Subscription {
        let callback: RefreshCallback = Arc::new(callback);
        self.callbacks.insert(callback)
    }

    pub fn is_initialized(&self) -> ListResult<bool> {
        Ok(read_lock(&self.state, "reading list state")?.items.is_some())
    }

    pub fn is_loading(&self) -> ListResult<bool> {
        Ok(read_lock(&self.state, "reading list state")?.loading)
    }

    /// Loaded items, empty until the first refresh.
    pub fn items(&self) -> ListResult<Vec<FieldValue>> {
        Ok(read_lock(&self.state, "reading list items")?
            .items
            .clone()
            .unwrap_or_default())
    }

    pub fn active_items(&self) -> ListResult<Vec<FieldValue>> {
        let property = &self.options.is_active_property;
        Ok(self
            .items()?
            .into_iter()
            .filter(|item| item.get(property) == Some(&FieldValue::Bool(true)))
            .collect())
    }

    /// Every item, with the disabled property set on the inactive ones.
    pub fn inactive_as_disabled_items(&self) -> ListResult<Vec<FieldValue>> {
        let options = &self.options;
        Ok(self
            .items()?
            .into_iter()
            .map(|mut item| {
                let active = item.get(&options.is_active_property) == Some(&FieldValue::Bool(true));
                if let FieldValue::Object(map) = &mut item {
                    map.insert(options.disabled_property.clone(), FieldValue::Bool(!active));
                }
                item
            })
            .collect())
    }

    pub fn key_label_pairs(&self) -> ListResult<BTreeMap<String, String>> {
        let options = &self.options;
        Ok(self
            .items()?
            .iter()
            .filter_map(|item| {
                let id = item.get(&options.id_property)?;
                let label = item
                    .get(&options.label_property)
                    .map(label_text)
                    .unwrap_or_default();
                Some((list_key(id), label))
            })
            .collect())
    }

    pub fn key_item_pairs(&self) -> ListResult<BTreeMap<String, FieldValue>> {
        Ok(key_by(self.items()?, &self.options.id_property))
    }

    /// Items with their nested children flattened depth first. Each entry
    /// loses its children property.
    pub fn flat_list(&self) -> ListResult<Vec<FieldValue>> {
        let items = self.items()?;
        let Some(children) = &self.options.children_property else {
            return Ok(items);
        };
        let mut flat = Vec::with_capacity(items.len());
        for item in items {
            flatten_into(item, children, &mut flat);
        }
        Ok(flat)
    }

    pub fn key_item_pairs_flat(&self) -> ListResult<BTreeMap<String, FieldValue>> {
        Ok(key_by(self.flat_list()?, &self.options.id_property))
    }

    /// Label for an id, or for an item object carrying the id property.
    pub fn label_for(&self, id: &FieldValue) -> ListResult<Option<String>> {
        let id = match id {
            FieldValue::Object(map) => match map.get(&self.options.id_property) {
                Some(id) => id,
                None => return Ok(None),
            },
            other => other,
        };
        Ok(self.key_label_pairs()?.remove(&list_key(id)))
    }

    /// First item whose `id_property` (default `"id"`) matches `id` by its
    /// key, so `1` and `"1"` find the same item.
    pub fn get_item_by_id(
        &self,
        id: &FieldValue,
        id_property: Option<&str>,
    ) -> ListResult<Option<FieldValue>> {
        let property = id_property.unwrap_or("id");
        let key = list_key(id);
        Ok(self
            .items()?
            .into_iter()
            .find(|item| item.get(property).map(list_key).as_ref() == Some(&key)))
    }

    fn query(&self, include_inactive: bool) -> ListQuery {
        let filters = (self.options.has_active_items && !include_inactive).then(|| {
            ToolbarFilter::and([ToolbarFilter::value(
                self.options.is_active_property.clone(),
                1,
                MatchMode::Equals,
            )])
        });
        ListQuery {
            per_page: -1,
            filters,
        }
    }
}

/// Clears the loading flag unless the refresh finished normally, so a
/// dropped or failed refresh never blocks the next one.
struct LoadingReset<'a> {
    state: &'a RwLock<ListState>,
    armed: bool,
}

impl<'a> LoadingReset<'a> {
    fn new(state: &'a RwLock<ListState>) -> Self {
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
        tracing::debug!("list refresh abandoned");
    }
}

fn key_by(items: Vec<FieldValue>, property: &str) -> BTreeMap<String, FieldValue> {
    items
        .into_iter()
        .filter_map(|item| {
            let key = list_key(item.get(property)?);
            Some((key, item))
        })
        .collect()
}

fn flatten_into(mut item: FieldValue, children: &str, flat: &mut Vec<FieldValue>) {
    let nested = match &mut item {
        FieldValue::Object(map) => map.remove(children),
        _ => None,
    };
    flat.push(item);
    if let Some(FieldValue::Array(nested)) = nested {
        for child in nested {
            flatten_into(child, children, flat);
        }
    }
}

fn sort_items(items: &mut [FieldValue], property: &str, direction: SortDirection) {
    items.sort_by(|left, right| {
        let ordering = compare_values(left.get(property), right.get(property));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Numbers numerically, strings lexically, and missing values last.
fn compare_values(left: Option<&FieldValue>, right: Option<&FieldValue>) -> Ordering {
    fn rank(value: Option<&FieldValue>) -> u8 {
        match value {
            Some(FieldValue::Number(_)) => 0,
            Some(FieldValue::String(_)) => 1,
            Some(FieldValue::Bool(_)) => 2,
            Some(FieldValue::Array(_) | FieldValue::Object(_)) => 3,
            Some(FieldValue::Null) | None => 4,
        }
    }
    match (left, right) {
        (Some(FieldValue::Number(left)), Some(FieldValue::Number(right))) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(FieldValue::String(left)), Some(FieldValue::String(right))) => left.cmp(right),
        (Some(FieldValue::Bool(left)), Some(FieldValue::Bool(right))) => left.cmp(right),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> ListResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| ListError::StatePoisoned(context))
}

fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> ListResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| ListError::StatePoisoned(context))
}
