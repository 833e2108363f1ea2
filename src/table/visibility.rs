use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};

use super::columns::column_name;
use super::types::{Column, ColumnType};

const HIDDEN_KEY_PREFIX: &str = "HddSeverDataTableHiddenColumns_";
const VISIBLE_KEY_PREFIX: &str = "HddSeverDataTableVisibleColumns_";

/// Key-value storage for saved column lists, such as browser local storage
/// or a settings file.
pub trait VisibilityStorage: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self, key: &str) -> Result<Option<Vec<String>>, Self::Error>;
    fn save(&self, key: &str, columns: &[String]) -> Result<(), Self::Error>;
}

#[derive(Clone, Default)]
pub struct InMemoryVisibilityStorage {
    state: Arc<RwLock<BTreeMap<String, Vec<String>>>>,
}

impl InMemoryVisibilityStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VisibilityStorage for InMemoryVisibilityStorage {
    type Error = Infallible;

    fn load(&self, key: &str) -> Result<Option<Vec<String>>, Self::Error> {
        let state = match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(state.get(key).cloned())
    }

    fn save(&self, key: &str, columns: &[String]) -> Result<(), Self::Error> {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.insert(key.to_string(), columns.to_vec());
        Ok(())
    }
}

/// Which columns of a named table are shown, persisted as the hidden
/// columns plus the columns shown against their default.
pub struct ColumnVisibility<S> {
    table_name: String,
    columns: Vec<Column>,
    storage: S,
    visible: Vec<String>,
}

impl<S: VisibilityStorage> ColumnVisibility<S> {
    /// Restores the visible set from storage.
    pub fn new(
        table_name: impl Into<String>,
        columns: Vec<Column>,
        storage: S,
    ) -> Result<Self, S::Error> {
        let mut visibility = Self {
            table_name: table_name.into(),
            columns,
            storage,
            visible: Vec::new(),
        };
        visibility.initiate()?;
        Ok(visibility)
    }

    pub fn hidden_key(&self) -> String {
        format!("{HIDDEN_KEY_PREFIX}{}", self.table_name)
    }

    pub fn visible_key(&self) -> String {
        format!("{VISIBLE_KEY_PREFIX}{}", self.table_name)
    }

    /// A column starts visible when it was saved as visible, or when it is
    /// not hidden by default and was not saved as hidden.
    pub fn initiate(&mut self) -> Result<(), S::Error> {
        let saved_hidden = self.storage.load(&self.hidden_key())?.unwrap_or_default();
        let saved_visible = self.storage.load(&self.visible_key())?.unwrap_or_default();
        self.visible = self
            .columns
            .iter()
            .map(column_name)
            .zip(self.columns.iter())
            .filter(|(name, column)| {
                saved_visible.iter().any(|saved| saved == name)
                    || (column.visible_flag() != Some(false)
                        && !saved_hidden.iter().any(|saved| saved == name))
            })
            .map(|(name, _)| name.to_string())
            .collect();
        Ok(())
    }

    pub fn visible_columns(&self) -> &[String] {
        &self.visible
    }

    pub fn set_visible_columns(&mut self, names: impl IntoIterator<Item = impl Into<String>>) {
        self.visible = names.into_iter().map(Into::into).collect();
    }

    pub fn set_column_visible(&mut self, name: &str, visible: bool) {
        let position = self.visible.iter().position(|column| column == name);
        match (position, visible) {
            (None, true) => self.visible.push(name.to_string()),
            (Some(index), false) => {
                self.visible.remove(index);
            }
            _ => {}
        }
    }

    /// Saves the controllable columns that are hidden, and those hidden by
    /// default that are now shown.
    pub fn save(&self) -> Result<(), S::Error> {
        let controllable = self
            .columns
            .iter()
            .filter(|column| column.has_visibility_control());
        let hidden = controllable
            .clone()
            .map(column_name)
            .filter(|name| !self.is_listed(name))
            .map(str::to_string)
            .collect::<Vec<_>>();
        let shown = controllable
            .filter(|column| column.visible_flag() == Some(false))
            .map(column_name)
            .filter(|name| self.is_listed(name))
            .map(str::to_string)
            .collect::<Vec<_>>();

        self.storage.save(&self.hidden_key(), &hidden)?;
        self.storage.save(&self.visible_key(), &shown)?;
        tracing::debug!(
            table = %self.table_name,
            hidden = hidden.len(),
            shown = shown.len(),
            "column visibility saved"
        );
        Ok(())
    }

    /// Hidden-type columns never show; uncontrollable columns follow their
    /// own flag.
    pub fn is_column_visible(&self, column: &Column) -> bool {
        if column.kind() == ColumnType::Hidden {
            return false;
        }
        if column.has_visibility_control() {
            self.is_listed(column_name(column))
        } else {
            column.visible_flag().unwrap_or(true)
        }
    }

    /// Columns the user may show or hide.
    pub fn toggleable_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|column| {
                column.has_visibility_control()
                    && !column.is_disabled()
                    && column.kind() != ColumnType::Hidden
            })
            .collect()
    }

    fn is_listed(&self, name: &str) -> bool {
        self.visible.iter().any(|visible| visible == name)
    }
}
