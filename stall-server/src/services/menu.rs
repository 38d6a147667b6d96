//! Menu lookup
//!
//! The order engine reads the menu once per order, at creation time, to
//! snapshot names and prices. Menu CRUD lives elsewhere; [`StaticMenu`] is
//! the in-process catalog used by the server binary and tests.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use shared::models::MenuItem;
use thiserror::Error;

/// Read access to the menu
pub trait MenuLookup: Send + Sync {
    fn get_menu_item(&self, id: &str) -> Option<MenuItem>;
}

impl<T: MenuLookup + ?Sized> MenuLookup for Arc<T> {
    fn get_menu_item(&self, id: &str) -> Option<MenuItem> {
        (**self).get_menu_item(id)
    }
}

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Failed to read menu file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid menu file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-memory menu keyed by item id
#[derive(Debug, Default)]
pub struct StaticMenu {
    items: DashMap<String, MenuItem>,
}

impl StaticMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let menu = Self::new();
        for item in items {
            menu.upsert(item);
        }
        menu
    }

    /// Load a JSON array of menu items
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MenuError> {
        let raw = std::fs::read_to_string(path)?;
        let items: Vec<MenuItem> = serde_json::from_str(&raw)?;
        Ok(Self::with_items(items))
    }

    pub fn upsert(&self, item: MenuItem) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl MenuLookup for StaticMenu {
    fn get_menu_item(&self, id: &str) -> Option<MenuItem> {
        self.items.get(id).map(|item| item.clone())
    }
}
