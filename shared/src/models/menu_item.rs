//! Menu Item Model
//!
//! Owned by the menu collaborator. Orders copy `name` and `price` at
//! creation time and never look back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Menu item entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_bestseller: bool,
}

fn default_true() -> bool {
    true
}

impl MenuItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            category: String::new(),
            is_available: true,
            is_bestseller: false,
        }
    }
}
