//! Input validation helpers
//!
//! Centralized text length limits for order input. Violations surface as
//! `InvalidItems` naming the offending field.

use crate::orders::traits::OrderError;

// ── Text length limits ──────────────────────────────────────────────

/// Customer names
pub const MAX_NAME_LEN: usize = 200;

/// Delivery instructions
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: customer id, menu item id, phone number
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Delivery locations
pub const MAX_ADDRESS_LEN: usize = 500;

/// Lines per cart
pub const MAX_CART_LINES: usize = 50;

// ── Validation helpers (Order actions) ──────────────────────────────

/// Validate a required string for order actions (non-empty + max length).
pub fn validate_order_text(value: &str, field: &str, max_len: usize) -> Result<(), OrderError> {
    if value.trim().is_empty() {
        return Err(OrderError::invalid_items(field, "must not be empty"));
    }
    validate_order_optional_text(value, field, max_len)
}

/// Validate an optional string for order actions (max length only).
pub fn validate_order_optional_text(
    value: &str,
    field: &str,
    max_len: usize,
) -> Result<(), OrderError> {
    let len = value.chars().count();
    if len > max_len {
        return Err(OrderError::invalid_items(
            field,
            format!("too long ({len} chars, max {max_len})"),
        ));
    }
    Ok(())
}
