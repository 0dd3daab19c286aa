//! Links BOM lines to the part master by code.
//!
//! Linking is a copy: selecting a code snapshots the item's display fields
//! onto the line. Later edits to the item are not propagated and a line may
//! keep pointing at a code that has since been deleted.

use crate::{
    entities::{bom_line, item},
    errors::ServiceError,
    models::industry_label,
};
use rust_decimal::Decimal;

/// Read-only lookup of items by electronic code.
pub trait CodeCatalog {
    fn find(&self, code: &str) -> Option<&item::Model>;
}

impl CodeCatalog for [item::Model] {
    fn find(&self, code: &str) -> Option<&item::Model> {
        self.iter().find(|item| item.electronic_code == code)
    }
}

impl CodeCatalog for Vec<item::Model> {
    fn find(&self, code: &str) -> Option<&item::Model> {
        self.as_slice().find(code)
    }
}

impl CodeCatalog for std::collections::HashMap<String, item::Model> {
    fn find(&self, code: &str) -> Option<&item::Model> {
        self.get(code)
    }
}

/// Copies the matching item's fields onto the line. A miss leaves the line
/// untouched; it is not an error.
pub fn attach_code<C>(mut line: bom_line::Model, code: &str, catalog: &C) -> bom_line::Model
where
    C: CodeCatalog + ?Sized,
{
    let Some(item) = catalog.find(code) else {
        return line;
    };

    line.electronic_code = item.electronic_code.clone();
    line.item_name = item.item_name.clone();
    line.unit = item.unit.clone();
    line.item_type = item.item_type.clone();
    line.model = item.model.clone();
    line.industry = industry_label(&item.industry_code);
    line
}

/// Sets the parent link. Any string is accepted, including the line's own
/// code or a code that exists nowhere.
pub fn attach_parent(mut line: bom_line::Model, parent_code: impl Into<String>) -> bom_line::Model {
    line.parent_code = parent_code.into();
    line
}

/// Rejects lines that cannot be saved. `parent_code` is deliberately not
/// looked at.
pub fn validate_for_save(line: &bom_line::Model) -> Result<(), ServiceError> {
    for (field, value) in [
        ("electronicCode", &line.electronic_code),
        ("itemName", &line.item_name),
    ] {
        if value.trim().is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "{} is required (line {})",
                field, line.line_no
            )));
        }
    }
    if line.level < 1 {
        return Err(ServiceError::ValidationError(format!(
            "level must be at least 1, got {} (line {})",
            line.level, line.line_no
        )));
    }
    if line.quantity < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "quantity must not be negative, got {} (line {})",
            line.quantity, line.line_no
        )));
    }
    Ok(())
}
