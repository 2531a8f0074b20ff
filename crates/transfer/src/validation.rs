use std::path::{Component, Path};

use crate::StoreError;

/// Validates that an uploaded file name is a single plain path component.
///
/// Rejects:
/// - Empty names
/// - Absolute paths (Unix `/` or Windows `C:\`)
/// - Parent (`..`) and current (`.`) directory references
/// - Windows prefix components (`C:`, `\\server`)
/// - Any separator, so names cannot point into sub-directories
pub fn validate_upload_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::InvalidName("empty name".into()));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(StoreError::InvalidName(format!(
            "path separators not allowed: {name}"
        )));
    }

    let path = Path::new(name);
    if path.is_absolute() {
        return Err(StoreError::InvalidName(format!(
            "absolute path not allowed: {name}"
        )));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        (Some(Component::ParentDir), _) => Err(StoreError::InvalidName(format!(
            "parent directory reference not allowed: {name}"
        ))),
        (Some(Component::Prefix(_)), _) => Err(StoreError::InvalidName(format!(
            "path prefix not allowed: {name}"
        ))),
        _ => Err(StoreError::InvalidName(format!("not a plain file name: {name}"))),
    }
}
