//! Binding name rules.
//!
//! A name is one or more dot-separated identifier segments (`app.user.save`).
//! The front end owns two first segments for itself: [`READY_BINDING_NAME`]
//! receives the ready notification and [`CONTEXT_BINDING_NAME`] holds its token
//! objects.

use crate::error::BindingError;

use once_cell::sync::Lazy;
use regex::Regex;

pub const READY_BINDING_NAME: &str = "Bridge";
pub const CONTEXT_BINDING_NAME: &str = "context";

static SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("segment pattern is a valid regex")
});

/// Checks that `name` is a well-formed, non-reserved binding name.
pub fn validate_name(name: &str) -> Result<(), BindingError> {
    if name.is_empty() {
        return Err(BindingError::invalid_name("binding name is empty"));
    }
    let first = name.split('.').next().unwrap_or(name);
    if first == READY_BINDING_NAME || first == CONTEXT_BINDING_NAME {
        return Err(BindingError::reserved_name(name));
    }
    if let Some(bad) = name.split('.').find(|segment| !SEGMENT.is_match(segment)) {
        return Err(BindingError::invalid_name(format!(
            "binding name '{name}': '{bad}' is not an identifier"
        )));
    }
    Ok(())
}

/// `prefix.name`.
pub fn join(prefix: &str, name: &str) -> String {
    format!("{prefix}.{name}")
}

/// Remote name of an aggregate member, or `None` when the member is private.
///
/// Exported members start with an uppercase letter and are announced with it
/// lowered: `GetUser` becomes `getUser`, `ID` becomes `iD`.
pub fn exported_name(ident: &str) -> Option<String> {
    let mut chars = ident.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    Some(first.to_lowercase().chain(chars).collect())
}
