// Library exports for testing
// The binary (main.rs) imports these as well

pub mod bindings;
pub mod error;
pub mod launcher;
pub mod logger;
pub mod paths;

#[cfg(test)]
mod tests;

const PAGE_TEMPLATE: &str = include_str!("page.html");

/// The demo page, loading the client script from `script_path`.
pub fn page(script_path: &str) -> String {
    PAGE_TEMPLATE.replace("{{SCRIPT_PATH}}", script_path)
}
