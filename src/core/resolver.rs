//! Placeholder resolution for role template text.
//!
//! Only `{{params.key}}` is substituted. Runtime Jinja expressions such as
//! `{{ inventory_hostname }}` pass through untouched, as do unknown params,
//! which the validator reports as unrendered.

use indexmap::IndexMap;

const OPEN: &str = "{{params.";
const CLOSE: &str = "}}";

/// Substitute every known `{{params.key}}` in `template`.
pub fn render(template: &str, params: &IndexMap<&'static str, String>) -> String {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find(OPEN) {
        let open = start + open;
        let close = match result[open..].find(CLOSE) {
            Some(c) => open + c + CLOSE.len(),
            None => break,
        };
        let key = result[open + OPEN.len()..close - CLOSE.len()].trim();

        match params.get(key) {
            Some(value) => {
                let value = value.clone();
                result.replace_range(open..close, &value);
                start = open + value.len();
            }
            None => start = close,
        }
    }

    result
}

/// Keys of `{{params.key}}` placeholders still present in `text`.
pub fn unresolved(text: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut start = 0;
    while let Some(open) = text[start..].find(OPEN) {
        let open = start + open;
        match text[open..].find(CLOSE) {
            Some(c) => {
                let close = open + c;
                keys.push(text[open + OPEN.len()..close].trim().to_string());
                start = close + CLOSE.len();
            }
            None => {
                keys.push(text[open + OPEN.len()..].trim().to_string());
                break;
            }
        }
    }
    keys
}
