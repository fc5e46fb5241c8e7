//! File classification.
//!
//! Decides which module ids the transform hook sees and classifies the ones it
//! does: framework component, dependency module, plain script.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::config::Config;

lazy_static! {
    static ref SCRIPT_EXT_RE: Regex = Regex::new(r"\.((c|m)?j|t)sx?$").unwrap();
    static ref NODE_MODULES_RE: Regex = Regex::new(r"[\\/]node_modules[\\/]").unwrap();
}

/// Classification flags for one module id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileClass {
    /// `.vue` file or a Vue sub-request (`?vue&type=script`).
    pub is_component: bool,
    /// Lives in `node_modules` and was not explicitly included.
    pub is_dependency: bool,
    /// JS/TS family extension.
    pub is_script: bool,
    /// Synthetic module that should never be audited.
    pub is_virtual: bool,
}

/// Converts backslashes to forward slashes.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Splits an id into its pathname and parsed query.
pub fn split_id(id: &str) -> (&str, HashMap<&str, &str>) {
    let (path, search) = match id.split_once('?') {
        Some((path, search)) => (path, search),
        None => (id, ""),
    };
    let query = search
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect();
    (path, query)
}

fn is_component_request(path: &str, query: &HashMap<&str, &str>) -> bool {
    if path.ends_with(".vue") || query.contains_key("macro") {
        return true;
    }
    query.contains_key("vue")
        && (matches!(query.get("type"), Some(&"template") | Some(&"script"))
            || query.contains_key("setup"))
}

fn is_included(config: &Config, id: &str) -> bool {
    config.include.iter().any(|p| p.is_match(id))
}

/// The path-only half of the transform filter.
pub fn matches_path(config: &Config, id: &str) -> bool {
    if is_included(config, id) {
        return true;
    }
    if config.exclude.iter().any(|re| re.is_match(id)) {
        return false;
    }
    let (path, query) = split_id(id);
    if is_component_request(path, &query) {
        return true;
    }
    SCRIPT_EXT_RE.is_match(path)
}

pub fn classify(config: &Config, id: &str) -> FileClass {
    let (path, query) = split_id(id);
    FileClass {
        is_component: is_component_request(path, &query),
        is_dependency: NODE_MODULES_RE.is_match(id) && !is_included(config, id),
        is_script: SCRIPT_EXT_RE.is_match(path),
        is_virtual: id.starts_with('\0') || id.contains("virtual"),
    }
}

/// Whether the text references a virtual import alias as a quoted module string.
pub fn has_virtual_marker(config: &Config, code: &str) -> bool {
    config.virtual_imports.iter().any(|alias| {
        code.contains(&format!("'{}'", alias)) || code.contains(&format!("\"{}\"", alias))
    })
}

/// Full filter: path rules, then dependency files need a virtual import marker.
pub fn should_handle(config: &Config, id: &str, code: &str) -> bool {
    let id = normalize_path(id);
    if !matches_path(config, &id) {
        return false;
    }
    !classify(config, &id).is_dependency || has_virtual_marker(config, code)
}
