//! Generated build files: the `#imports` target module, global type
//! declarations, and the dev-mode global registration module.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

use crate::codegen::{es_imports, group_by_module, quote};
use crate::entry::{ImportEntry, ImportKind};

lazy_static! {
    static ref EXTENSION_RE: Regex = Regex::new(r"\.[a-z]+$").unwrap();
}

pub const IMPORTS_MODULE_WARNING: &str = "if (process.dev) { console.warn(\"[nuxt] `#imports` should be transformed with real imports. There seems to be something wrong with the imports plugin.\") }";

pub const AUTO_IMPORT_DISABLED_NOTE: &str = "// Implicit auto importing is disabled, you can use explicitly import from `#imports` instead.";

/// Re-exports every entry, grouped per module.
pub fn to_exports(entries: &[ImportEntry]) -> String {
    let mut out = String::new();
    for (module, group) in group_by_module(entries) {
        let from = quote(module);
        let mut named = Vec::new();
        for entry in group {
            match entry.kind {
                ImportKind::Namespace => {
                    out.push_str(&format!("export * as {} from {};\n", entry.identifier, from))
                }
                _ if entry.exported_name == entry.identifier => named.push(entry.identifier.clone()),
                _ => named.push(format!("{} as {}", entry.exported_name, entry.identifier)),
            }
        }
        if !named.is_empty() {
            out.push_str(&format!("export {{ {} }} from {};\n", named.join(", "), from));
        }
    }
    out
}

/// Contents of `imports.mjs`, the module the virtual alias points at.
pub fn imports_module(entries: &[ImportEntry]) -> String {
    format!("{}\n{}", to_exports(entries), IMPORTS_MODULE_WARNING)
}

/// Contents of `types/imports.d.ts`.
pub fn type_declarations(entries: &[ImportEntry], auto_import: bool, build_dir: &Path) -> String {
    if !auto_import {
        return format!("// Generated by auto imports\n{}", AUTO_IMPORT_DISABLED_NOTE);
    }
    let types_dir = build_dir.join("types");
    let mut out = String::from("// Generated by auto imports\nexport {}\ndeclare global {\n");
    for entry in entries {
        let from = quote(&declaration_path(&entry.module_specifier, &types_dir));
        match entry.kind {
            ImportKind::Namespace => {
                out.push_str(&format!("  const {}: typeof import({})\n", entry.identifier, from))
            }
            _ => out.push_str(&format!(
                "  const {}: typeof import({})[{}]\n",
                entry.identifier,
                from,
                quote(&entry.exported_name)
            )),
        }
    }
    out.push('}');
    out
}

/// Dev-mode module putting every entry on `globalThis`.
pub fn global_registration(entries: &[ImportEntry]) -> String {
    let assignments: Vec<String> = entries
        .iter()
        .map(|e| format!("globalThis.{0} = {0};", e.identifier))
        .collect();
    format!(
        "{}\n\n{}\n\nexport default () => {{}};",
        es_imports(entries).trim_end(),
        assignments.join("\n")
    )
}

/// Absolute module paths become relative to `base` and lose their extension.
fn declaration_path(from: &str, base: &Path) -> String {
    let path = Path::new(from);
    let path = if path.is_absolute() {
        relative_to(path, base).to_string_lossy().replace('\\', "/")
    } else {
        from.to_string()
    };
    EXTENSION_RE.replace(&path, "").into_owned()
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = path.iter().zip(&base).take_while(|(a, b)| a == b).count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &path[common..] {
        out.push(component.as_os_str());
    }
    out
}
