//! Import statement generation.
//!
//! Emits the injection preamble in ES or CommonJS form, its commented variant,
//! and the concrete replacement for virtual-import declarations. Statements
//! are grouped per module in order of first appearance, so output is stable
//! for a given input order.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::detect::VirtualImport;
use crate::entry::{ImportEntry, ImportKind};
use crate::registry::RegistrySnapshot;

lazy_static! {
    /// `// import { a, b as c } from` and `// const { a, b: c } = require(`
    static ref COMMENTED_LIST_RE: Regex =
        Regex::new(r"(?m)^// (?:import \{ ([^}]*) \} from |const \{ ([^}]*) \} = require\()").unwrap();

    /// `// import a from`, `// import * as a from` and `// const a = require(`
    static ref COMMENTED_SINGLE_RE: Regex = Regex::new(
        r"(?m)^// (?:import (?:\* as )?([A-Za-z_$][\w$]*) from |const ([A-Za-z_$][\w$]*) = require\()"
    )
    .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Single-quoted JS string literal.
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Groups entries by module, keeping first-appearance order for both.
pub fn group_by_module(entries: &[ImportEntry]) -> Vec<(&str, Vec<&ImportEntry>)> {
    let mut groups: Vec<(&str, Vec<&ImportEntry>)> = Vec::new();
    for entry in entries {
        match groups
            .iter_mut()
            .find(|(module, _)| *module == entry.module_specifier)
        {
            Some((_, group)) => group.push(entry),
            None => groups.push((entry.module_specifier.as_str(), vec![entry])),
        }
    }
    groups
}

fn named_specifier(entry: &ImportEntry, separator: &str) -> String {
    if entry.is_renamed() {
        format!("{}{}{}", entry.exported_name, separator, entry.identifier)
    } else {
        entry.identifier.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PREAMBLE
// ═══════════════════════════════════════════════════════════════════════════════

/// `import` statements, one line each, newline-terminated.
pub fn es_imports(entries: &[ImportEntry]) -> String {
    let mut out = String::new();
    for (module, group) in group_by_module(entries) {
        let from = quote(module);
        let mut named = Vec::new();
        for entry in group {
            match entry.kind {
                ImportKind::Default => {
                    out.push_str(&format!("import {} from {};\n", entry.identifier, from))
                }
                ImportKind::Namespace => {
                    out.push_str(&format!("import * as {} from {};\n", entry.identifier, from))
                }
                ImportKind::Named => named.push(named_specifier(entry, " as ")),
            }
        }
        if !named.is_empty() {
            out.push_str(&format!("import {{ {} }} from {};\n", named.join(", "), from));
        }
    }
    out
}

/// `require` destructuring, one line per module, newline-terminated.
pub fn cjs_requires(entries: &[ImportEntry]) -> String {
    let mut out = String::new();
    for (module, group) in group_by_module(entries) {
        let call = format!("require({})", quote(module));
        let mut named = Vec::new();
        for entry in group {
            match entry.kind {
                ImportKind::Namespace => {
                    out.push_str(&format!("const {} = {};\n", entry.identifier, call))
                }
                ImportKind::Default => named.push(format!("default: {}", entry.identifier)),
                ImportKind::Named => named.push(named_specifier(entry, ": ")),
            }
        }
        if !named.is_empty() {
            out.push_str(&format!("const {{ {} }} = {};\n", named.join(", "), call));
        }
    }
    out
}

/// The preamble for a unit in the given module context.
pub fn preamble(entries: &[ImportEntry], commonjs: bool) -> String {
    if commonjs {
        cjs_requires(entries)
    } else {
        es_imports(entries)
    }
}

/// Prefixes every line with `// `.
pub fn comment_out(text: &str) -> String {
    text.lines().map(|line| format!("// {}\n", line)).collect()
}

/// Local names bound by commented-out preamble lines already in `code`.
pub fn commented_identifiers(code: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    for caps in COMMENTED_LIST_RE.captures_iter(code) {
        let Some(list) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        for specifier in list.as_str().split(',') {
            let local = specifier
                .rsplit([' ', ':'])
                .find(|part| !part.is_empty())
                .unwrap_or("");
            if !local.is_empty() {
                names.insert(local.to_string());
            }
        }
    }
    for caps in COMMENTED_SINGLE_RE.captures_iter(code) {
        if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
            names.insert(name.as_str().to_string());
        }
    }
    names
}

// ═══════════════════════════════════════════════════════════════════════════════
// VIRTUAL IMPORTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Concrete statements replacing one virtual-import declaration.
///
/// Names the registry knows move to their registered module under the same
/// local binding; the rest stay on a residual import from the alias. Returns
/// `None` for type-only declarations, which are left alone.
pub fn virtual_replacement(vi: &VirtualImport, registry: &RegistrySnapshot) -> Option<String> {
    if vi.type_only {
        return None;
    }

    let mut resolved = Vec::new();
    let mut residual = Vec::new();
    for (imported, local) in &vi.specifiers {
        match registry.resolve(imported) {
            Some(entry) if imported != "default" && imported != "*" => {
                resolved.push(ImportEntry {
                    identifier: local.clone(),
                    module_specifier: entry.module_specifier.clone(),
                    exported_name: entry.exported_name.clone(),
                    kind: entry.kind,
                });
            }
            _ => residual.push(if imported == local {
                local.clone()
            } else {
                format!("{} as {}", imported, local)
            }),
        }
    }

    let mut out = es_imports(&resolved);
    if !residual.is_empty() {
        out.push_str(&format!(
            "import {{ {} }} from {};\n",
            residual.join(", "),
            quote(&vi.source)
        ));
    }
    Some(out.trim_end_matches('\n').to_string())
}
