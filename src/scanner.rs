//! Directory export scanning.
//!
//! The registry's dynamic partition is fed by a `ScannerAdapter`. The default
//! adapter lists the modules directly inside each directory, parses them
//! with oxc and turns their top-level exports into import entries.

use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingPattern, Declaration, ModuleExportName, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::entry::ImportEntry;
use crate::error::{Result, UndoError};
use crate::filter::normalize_path;

const SCRIPT_EXTENSIONS: &[&str] = &["ts", "js", "mjs", "cjs", "mts", "cts"];

pub trait ScannerAdapter: Send + Sync {
    fn scan(&self, dirs: &[PathBuf]) -> Result<Vec<ImportEntry>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DirExportScanner;

impl ScannerAdapter for DirExportScanner {
    fn scan(&self, dirs: &[PathBuf]) -> Result<Vec<ImportEntry>> {
        let mut entries = Vec::new();
        for dir in dirs {
            if !dir.is_dir() {
                continue;
            }
            for file in find_script_files(dir)? {
                let source = fs::read_to_string(&file)?;
                entries.extend(scan_exports(&file, &source)?);
            }
        }
        Ok(entries)
    }
}

/// Script modules directly inside `dir`, sorted for stable output. Subdirectories are not entered.
fn find_script_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name() {
        let entry = entry.map_err(|e| UndoError::Rescan(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || is_declaration_file(path) {
            continue;
        }
        if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
        {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".d.ts") || n.ends_with(".d.mts") || n.ends_with(".d.cts"))
}

/// Extracts value exports from one module's source.
pub fn scan_exports(file: &Path, source: &str) -> Result<Vec<ImportEntry>> {
    let file_str = normalize_path(&file.to_string_lossy());
    let source_type = SourceType::from_path(file)
        .map_err(|e| UndoError::parse(&file_str, format!("{:?}", e)))?;

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .first()
            .map(|e| format!("{:?}", e))
            .unwrap_or_else(|| "parser gave up".to_string());
        return Err(UndoError::parse(&file_str, message));
    }

    let mut named: Vec<String> = Vec::new();
    let mut has_default = false;

    for stmt in &ret.program.body {
        match stmt {
            Statement::ExportNamedDeclaration(decl) => {
                if decl.export_kind.is_type() {
                    continue;
                }
                if let Some(declaration) = &decl.declaration {
                    match declaration {
                        Declaration::VariableDeclaration(var) => {
                            for d in &var.declarations {
                                collect_binding_pattern(&d.id, &mut named);
                            }
                        }
                        Declaration::FunctionDeclaration(func) => {
                            if let Some(id) = &func.id {
                                named.push(id.name.to_string());
                            }
                        }
                        Declaration::ClassDeclaration(class) => {
                            if let Some(id) = &class.id {
                                named.push(id.name.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                for spec in &decl.specifiers {
                    if spec.export_kind.is_type() {
                        continue;
                    }
                    let exported = module_export_name(&spec.exported);
                    if exported == "default" {
                        has_default = true;
                    } else if !exported.is_empty() {
                        named.push(exported);
                    }
                }
            }
            Statement::ExportDefaultDeclaration(_) => has_default = true,
            _ => {}
        }
    }

    let mut entries: Vec<ImportEntry> = named
        .iter()
        .map(|name| ImportEntry::named(name, &file_str))
        .collect();
    if has_default {
        if let Some(name) = default_export_name(file) {
            entries.push(ImportEntry::new("default", &name, &file_str));
        }
    }

    Ok(entries)
}

pub(crate) fn module_export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
        _ => String::new(),
    }
}

pub(crate) fn collect_binding_pattern(pattern: &BindingPattern, names: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            names.push(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_binding_pattern(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                collect_binding_pattern(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for pattern in arr.elements.iter().flatten() {
                collect_binding_pattern(pattern, names);
            }
            if let Some(rest) = &arr.rest {
                collect_binding_pattern(&rest.argument, names);
            }
        }
        BindingPattern::AssignmentPattern(assign) => {
            collect_binding_pattern(&assign.left, names);
        }
    }
}

/// `use-mouse.ts` -> `useMouse`; `index.ts` takes its directory's name.
fn default_export_name(file: &Path) -> Option<String> {
    let stem = file.file_stem()?.to_str()?;
    let base = if stem == "index" {
        file.parent()?.file_name()?.to_str()?
    } else {
        stem
    };
    let name = camel_case(base);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '-' || c == '_' || c == '.' || c == ' ' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else if out.is_empty() {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
