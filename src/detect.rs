//! Usage detection.
//!
//! Parses one unit with oxc and reports which registry identifiers it
//! references without binding them itself. The collector builds a scope tree
//! while walking; once the walk is done each reference is resolved against
//! its own scope chain, so a parameter or block-level declaration only
//! shadows the references it can actually reach. `var` bindings hoist to the
//! enclosing function. Type positions are skipped entirely.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingIdentifier, Class, Function, IdentifierReference, ImportDeclaration,
    ImportDeclarationSpecifier, Statement, TSInterfaceDeclaration, TSType,
    TSTypeAliasDeclaration, TSTypeName, TSTypeParameterDeclaration, VariableDeclarator,
};
use oxc_ast_visit::walk::{walk_class, walk_function, walk_import_declaration, walk_variable_declarator};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::{ScopeFlags, ScopeId};
use std::cell::Cell;
use std::collections::HashSet;
use std::path::Path;

use crate::entry::ImportEntry;
use crate::error::{Result, UndoError};
use crate::filter::split_id;
use crate::registry::RegistrySnapshot;
use crate::scanner::{collect_binding_pattern, module_export_name};

/// Free names whose presence, without any ES module syntax, marks a CommonJS unit.
const CJS_MARKERS: &[&str] = &["require", "module", "exports"];

/// One `import { .. } from '<virtual alias>'` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualImport {
    pub start: usize,
    pub end: usize,
    pub source: String,
    /// `(imported, local)` pairs; `imported` is `default` or `*` for those forms.
    pub specifiers: Vec<(String, String)>,
    pub type_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UsageResult {
    /// Referenced, unbound registry entries in order of first use.
    pub matched_imports: Vec<ImportEntry>,
    /// The unit uses CommonJS and has no ES module syntax.
    pub has_module_context_marker: bool,
    pub virtual_imports: Vec<VirtualImport>,
    /// Offset the preamble is spliced at (after hashbang and directive prologue).
    pub insert_at: usize,
    /// The prologue shares its last line with other code.
    pub insert_needs_newline: bool,
}

/// Picks the oxc source type for a module id.
pub fn source_type_for(id: &str) -> SourceType {
    let (path, query) = split_id(id);
    if let Ok(source_type) = SourceType::from_path(Path::new(path)) {
        return source_type;
    }
    let jsx = query.contains_key("lang.tsx") || query.contains_key("lang.jsx");
    SourceType::default()
        .with_typescript(true)
        .with_module(true)
        .with_jsx(jsx)
}

pub struct UsageDetector<'r> {
    registry: &'r RegistrySnapshot,
    virtual_aliases: &'r [String],
}

impl<'r> UsageDetector<'r> {
    pub fn new(registry: &'r RegistrySnapshot, virtual_aliases: &'r [String]) -> Self {
        Self {
            registry,
            virtual_aliases,
        }
    }

    pub fn detect(&self, source: &str, source_type: SourceType, file: &str) -> Result<UsageResult> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type).parse();

        if ret.panicked || !ret.errors.is_empty() {
            let message = ret
                .errors
                .first()
                .map(|e| format!("{:?}", e))
                .unwrap_or_else(|| "parser gave up".to_string());
            return Err(UndoError::parse(file, message));
        }

        let program = &ret.program;
        let mut collector = UsageCollector::new(self.virtual_aliases);
        collector.visit_program(program);

        let mut free: Vec<(&str, u32)> = collector
            .references
            .iter()
            .filter(|r| !collector.is_bound(&r.name, r.scope))
            .map(|r| (r.name.as_str(), r.start))
            .collect();
        free.sort_by_key(|(_, start)| *start);

        let has_module_syntax = program.body.iter().any(is_module_declaration);
        let has_module_context_marker =
            !has_module_syntax && free.iter().any(|(name, _)| CJS_MARKERS.contains(name));

        let mut seen = HashSet::new();
        let mut matched_imports = Vec::new();
        for &(name, _) in &free {
            if !seen.insert(name) {
                continue;
            }
            if let Some(entry) = self.registry.resolve(name) {
                matched_imports.push(entry.clone());
            }
        }

        let prologue_end = program
            .directives
            .iter()
            .map(|d| d.span.end)
            .chain(program.hashbang.as_ref().map(|h| h.span.end))
            .max()
            .unwrap_or(0) as usize;
        let (insert_at, insert_needs_newline) = insertion_point(source, prologue_end);

        Ok(UsageResult {
            matched_imports,
            has_module_context_marker,
            virtual_imports: std::mem::take(&mut collector.virtual_imports),
            insert_at,
            insert_needs_newline,
        })
    }
}

fn is_module_declaration(stmt: &Statement) -> bool {
    matches!(
        stmt,
        Statement::ImportDeclaration(_)
            | Statement::ExportNamedDeclaration(_)
            | Statement::ExportDefaultDeclaration(_)
            | Statement::ExportAllDeclaration(_)
            | Statement::TSExportAssignment(_)
            | Statement::TSNamespaceExportDeclaration(_)
    )
}

/// Start of the line after the prologue, or the prologue end itself when code follows on that line.
fn insertion_point(source: &str, prologue_end: usize) -> (usize, bool) {
    if prologue_end == 0 {
        return (0, false);
    }
    let rest = &source[prologue_end..];
    match rest.find('\n') {
        Some(nl) if rest[..nl].trim().is_empty() => (prologue_end + nl + 1, false),
        None if rest.trim().is_empty() => (source.len(), true),
        _ => (prologue_end, true),
    }
}

struct Scope {
    parent: Option<usize>,
    /// Function, module or static block: where `var` lands.
    hoists: bool,
    names: HashSet<String>,
}

struct Reference {
    name: String,
    start: u32,
    scope: usize,
}

struct UsageCollector<'c> {
    scopes: Vec<Scope>,
    stack: Vec<usize>,
    references: Vec<Reference>,
    virtual_imports: Vec<VirtualImport>,
    aliases: &'c [String],
}

impl<'c> UsageCollector<'c> {
    fn new(aliases: &'c [String]) -> Self {
        Self {
            scopes: vec![Scope {
                parent: None,
                hoists: true,
                names: HashSet::new(),
            }],
            stack: vec![0],
            references: vec![],
            virtual_imports: vec![],
            aliases,
        }
    }

    fn current(&self) -> usize {
        self.stack.last().copied().unwrap_or(0)
    }

    fn push_scope(&mut self, hoists: bool) {
        let parent = Some(self.current());
        self.scopes.push(Scope {
            parent,
            hoists,
            names: HashSet::new(),
        });
        self.stack.push(self.scopes.len() - 1);
    }

    fn pop_scope(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn bind(&mut self, scope: usize, name: &str) {
        self.scopes[scope].names.insert(name.to_string());
    }

    fn var_scope(&self) -> usize {
        let mut id = self.current();
        while !self.scopes[id].hoists {
            match self.scopes[id].parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    fn is_bound(&self, name: &str, scope: usize) -> bool {
        let mut id = Some(scope);
        while let Some(scope) = id {
            if self.scopes[scope].names.contains(name) {
                return true;
            }
            id = self.scopes[scope].parent;
        }
        false
    }
}

impl<'a> Visit<'a> for UsageCollector<'_> {
    fn enter_scope(&mut self, flags: ScopeFlags, _scope_id: &Cell<Option<ScopeId>>) {
        self.push_scope(flags.is_var());
    }

    fn leave_scope(&mut self) {
        self.pop_scope();
    }

    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.references.push(Reference {
            name: ident.name.to_string(),
            start: ident.span.start,
            scope: self.current(),
        });
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.bind(self.current(), &ident.name);
    }

    // A declaration's name belongs to the enclosing scope; the walk binds it
    // inside the function's own scope.
    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        if let (true, Some(id)) = (func.is_declaration(), &func.id) {
            self.bind(self.current(), &id.name);
        }
        walk_function(self, func, flags);
    }

    // The walk binds a class name before entering the class scope; an
    // expression's name must not leak out.
    fn visit_class(&mut self, class: &Class<'a>) {
        if class.is_expression() {
            self.push_scope(false);
            walk_class(self, class);
            self.pop_scope();
        } else {
            walk_class(self, class);
        }
    }

    fn visit_variable_declarator(&mut self, decl: &VariableDeclarator<'a>) {
        if decl.kind.is_var() {
            let mut names = Vec::new();
            collect_binding_pattern(&decl.id, &mut names);
            let target = self.var_scope();
            for name in &names {
                self.bind(target, name);
            }
        }
        walk_variable_declarator(self, decl);
    }

    // Type positions never need a runtime import and never bind a value.
    fn visit_ts_type(&mut self, _ty: &TSType<'a>) {}

    fn visit_ts_type_name(&mut self, _name: &TSTypeName<'a>) {}

    fn visit_ts_type_alias_declaration(&mut self, _decl: &TSTypeAliasDeclaration<'a>) {}

    fn visit_ts_interface_declaration(&mut self, _decl: &TSInterfaceDeclaration<'a>) {}

    fn visit_ts_type_parameter_declaration(&mut self, _params: &TSTypeParameterDeclaration<'a>) {}

    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        let source = decl.source.value.as_str();
        if self.aliases.iter().any(|a| a == source) {
            let specifiers = decl
                .specifiers
                .iter()
                .flatten()
                .map(|specifier| match specifier {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        (module_export_name(&s.imported), s.local.name.to_string())
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        ("default".to_string(), s.local.name.to_string())
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        ("*".to_string(), s.local.name.to_string())
                    }
                })
                .collect();
            self.virtual_imports.push(VirtualImport {
                start: decl.span.start as usize,
                end: decl.span.end as usize,
                source: source.to_string(),
                specifiers,
                type_only: decl.import_kind.is_type(),
            });
        }
        walk_import_declaration(self, decl);
    }
}
