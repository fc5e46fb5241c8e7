//! Mode policy: what a transform does with a unit, given the build mode,
//! the unit's classification and what detection found. Pure.

use crate::config::Mode;
use crate::filter::FileClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Return the unit unchanged, record nothing.
    Skip,
    /// Splice the preamble and rewrite virtual imports.
    Insert,
    /// Splice the preamble as line comments.
    Comment,
    /// Leave the text untouched and record the would-be preamble.
    Log,
}

impl Action {
    pub fn mutates_text(&self) -> bool {
        matches!(self, Action::Insert | Action::Comment)
    }
}

/// Work detection found in one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Findings {
    pub matched: usize,
    pub virtual_imports: usize,
}

impl Findings {
    pub fn is_empty(&self) -> bool {
        self.matched == 0 && self.virtual_imports == 0
    }
}

pub fn decide(mode: Mode, class: &FileClass, findings: Findings) -> Action {
    if findings.is_empty() {
        return Action::Skip;
    }
    if class.is_dependency {
        // Dependencies only ever get their virtual imports resolved.
        return match mode {
            Mode::Insert if findings.virtual_imports > 0 => Action::Insert,
            _ => Action::Skip,
        };
    }
    match mode {
        Mode::Insert => Action::Insert,
        Mode::Comment if findings.matched > 0 => Action::Comment,
        Mode::Comment => Action::Skip,
        Mode::Log => Action::Log,
    }
}

/// Free identifiers are injected only into application code with the switch on.
pub fn auto_import_enabled(configured: bool, requested: bool, class: &FileClass) -> bool {
    configured && requested && !class.is_dependency
}

/// Dependency and synthetic modules never reach the audit log.
pub fn is_auditable(class: &FileClass) -> bool {
    !class.is_dependency && !class.is_virtual
}
