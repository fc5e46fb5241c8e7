//! Transform engine.
//!
//! Per unit: classify, detect, ask the mode policy, then splice the preamble
//! and virtual-import rewrites into the text. Each call only reads shared
//! state (config, a registry snapshot) and appends to the audit sink, so
//! calls run concurrently without coordination.

use oxc_span::SourceType;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit::AuditLog;
use crate::codegen::{comment_out, commented_identifiers, preamble, virtual_replacement};
use crate::config::{Config, Mode};
use crate::detect::{source_type_for, UsageDetector, UsageResult};
use crate::entry::ImportEntry;
use crate::error::Result;
use crate::filter::{classify, has_virtual_marker, normalize_path, split_id, FileClass};
use crate::policy::{self, Action, Findings};
use crate::registry::Registry;
use crate::sfc::primary_script;
use crate::splice::{EditBuffer, SourceMap};

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformFlags {
    pub auto_import: bool,
}

impl Default for TransformFlags {
    fn default() -> Self {
        Self { auto_import: true }
    }
}

/// A file handed over by the build pipeline.
#[derive(Debug, Clone)]
pub struct SourceUnit<'a> {
    pub id: String,
    pub code: &'a str,
    pub class: FileClass,
}

impl<'a> SourceUnit<'a> {
    pub fn new(config: &Config, id: &str, code: &'a str) -> Self {
        let id = normalize_path(id);
        let class = classify(config, &id);
        Self { id, code, class }
    }

    /// Byte range and parse mode of the script the detector sees. `None` for
    /// a raw component without a `<script>` block.
    fn script_region(&self) -> Option<(usize, usize, SourceType)> {
        let (path, query) = split_id(&self.id);
        if path.ends_with(".vue") && query.is_empty() {
            let block = primary_script(self.code)?;
            let source_type = SourceType::default()
                .with_module(true)
                .with_typescript(block.is_typescript())
                .with_jsx(block.is_jsx());
            return Some((block.start, block.end, source_type));
        }
        Some((0, self.code.len(), source_type_for(&self.id)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutcome {
    pub code: String,
    pub changed: bool,
    /// Byte range of the injected preamble within `code`.
    pub inserted_range: Option<(usize, usize)>,
    /// Generated preamble, also when the mode left the text alone.
    pub preamble: String,
    #[serde(skip)]
    pub action: Option<Action>,
    pub map: Option<SourceMap>,
}

impl TransformOutcome {
    pub fn unchanged(code: &str) -> Self {
        Self {
            code: code.to_string(),
            changed: false,
            inserted_range: None,
            preamble: String::new(),
            action: None,
            map: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct TransformEngine {
    config: Arc<Config>,
    registry: Arc<Registry>,
    audit: Arc<AuditLog>,
}

impl TransformEngine {
    pub fn new(config: Arc<Config>, registry: Arc<Registry>, audit: Arc<AuditLog>) -> Self {
        Self {
            config,
            registry,
            audit,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn should_handle(&self, id: &str, code: &str) -> bool {
        crate::filter::should_handle(&self.config, id, code)
    }

    /// Fail-open transform: any error leaves the unit unchanged with a warning.
    pub fn transform(&self, code: &str, id: &str, flags: TransformFlags) -> TransformOutcome {
        match self.try_transform(code, id, flags) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(code = err.code(), file = id, "leaving file unchanged: {}", err);
                TransformOutcome::unchanged(code)
            }
        }
    }

    pub fn try_transform(&self, code: &str, id: &str, flags: TransformFlags) -> Result<TransformOutcome> {
        let unit = SourceUnit::new(&self.config, id, code);
        if unit.class.is_dependency && !has_virtual_marker(&self.config, code) {
            return Ok(TransformOutcome::unchanged(code));
        }
        let Some((start, end, source_type)) = unit.script_region() else {
            return Ok(TransformOutcome::unchanged(code));
        };

        let snapshot = self.registry.snapshot();
        let detector = UsageDetector::new(&snapshot, &self.config.virtual_imports);
        let usage = detector.detect(&code[start..end], source_type, &unit.id)?;

        let matched = self.pending_imports(&unit, &usage, flags);
        let rewrites: Vec<(usize, usize, String)> = usage
            .virtual_imports
            .iter()
            .filter_map(|vi| {
                let text = virtual_replacement(vi, &snapshot)?;
                let (s, e) = (start + vi.start, start + vi.end);
                (code[s..e] != text).then_some((s, e, text))
            })
            .collect();

        let action = policy::decide(
            self.config.mode,
            &unit.class,
            Findings {
                matched: matched.len(),
                virtual_imports: rewrites.len(),
            },
        );

        let mut preamble_text = if matched.is_empty() {
            String::new()
        } else {
            preamble(&matched, usage.has_module_context_marker)
        };
        if action == Action::Comment {
            preamble_text = comment_out(&preamble_text);
        }
        if usage.insert_needs_newline && !preamble_text.is_empty() {
            preamble_text.insert(0, '\n');
        }

        if action == Action::Skip {
            return Ok(TransformOutcome::unchanged(code));
        }
        if !action.mutates_text() {
            if policy::is_auditable(&unit.class) && !preamble_text.is_empty() {
                self.audit.record(&unit.id, &self.config.redact(&preamble_text));
            }
            return Ok(TransformOutcome {
                preamble: preamble_text,
                action: Some(action),
                ..TransformOutcome::unchanged(code)
            });
        }

        let mut buf = EditBuffer::new(code);
        if action == Action::Insert {
            for (s, e, text) in &rewrites {
                buf.overwrite(*s, *e, text.as_str());
            }
        }

        let mut insert_at = start + usage.insert_at;
        // Inside `<script>` the preamble goes on its own line after the tag.
        if start > 0 && usage.insert_at == 0 && code[start..end].starts_with('\n') {
            insert_at += 1;
        }
        if !preamble_text.is_empty() {
            buf.insert(insert_at, preamble_text.as_str());
        }

        if !buf.has_changed() {
            return Ok(TransformOutcome::unchanged(code));
        }
        let new_code = buf.render();

        let inserted_range =
            (!preamble_text.is_empty()).then(|| (insert_at, insert_at + preamble_text.len()));

        if policy::is_auditable(&unit.class) {
            let injected = match inserted_range {
                Some((s, e)) => new_code[s..e].to_string(),
                None => rewrites
                    .iter()
                    .map(|(_, _, text)| text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            self.audit.record(&unit.id, &self.config.redact(&injected));
        }

        let map = self
            .config
            .sourcemap
            .then(|| buf.generate_map(&unit.id, true));

        tracing::debug!(
            file = %unit.id,
            mode = %self.config.mode,
            imports = matched.len(),
            rewrites = rewrites.len(),
            "transformed"
        );

        Ok(TransformOutcome {
            code: new_code,
            changed: true,
            inserted_range,
            preamble: preamble_text,
            action: Some(action),
            map,
        })
    }

    /// Matched entries still missing from the unit under the current mode.
    fn pending_imports(
        &self,
        unit: &SourceUnit,
        usage: &UsageResult,
        flags: TransformFlags,
    ) -> Vec<ImportEntry> {
        if !policy::auto_import_enabled(self.config.auto_import, flags.auto_import, &unit.class) {
            return vec![];
        }
        if self.config.mode != Mode::Comment {
            return usage.matched_imports.clone();
        }
        let recorded = commented_identifiers(unit.code);
        usage
            .matched_imports
            .iter()
            .filter(|entry| !recorded.contains(&entry.identifier))
            .cloned()
            .collect()
    }

    /// Transforms many `(id, code)` units in parallel, in input order.
    /// Units the filter rejects come back unchanged.
    pub fn transform_batch(&self, units: &[(String, String)], flags: TransformFlags) -> Vec<TransformOutcome> {
        units
            .par_iter()
            .map(|(id, code)| {
                if self.should_handle(id, code) {
                    self.transform(code, id, flags)
                } else {
                    TransformOutcome::unchanged(code)
                }
            })
            .collect()
    }
}
