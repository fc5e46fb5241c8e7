//! # Undo Auto-Imports (native)
//!
//! Build-time rewriting of auto-imported identifiers into explicit imports.
//!
//! ## Pipeline
//!
//! 1. **Registry**: identifier → module mappings from presets, scanned
//!    directories (plus the `extend` hook) and explicit config, in that order of
//!    increasing precedence. Rescans swap the dynamic partition atomically.
//! 2. **Usage detection**: oxc parse of each unit; free references to registry
//!    identifiers that nothing in the unit binds, in order of first use.
//! 3. **Mode policy**: `insert` rewrites, `comment` injects commented lines,
//!    `log` only records.
//! 4. **Transform**: preamble spliced after the directive prologue, virtual
//!    `#imports` rewritten, source map generated.
//! 5. **Audit log**: one `// <path>` record per injected preamble.
//!
//! A second pass over transformed output finds every injected name bound and
//! changes nothing.

#[cfg(feature = "napi")]
mod binding;

mod audit;
mod codegen;
mod config;
mod detect;
mod entry;
mod error;
mod filter;
mod hooks;
mod logging;
mod plugin;
mod policy;
mod presets;
mod registry;
mod scanner;
mod sfc;
mod splice;
mod templates;
mod transform;

#[cfg(test)]
mod transform_tests;

#[cfg(feature = "napi")]
pub use binding::{Templates, TransformResult, UndoImportsNative};

pub use audit::{AuditLog, SharedBuffer, AUDIT_HEADER};
pub use config::{Config, LayerOptions, Mode, Options, TransformOptions};
pub use detect::{source_type_for, UsageDetector, UsageResult, VirtualImport};
pub use entry::{ImportEntry, ImportKind, ImportSpec, Preset, PresetImport};
pub use error::{Result, UndoError};
pub use filter::{classify, matches_path, should_handle, FileClass};
pub use hooks::{ExtensionHooks, NoopHooks};
pub use logging::init_logging;
pub use plugin::{GeneratedTemplates, SetupContext, UndoImports};
pub use policy::{decide, Action, Findings};
pub use presets::default_presets;
pub use registry::{Registry, RegistrySnapshot};
pub use scanner::{scan_exports, DirExportScanner, ScannerAdapter};
pub use splice::{EditBuffer, SourceMap};
pub use transform::{SourceUnit, TransformEngine, TransformFlags, TransformOutcome};
