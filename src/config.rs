//! Operator configuration.
//!
//! `Options` is the loose JSON surface the host passes in. `Config::resolve`
//! validates it once per build invocation and produces the immutable snapshot
//! every other component is constructed from.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::entry::{ImportEntry, ImportSpec, Preset};
use crate::error::{Result, UndoError};
use crate::filter::normalize_path;
use crate::presets::default_presets;

pub const DEFAULT_AUDIT_FILE: &str = "unimport.js";
pub const DEFAULT_VIRTUAL_IMPORT: &str = "#imports";
pub const DEFAULT_BUILD_DIR: &str = ".nuxt";

// ═══════════════════════════════════════════════════════════════════════════════
// MODE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Rewrite files with explicit imports.
    Insert,
    /// Emit the imports as comments only.
    Comment,
    /// Leave files untouched, record to the audit file.
    Log,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Insert => "insert",
            Mode::Comment => "comment",
            Mode::Log => "log",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = UndoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert" => Ok(Mode::Insert),
            "comment" => Ok(Mode::Comment),
            "log" => Ok(Mode::Log),
            other => Err(UndoError::Configuration(format!(
                "unknown mode '{}', expected one of insert, comment, log",
                other
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS (INPUT SURFACE)
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerOptions {
    pub cwd: PathBuf,
    pub src_dir: PathBuf,
    pub dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    pub mode: String,
    pub auto_import: bool,
    pub presets: Vec<Preset>,
    pub imports: Vec<ImportSpec>,
    pub dirs: Vec<String>,
    pub src_dir: PathBuf,
    pub cwd: Option<PathBuf>,
    pub layers: Vec<LayerOptions>,
    pub transform: TransformOptions,
    pub cwd_alias: Option<String>,
    pub audit_file: PathBuf,
    pub build_dir: PathBuf,
    pub sourcemap: bool,
    pub virtual_imports: Vec<String>,
    pub dev: bool,
    pub global: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: Mode::Log.as_str().to_string(),
            auto_import: true,
            presets: default_presets(),
            imports: vec![],
            dirs: vec![],
            src_dir: PathBuf::from("."),
            cwd: None,
            layers: vec![],
            transform: TransformOptions::default(),
            cwd_alias: None,
            audit_file: PathBuf::from(DEFAULT_AUDIT_FILE),
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            sourcemap: false,
            virtual_imports: vec![DEFAULT_VIRTUAL_IMPORT.to_string()],
            dev: false,
            global: false,
        }
    }
}

impl Options {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| UndoError::Configuration(format!("invalid options: {}", e)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVED CONFIG (IMMUTABLE SNAPSHOT)
// ═══════════════════════════════════════════════════════════════════════════════

/// An include pattern. Patterns derived from layers living in a dependency
/// tree refuse to match when the rest of the id re-enters `node_modules/`.
#[derive(Debug, Clone)]
pub struct IncludePattern {
    re: Regex,
    guard_nested_modules: bool,
}

impl IncludePattern {
    pub fn is_match(&self, id: &str) -> bool {
        if !self.guard_nested_modules {
            return self.re.is_match(id);
        }
        self.re
            .find_iter(id)
            .any(|m| !id[m.end()..].starts_with("node_modules/"))
    }

    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub auto_import: bool,
    pub presets: Vec<Preset>,
    pub imports: Vec<ImportEntry>,
    pub include: Vec<IncludePattern>,
    pub exclude: Vec<Regex>,
    /// Scan directories before the `dirs` extension hook runs.
    pub scan_dirs: Vec<PathBuf>,
    pub cwd: String,
    pub cwd_alias: Option<String>,
    /// Absolute; relative `auditFile` values resolve against the working directory.
    pub audit_file: PathBuf,
    pub build_dir: PathBuf,
    pub sourcemap: bool,
    pub virtual_imports: Vec<String>,
    pub dev: bool,
    pub global: bool,
}

impl Config {
    pub fn resolve(options: Options) -> Result<Self> {
        let mode: Mode = options.mode.parse()?;

        if options.dev && !options.global {
            return Err(UndoError::Configuration(
                "not compatible with dev mode, run a production build instead".to_string(),
            ));
        }

        let cwd = match options.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir()?,
        };

        let mut include = options
            .transform
            .include
            .iter()
            .map(|p| compile_pattern(p).map(|re| IncludePattern { re, guard_nested_modules: false }))
            .collect::<Result<Vec<_>>>()?;
        let exclude = options
            .transform
            .exclude
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>>>()?;

        let layers = if options.layers.is_empty() {
            vec![LayerOptions {
                cwd: cwd.clone(),
                src_dir: options.src_dir.clone(),
                dirs: options.dirs.clone(),
            }]
        } else {
            options.layers
        };

        for layer in &layers {
            if let Some(pattern) = layer_include_pattern(&layer.cwd)? {
                include.push(pattern);
            }
        }

        let scan_dirs = layers
            .iter()
            .flat_map(|layer| layer_scan_dirs(&cwd, layer))
            .collect();

        let presets = options.presets.into_iter().filter(|p| !p.disabled).collect();

        if options.virtual_imports.iter().any(|v| v.is_empty()) {
            return Err(UndoError::Configuration(
                "virtual import aliases must not be empty".to_string(),
            ));
        }

        Ok(Config {
            mode,
            auto_import: options.auto_import,
            presets,
            imports: options.imports.iter().map(ImportEntry::from).collect(),
            include,
            exclude,
            scan_dirs,
            cwd: normalize_path(&cwd.to_string_lossy()),
            cwd_alias: options.cwd_alias,
            audit_file: cwd.join(&options.audit_file),
            build_dir: cwd.join(&options.build_dir),
            sourcemap: options.sourcemap,
            virtual_imports: options.virtual_imports,
            dev: options.dev,
            global: options.global,
        })
    }

    /// Replaces the working directory prefix with the configured alias.
    pub fn redact(&self, text: &str) -> String {
        match &self.cwd_alias {
            Some(alias) if !self.cwd.is_empty() => text.replace(&self.cwd, alias),
            _ => text.to_string(),
        }
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        UndoError::Configuration(format!("malformed transform pattern '{}': {}", pattern, e))
    })
}

/// Include pattern for a layer whose root lives in `node_modules`.
fn layer_include_pattern(layer_cwd: &Path) -> Result<Option<IncludePattern>> {
    let cwd = normalize_path(&layer_cwd.to_string_lossy());
    if !cwd.contains("node_modules") {
        return Ok(None);
    }
    let tail = cwd.rsplit("node_modules/").next().unwrap_or(&cwd);
    let tail = tail.trim_end_matches('/');
    if tail.is_empty() {
        return Ok(None);
    }
    let re = compile_pattern(&format!(r"(^|/){}(/|$)", regex::escape(tail)))?;
    Ok(Some(IncludePattern {
        re,
        guard_nested_modules: true,
    }))
}

fn layer_scan_dirs(cwd: &Path, layer: &LayerOptions) -> Vec<PathBuf> {
    let root = if layer.cwd.as_os_str().is_empty() {
        cwd.to_path_buf()
    } else {
        cwd.join(&layer.cwd)
    };
    // Components drop `.` segments, so `srcDir: "."` yields `<root>/composables`.
    let src: PathBuf = root.join(&layer.src_dir).components().collect();
    let mut dirs = vec![src.join("composables"), src.join("utils")];
    dirs.extend(
        layer
            .dirs
            .iter()
            .filter(|d| !d.is_empty())
            .map(|d| src.join(d)),
    );
    dirs
}
