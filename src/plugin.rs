//! Build lifecycle.
//!
//! `UndoImports` owns one build invocation: it resolves the configuration,
//! opens the audit sink, assembles the registry and performs the mandatory
//! initial rescan, then serves the pipeline's filter, transform and
//! notification calls until `finish`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audit::AuditLog;
use crate::config::{Config, Mode, Options};
use crate::error::Result;
use crate::filter::normalize_path;
use crate::hooks::{ExtensionHooks, NoopHooks};
use crate::registry::Registry;
use crate::scanner::{DirExportScanner, ScannerAdapter};
use crate::templates;
use crate::transform::{TransformEngine, TransformFlags, TransformOutcome};

/// Collaborators supplied by the host. Defaults: directory scanner, no hooks,
/// audit file from the configuration.
pub struct SetupContext {
    pub scanner: Arc<dyn ScannerAdapter>,
    pub hooks: Arc<dyn ExtensionHooks>,
    pub audit: Option<AuditLog>,
}

impl Default for SetupContext {
    fn default() -> Self {
        Self {
            scanner: Arc::new(DirExportScanner),
            hooks: Arc::new(NoopHooks),
            audit: None,
        }
    }
}

/// Generated files for the build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTemplates {
    /// `imports.mjs`
    pub imports_module: String,
    /// `imports.d.ts`
    pub imports_declaration: String,
    /// `types/imports.d.ts`
    pub type_declarations: String,
    /// Plugin template registering every entry globally, dev mode only.
    pub global_registration: Option<String>,
}

pub struct UndoImports {
    config: Arc<Config>,
    registry: Arc<Registry>,
    audit: Arc<AuditLog>,
    engine: TransformEngine,
    scanner: Arc<dyn ScannerAdapter>,
    hooks: Arc<dyn ExtensionHooks>,
    scan_dirs: Vec<PathBuf>,
}

impl UndoImports {
    pub fn setup(options: Options) -> Result<Self> {
        Self::setup_with(options, SetupContext::default())
    }

    /// Any error returned here is fatal to the build.
    pub fn setup_with(options: Options, ctx: SetupContext) -> Result<Self> {
        let config = Arc::new(Config::resolve(options)?);
        log_mode_banner(&config);

        let audit = match ctx.audit {
            Some(audit) => audit,
            None => match AuditLog::open(&config.audit_file) {
                Ok(audit) => audit,
                Err(err) => {
                    tracing::warn!(code = err.code(), "audit log unavailable, nothing will be recorded: {}", err);
                    AuditLog::disabled()
                }
            },
        };
        let audit = Arc::new(audit);

        let mut presets = config.presets.clone();
        ctx.hooks.sources(&mut presets)?;

        let mut registry = Registry::new();
        registry.register_presets(&presets);
        registry.register(config.imports.iter().cloned());

        let mut scan_dirs = config.scan_dirs.clone();
        ctx.hooks.dirs(&mut scan_dirs)?;
        let scan_dirs = scan_dirs
            .iter()
            .map(|d| PathBuf::from(normalize_path(&d.to_string_lossy())))
            .collect();

        let registry = Arc::new(registry);
        let engine = TransformEngine::new(config.clone(), registry.clone(), audit.clone());
        let plugin = Self {
            config,
            registry,
            audit,
            engine,
            scanner: ctx.scanner,
            hooks: ctx.hooks,
            scan_dirs,
        };

        let count = plugin.regenerate()?;
        tracing::info!(
            entries = plugin.registry.snapshot().len(),
            scanned = count,
            "import registry ready"
        );
        Ok(plugin)
    }

    fn regenerate(&self) -> Result<usize> {
        let scanner = &self.scanner;
        let hooks = &self.hooks;
        let dirs = &self.scan_dirs;
        self.registry.begin_dynamic_update(|entries| {
            entries.extend(scanner.scan(dirs)?);
            hooks.extend(entries)
        })
    }

    /// Rebuilds the dynamic partition. Failures keep the previous partition
    /// and are logged; the error is returned for the host to surface.
    pub fn rescan(&self) -> Result<usize> {
        self.regenerate().inspect_err(|err| {
            tracing::warn!(code = err.code(), "keeping previous imports: {}", err);
        })
    }

    /// Watcher notification. Returns `None` when the path is outside every scan directory.
    pub fn on_file_change(&self, path: &Path) -> Option<Result<usize>> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config.cwd).join(path)
        };
        let path = PathBuf::from(normalize_path(&path.to_string_lossy()));
        if !self.scan_dirs.iter().any(|dir| path.starts_with(dir)) {
            return None;
        }
        tracing::debug!(path = %path.display(), "scan directory changed");
        Some(self.rescan())
    }

    /// App generation always refreshes the registry.
    pub fn on_generate_app(&self) -> Result<usize> {
        self.rescan()
    }

    /// Dev builds register everything on `globalThis` instead of transforming.
    pub fn transforms_enabled(&self) -> bool {
        !(self.config.dev && self.config.global)
    }

    pub fn should_handle(&self, id: &str, code: &str) -> bool {
        self.transforms_enabled() && self.engine.should_handle(id, code)
    }

    pub fn transform(&self, code: &str, id: &str) -> TransformOutcome {
        self.engine.transform(code, id, TransformFlags::default())
    }

    pub fn transform_with(&self, code: &str, id: &str, flags: TransformFlags) -> TransformOutcome {
        self.engine.transform(code, id, flags)
    }

    /// Filters then transforms many units in parallel.
    pub fn transform_batch(&self, units: &[(String, String)]) -> Vec<TransformOutcome> {
        if !self.transforms_enabled() {
            return units
                .iter()
                .map(|(_, code)| TransformOutcome::unchanged(code))
                .collect();
        }
        self.engine.transform_batch(units, TransformFlags::default())
    }

    pub fn templates(&self) -> GeneratedTemplates {
        let entries = self.registry.all_entries();
        GeneratedTemplates {
            imports_module: templates::imports_module(&entries),
            imports_declaration: templates::to_exports(&entries),
            type_declarations: templates::type_declarations(
                &entries,
                self.config.auto_import,
                &self.config.build_dir,
            ),
            global_registration: (!self.transforms_enabled())
                .then(|| templates::global_registration(&entries)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn scan_dirs(&self) -> &[PathBuf] {
        &self.scan_dirs
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// End of build: flush the audit sink and say where it is.
    pub fn finish(&self) {
        self.audit.close();
        if let Some(path) = self.audit.path() {
            tracing::info!(records = self.audit.len(), "Missing imports listed in {}", path.display());
        }
    }
}

fn log_mode_banner(config: &Config) {
    match config.mode {
        Mode::Insert => {
            tracing::warn!("Insertion mode: hope you committed your changes before running the build!")
        }
        Mode::Comment => {
            tracing::info!("Comment mode: imports will be included in your files, but commented out.")
        }
        Mode::Log => tracing::info!(
            "Logging mode: you'll just get {} at your project root.",
            config.audit_file.display()
        ),
    }
}
