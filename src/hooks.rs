use std::path::PathBuf;

use crate::entry::{ImportEntry, Preset};
use crate::error::Result;

/// Callbacks registered by other build collaborators.
///
/// Each hook receives the in-progress set and may append to or edit it
/// before it is committed. All hooks default to no-ops.
pub trait ExtensionHooks: Send + Sync {
    /// Preset assembly, once at setup.
    fn sources(&self, _presets: &mut Vec<Preset>) -> Result<()> {
        Ok(())
    }

    /// Scan directory assembly, once at setup.
    fn dirs(&self, _dirs: &mut Vec<PathBuf>) -> Result<()> {
        Ok(())
    }

    /// Every dynamic rebuild, after the directory scan.
    fn extend(&self, _entries: &mut Vec<ImportEntry>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ExtensionHooks for NoopHooks {}
