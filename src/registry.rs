//! Identifier registry.
//!
//! Three tiers feed one effective view, lowest precedence first:
//!
//! 1. presets (static, built at setup),
//! 2. the dynamic partition (scanned directories plus `extend` hook additions),
//! 3. explicitly configured imports (static, built at setup).
//!
//! A higher tier replaces a lower tier's entry for the same identifier; inside
//! one tier the last registration wins. The effective view lives in an
//! `ArcSwap`, so a rescan publishes its result in a single store and readers
//! holding an older snapshot keep a consistent view.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::entry::{ImportEntry, Preset};
use crate::error::{Result, UndoError};

#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    entries: Vec<ImportEntry>,
    by_identifier: HashMap<String, usize>,
    dynamic: Vec<ImportEntry>,
}

impl RegistrySnapshot {
    fn build(presets: &[ImportEntry], dynamic: Vec<ImportEntry>, explicit: &[ImportEntry]) -> Self {
        let mut entries: Vec<ImportEntry> = Vec::new();
        let mut by_identifier = HashMap::new();

        for entry in presets.iter().chain(dynamic.iter()).chain(explicit.iter()) {
            match by_identifier.get(&entry.identifier) {
                Some(&i) => entries[i] = entry.clone(),
                None => {
                    by_identifier.insert(entry.identifier.clone(), entries.len());
                    entries.push(entry.clone());
                }
            }
        }

        Self {
            entries,
            by_identifier,
            dynamic,
        }
    }

    #[inline]
    pub fn resolve(&self, identifier: &str) -> Option<&ImportEntry> {
        self.by_identifier.get(identifier).map(|&i| &self.entries[i])
    }

    /// Effective entries in first-registration order.
    pub fn entries(&self) -> &[ImportEntry] {
        &self.entries
    }

    /// The committed dynamic partition as registered.
    pub fn dynamic_entries(&self) -> &[ImportEntry] {
        &self.dynamic
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub struct Registry {
    presets: Vec<ImportEntry>,
    explicit: Vec<ImportEntry>,
    snap: ArcSwap<RegistrySnapshot>,
    rescan: Mutex<()>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            presets: Vec::new(),
            explicit: Vec::new(),
            snap: ArcSwap::from_pointee(RegistrySnapshot::default()),
            rescan: Mutex::new(()),
        }
    }

    pub fn register_presets(&mut self, presets: &[Preset]) {
        self.presets
            .extend(presets.iter().filter(|p| !p.disabled).flat_map(|p| p.entries()));
        self.republish();
    }

    /// Merges explicitly configured entries into the static partition.
    pub fn register<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = ImportEntry>,
    {
        self.explicit.extend(entries);
        self.republish();
    }

    fn republish(&self) {
        let cur = self.snap.load_full();
        let next = RegistrySnapshot::build(&self.presets, cur.dynamic.clone(), &self.explicit);
        self.snap.store(Arc::new(next));
    }

    /// Rebuilds the dynamic partition.
    ///
    /// The mutator starts from an empty set and appends entries. The new
    /// snapshot is only published if it returns `Ok`; on failure the previous
    /// partition stays in effect and the error comes back as a rescan error.
    /// Returns the size of the new dynamic partition.
    pub fn begin_dynamic_update<F>(&self, mutator: F) -> Result<usize>
    where
        F: FnOnce(&mut Vec<ImportEntry>) -> Result<()>,
    {
        let _guard = self.rescan.lock();

        let mut dynamic = Vec::new();
        mutator(&mut dynamic).map_err(|e| match e {
            UndoError::Rescan(_) => e,
            other => UndoError::Rescan(other.to_string()),
        })?;

        let count = dynamic.len();
        let next = RegistrySnapshot::build(&self.presets, dynamic, &self.explicit);
        self.snap.store(Arc::new(next));
        Ok(count)
    }

    pub fn clear_dynamic(&self) {
        // An infallible mutator always commits.
        let _ = self.begin_dynamic_update(|_| Ok(()));
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snap.load_full()
    }

    pub fn resolve(&self, identifier: &str) -> Option<ImportEntry> {
        self.snap.load().resolve(identifier).cloned()
    }

    pub fn all_entries(&self) -> Vec<ImportEntry> {
        self.snap.load().entries().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ImportSpec;

    fn registry() -> Registry {
        let mut r = Registry::new();
        r.register_presets(&[Preset::new("vue", &["ref", "computed", "watch"])]);
        r
    }

    #[test]
    fn test_resolve_presets() {
        let r = registry();
        assert_eq!(r.resolve("ref").unwrap().module_specifier, "vue");
        assert!(r.resolve("mapState").is_none());
        assert_eq!(r.all_entries().len(), 3);
    }

    #[test]
    fn test_dynamic_overrides_presets() {
        let r = registry();
        r.begin_dynamic_update(|set| {
            set.push(ImportEntry::named("ref", "~/composables/ref"));
            Ok(())
        })
        .unwrap();
        assert_eq!(r.resolve("ref").unwrap().module_specifier, "~/composables/ref");
        // Position in the effective order is kept from the first registration.
        assert_eq!(r.all_entries()[0].identifier, "ref");
    }

    #[test]
    fn test_explicit_overrides_dynamic() {
        let mut r = registry();
        let spec = ImportSpec {
            name: "useThing".into(),
            alias: None,
            from: "explicit-pkg".into(),
        };
        r.register([ImportEntry::from(&spec)]);
        r.begin_dynamic_update(|set| {
            set.push(ImportEntry::named("useThing", "~/composables/thing"));
            Ok(())
        })
        .unwrap();
        assert_eq!(r.resolve("useThing").unwrap().module_specifier, "explicit-pkg");
    }

    #[test]
    fn test_last_write_wins_within_tier() {
        let r = registry();
        r.begin_dynamic_update(|set| {
            set.push(ImportEntry::named("useA", "./one"));
            set.push(ImportEntry::named("useA", "./two"));
            Ok(())
        })
        .unwrap();
        assert_eq!(r.resolve("useA").unwrap().module_specifier, "./two");
        assert_eq!(r.snapshot().dynamic_entries().len(), 2);
    }

    #[test]
    fn test_failed_update_keeps_previous_partition() {
        let r = registry();
        r.begin_dynamic_update(|set| {
            set.push(ImportEntry::named("useA", "./a"));
            Ok(())
        })
        .unwrap();

        let err = r
            .begin_dynamic_update(|set| {
                set.push(ImportEntry::named("useB", "./b"));
                Err(UndoError::parse("./b.ts", "unexpected token"))
            })
            .unwrap_err();

        assert!(matches!(err, UndoError::Rescan(_)));
        assert!(r.resolve("useA").is_some());
        assert!(r.resolve("useB").is_none());
    }

    #[test]
    fn test_rescan_replaces_rather_than_appends() {
        let r = registry();
        r.begin_dynamic_update(|set| {
            set.push(ImportEntry::named("useA", "./a"));
            Ok(())
        })
        .unwrap();
        r.begin_dynamic_update(|set| {
            set.push(ImportEntry::named("useB", "./b"));
            Ok(())
        })
        .unwrap();
        assert!(r.resolve("useA").is_none());
        assert!(r.resolve("useB").is_some());

        r.clear_dynamic();
        assert!(r.resolve("useB").is_none());
        assert!(r.resolve("ref").is_some());
    }

    #[test]
    fn test_register_keeps_committed_dynamic_partition() {
        let mut r = registry();
        r.begin_dynamic_update(|set| {
            set.push(ImportEntry::named("useA", "./a"));
            Ok(())
        })
        .unwrap();
        r.register([ImportEntry::named("dayjs", "dayjs")]);
        assert!(r.resolve("useA").is_some());
        assert!(r.resolve("dayjs").is_some());
    }

    #[test]
    fn test_readers_never_observe_torn_partition() {
        let r = registry();
        let batch = |prefix: &str| -> Vec<ImportEntry> {
            (0..50)
                .map(|i| ImportEntry::named(&format!("{}{}", prefix, i), "./m"))
                .collect()
        };
        let a = batch("useA");
        let b = batch("useB");

        std::thread::scope(|s| {
            s.spawn(|| {
                for round in 0..200 {
                    let next = if round % 2 == 0 { a.clone() } else { b.clone() };
                    r.begin_dynamic_update(move |set| {
                        set.extend(next);
                        Ok(())
                    })
                    .unwrap();
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..500 {
                        let snap = r.snapshot();
                        let dynamic = snap.dynamic_entries();
                        if dynamic.is_empty() {
                            continue;
                        }
                        let prefix = &dynamic[0].identifier[..4];
                        assert_eq!(dynamic.len(), 50);
                        assert!(dynamic.iter().all(|e| e.identifier.starts_with(prefix)));
                    }
                });
            }
        });
    }
}
