#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORT ENTRIES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportKind {
    Named,
    Default,
    Namespace,
}

impl ImportKind {
    /// Derives the kind from the exported name: `default` and `*` are special.
    pub fn from_exported_name(name: &str) -> Self {
        match name {
            "default" => ImportKind::Default,
            "*" => ImportKind::Namespace,
            _ => ImportKind::Named,
        }
    }
}

/// A bare identifier and the module that provides it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
    /// Name the source code references.
    pub identifier: String,
    /// Resolvable module path or package name.
    pub module_specifier: String,
    /// Name under which the module exports it.
    pub exported_name: String,
    pub kind: ImportKind,
}

impl ImportEntry {
    pub fn new(exported_name: &str, identifier: &str, module_specifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            module_specifier: module_specifier.to_string(),
            exported_name: exported_name.to_string(),
            kind: ImportKind::from_exported_name(exported_name),
        }
    }

    pub fn named(identifier: &str, module_specifier: &str) -> Self {
        Self::new(identifier, identifier, module_specifier)
    }

    pub fn is_renamed(&self) -> bool {
        self.kind == ImportKind::Named && self.exported_name != self.identifier
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION SHAPES
// ═══════════════════════════════════════════════════════════════════════════════

/// An explicitly configured import, `{ name, as?, from }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct ImportSpec {
    pub name: String,
    #[serde(default, rename = "as")]
    pub alias: Option<String>,
    pub from: String,
}

impl From<&ImportSpec> for ImportEntry {
    fn from(spec: &ImportSpec) -> Self {
        let identifier = spec.alias.as_deref().unwrap_or(&spec.name);
        ImportEntry::new(&spec.name, identifier, &spec.from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresetImport {
    Name(String),
    Renamed {
        name: String,
        #[serde(rename = "as")]
        alias: String,
    },
}

/// A named bundle of imports shipped for a common library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub from: String,
    pub imports: Vec<PresetImport>,
    #[serde(default)]
    pub disabled: bool,
}

impl Preset {
    pub fn new(from: &str, names: &[&str]) -> Self {
        Self {
            from: from.to_string(),
            imports: names
                .iter()
                .map(|n| PresetImport::Name(n.to_string()))
                .collect(),
            disabled: false,
        }
    }

    pub fn entries(&self) -> Vec<ImportEntry> {
        self.imports
            .iter()
            .map(|imp| match imp {
                PresetImport::Name(name) => ImportEntry::named(name, &self.from),
                PresetImport::Renamed { name, alias } => ImportEntry::new(name, alias, &self.from),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_exported_name() {
        assert_eq!(ImportKind::from_exported_name("default"), ImportKind::Default);
        assert_eq!(ImportKind::from_exported_name("*"), ImportKind::Namespace);
        assert_eq!(ImportKind::from_exported_name("ref"), ImportKind::Named);
    }

    #[test]
    fn test_spec_alias_becomes_identifier() {
        let spec: ImportSpec =
            serde_json::from_str(r#"{ "name": "default", "as": "axios", "from": "axios" }"#)
                .unwrap();
        let entry = ImportEntry::from(&spec);
        assert_eq!(entry.identifier, "axios");
        assert_eq!(entry.exported_name, "default");
        assert_eq!(entry.kind, ImportKind::Default);
    }

    #[test]
    fn test_preset_accepts_strings_and_objects() {
        let preset: Preset = serde_json::from_str(
            r#"{ "from": "vue", "imports": ["ref", { "name": "computed", "as": "derived" }] }"#,
        )
        .unwrap();
        let entries = preset.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ImportEntry::named("ref", "vue"));
        assert_eq!(entries[1].identifier, "derived");
        assert!(entries[1].is_renamed());
    }
}
