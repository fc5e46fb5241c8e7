//! Script block extraction for raw Vue single-file components.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    /// Script block regex
    static ref SCRIPT_REGEX: Regex = Regex::new(r"(?is)<script\b([^>]*)>([\s\S]*?)</script>").unwrap();

    /// Attribute regex for parsing script attributes
    static ref ATTR_REGEX: Regex = Regex::new(r#"(?i)([a-z0-9-]+)(?:=(?:"([^"]*)"|'([^']*)'|([^>\s]+)))?"#).unwrap();
}

/// Byte range of one `<script>` block's content within the component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    pub start: usize,
    pub end: usize,
    pub attributes: HashMap<String, String>,
}

impl ScriptBlock {
    pub fn is_setup(&self) -> bool {
        self.attributes.contains_key("setup")
    }

    pub fn is_typescript(&self) -> bool {
        matches!(
            self.attributes.get("lang").map(String::as_str),
            Some("ts") | Some("tsx")
        )
    }

    pub fn is_jsx(&self) -> bool {
        matches!(
            self.attributes.get("lang").map(String::as_str),
            Some("tsx") | Some("jsx")
        )
    }
}

fn parse_attributes(attr_string: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for caps in ATTR_REGEX.captures_iter(attr_string) {
        if let Some(name) = caps.get(1) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "true".to_string());
            attributes.insert(name.as_str().to_lowercase(), value);
        }
    }
    attributes
}

pub fn script_blocks(source: &str) -> Vec<ScriptBlock> {
    SCRIPT_REGEX
        .captures_iter(source)
        .filter_map(|caps| {
            let content = caps.get(2)?;
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            Some(ScriptBlock {
                start: content.start(),
                end: content.end(),
                attributes: parse_attributes(attrs),
            })
        })
        .collect()
}

/// The block imports are injected into: `<script setup>` first, else the first block.
pub fn primary_script(source: &str) -> Option<ScriptBlock> {
    let blocks = script_blocks(source);
    let setup = blocks.iter().position(ScriptBlock::is_setup);
    match setup {
        Some(i) => blocks.into_iter().nth(i),
        None => blocks.into_iter().next(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_setup_block() {
        let sfc = r#"<script>
export default { name: 'A' }
</script>
<script setup lang="ts">
const count = ref(0)
</script>
<template><div>{{ count }}</div></template>"#;
        let block = primary_script(sfc).unwrap();
        assert!(block.is_setup());
        assert!(block.is_typescript());
        assert_eq!(&sfc[block.start..block.end], "\nconst count = ref(0)\n");
    }

    #[test]
    fn test_falls_back_to_first_block() {
        let sfc = "<template><p/></template><script>const a = 1</script>";
        let block = primary_script(sfc).unwrap();
        assert!(!block.is_setup());
        assert_eq!(&sfc[block.start..block.end], "const a = 1");
    }

    #[test]
    fn test_no_script() {
        assert!(primary_script("<template><p/></template>").is_none());
    }
}
