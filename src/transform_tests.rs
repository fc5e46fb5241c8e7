//! Transform engine tests.
//!
//! These exercise the whole per-file path: classification, detection, mode
//! policy, splicing and audit records.

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::audit::{AuditLog, SharedBuffer, AUDIT_HEADER};
    use crate::config::{Config, Options};
    use crate::entry::ImportEntry;
    use crate::registry::Registry;
    use crate::transform::{TransformEngine, TransformFlags, TransformOutcome};

    const APP_FILE: &str = "/project/src/a.ts";

    fn engine_with(options: serde_json::Value) -> (TransformEngine, SharedBuffer) {
        let mut base = json!({
            "presets": [{ "from": "vue", "imports": ["ref", "computed", "watch", "map"] }],
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), options.as_object()) {
            base.extend(extra.clone());
        }
        let mut options = Options::from_json(base).unwrap();
        options.cwd = Some(PathBuf::from("/project"));
        let config = Arc::new(Config::resolve(options).unwrap());

        let mut registry = Registry::new();
        registry.register_presets(&config.presets);
        registry.register(config.imports.iter().cloned());

        let (audit, buffer) = AuditLog::in_memory();
        let engine = TransformEngine::new(config, Arc::new(registry), Arc::new(audit));
        (engine, buffer)
    }

    fn engine_in(mode: &str) -> (TransformEngine, SharedBuffer) {
        engine_with(json!({ "mode": mode }))
    }

    fn run(engine: &TransformEngine, code: &str, id: &str) -> TransformOutcome {
        engine.transform(code, id, TransformFlags::default())
    }

    /// Audit records after the header, as `(path, text)`.
    fn records(buffer: &SharedBuffer) -> Vec<(String, String)> {
        let contents = buffer.contents();
        let body = contents.strip_prefix(AUDIT_HEADER).unwrap_or(&contents);
        body.split("// ")
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| {
                let (path, text) = chunk.split_once('\n').unwrap();
                (path.to_string(), text.to_string())
            })
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SCENARIOS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_used_identifier_is_imported_unused_is_not() {
        let (engine, _) = engine_in("insert");
        let out = run(&engine, "const x = ref(1)", APP_FILE);
        assert!(out.changed);
        assert!(out.code.starts_with("import { ref } from 'vue'"));
        assert_eq!(out.code, "import { ref } from 'vue';\nconst x = ref(1)");
        assert!(!out.code.contains("computed"));
    }

    #[test]
    fn test_already_bound_file_is_unchanged() {
        let (engine, buffer) = engine_in("insert");
        let code = "import { ref } from 'vue'; const x = ref(1)";
        let out = run(&engine, code, APP_FILE);
        assert!(!out.changed);
        assert_eq!(out.code, code);
        assert!(records(&buffer).is_empty());
    }

    #[test]
    fn test_preamble_follows_directive_prologue() {
        let (engine, _) = engine_in("insert");
        let out = run(&engine, "'use client'\nconst x = ref(1)", APP_FILE);
        assert_eq!(out.code, "'use client'\nimport { ref } from 'vue';\nconst x = ref(1)");
    }

    #[test]
    fn test_commonjs_unit_gets_require() {
        let (engine, _) = engine_in("insert");
        let code = "const fs = require('fs')\nmodule.exports = computed(() => ref(1))";
        let out = run(&engine, code, "/project/src/a.js");
        assert_eq!(
            out.code,
            format!("const {{ computed, ref }} = require('vue');\n{}", code)
        );
    }

    #[test]
    fn test_imports_follow_first_use() {
        let (engine, _) = engine_in("insert");
        let out = run(&engine, "watch(x)\nconst a = ref(0)\nconst b = computed(() => a)", APP_FILE);
        assert!(out.code.starts_with("import { watch, ref, computed } from 'vue';\n"));
    }

    #[test]
    fn test_parse_error_fails_open() {
        let (engine, buffer) = engine_in("insert");
        let code = "const = ref(";
        let out = run(&engine, code, APP_FILE);
        assert!(!out.changed);
        assert_eq!(out.code, code);
        assert!(records(&buffer).is_empty());
        assert!(engine.try_transform(code, APP_FILE, TransformFlags::default()).is_err());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PROPERTIES
    // ═══════════════════════════════════════════════════════════════════════════════

    const CORPUS: &[(&str, &str)] = &[
        ("/project/src/a.ts", "const x = ref(1)\nwatch(x, () => computed(() => 1))"),
        ("/project/src/b.js", "'use strict'\nmodule.exports = { a: ref(1) }"),
        ("/project/src/c.ts", "import { ref as r } from '#imports'\nconst a = r(computed(() => 1))"),
        ("/project/src/d.ts", "import { useMystery } from '#imports'\nuseMystery(ref(1))"),
        ("/project/src/e.ts", "function f(ref) { return ref }\nconst m = map"),
        ("/project/src/f.tsx", "export const A = () => <div>{ref(1)}</div>"),
        ("/project/src/g.ts", "#!/usr/bin/env node\nref()"),
    ];

    #[test]
    fn test_second_pass_changes_nothing() {
        for mode in ["insert", "comment", "log"] {
            let (engine, _) = engine_in(mode);
            for (id, code) in CORPUS {
                let first = run(&engine, code, id);
                let second = run(&engine, &first.code, id);
                assert_eq!(second.code, first.code, "{} mode, {}", mode, id);
                assert!(!second.changed || mode == "log", "{} mode, {}", mode, id);
            }
        }
    }

    #[test]
    fn test_local_bindings_shadow_registry() {
        let (engine, _) = engine_in("insert");
        for code in [
            "const ref = () => 1; ref()",
            "let ref; ref = 1",
            "function ref() {} ref()",
            "class ref {} new ref()",
            "const f = (ref) => ref",
            "const { a: ref } = obj; ref",
            "try {} catch ({ ref }) { ref }",
            "import ref from 'elsewhere'; ref()",
            "import * as ref from 'elsewhere'; ref.x",
        ] {
            let out = run(&engine, code, APP_FILE);
            assert!(!out.changed, "{}", code);
        }
    }

    #[test]
    fn test_inner_scope_binding_leaves_outer_use_free() {
        let (engine, _) = engine_in("insert");
        for code in [
            "const vnode = ref('div')\nconst ids = items.map((ref) => ref.id)",
            "type Fn = (ref: number) => void\nconst x = ref(1)",
            "function f() { const ref = 1; return ref }\nref()",
            "{ let ref = 1 }\nref()",
        ] {
            let out = run(&engine, code, APP_FILE);
            assert_eq!(out.code, format!("import {{ ref }} from 'vue';\n{}", code), "{}", code);
        }
    }

    #[test]
    fn test_whole_identifier_matching() {
        let (engine, _) = engine_in("insert");
        let code = "const mapState = 1; my_map(mapState); remap(); obj.map(f); const s = 'map'";
        let out = run(&engine, code, APP_FILE);
        assert!(!out.changed);

        let out = run(&engine, "const r = map(list)", APP_FILE);
        assert_eq!(out.code, "import { map } from 'vue';\nconst r = map(list)");
    }

    #[test]
    fn test_mode_partition() {
        let code = "const x = ref(1)";

        let (insert, _) = engine_in("insert");
        let out = run(&insert, code, APP_FILE);
        assert_ne!(out.code, code);

        let (comment, _) = engine_in("comment");
        let out = run(&comment, code, APP_FILE);
        assert!(out.changed);
        assert_eq!(out.code, "// import { ref } from 'vue';\nconst x = ref(1)");

        let (log, buffer) = engine_in("log");
        let out = run(&log, code, APP_FILE);
        assert!(!out.changed);
        assert_eq!(out.code, code);
        assert_eq!(out.preamble, "import { ref } from 'vue';\n");
        assert_eq!(records(&buffer).len(), 1);
    }

    #[test]
    fn test_comment_mode_adds_only_missing_lines() {
        let (engine, _) = engine_in("comment");
        let first = run(&engine, "const x = ref(1)", APP_FILE);
        let edited = format!("{}\nconst y = computed(() => x)", first.code);
        let second = run(&engine, &edited, APP_FILE);
        assert!(second.code.starts_with("// import { computed } from 'vue';\n// import { ref } from 'vue';\n"));
    }

    #[test]
    fn test_audit_record_per_changed_file() {
        let (engine, buffer) = engine_in("insert");
        let out = run(&engine, "const x = ref(1)", APP_FILE);
        let (start, end) = out.inserted_range.unwrap();
        assert_eq!(&out.code[start..end], "import { ref } from 'vue';\n");

        run(&engine, "const y = 1", "/project/src/unchanged.ts");
        run(&engine, &out.code, APP_FILE);

        let records = records(&buffer);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, APP_FILE);
        assert_eq!(records[0].1, format!("{}\n", &out.code[start..end]));
    }

    #[test]
    fn test_audit_text_is_redacted() {
        let (engine, buffer) = engine_with(json!({
            "mode": "insert",
            "cwdAlias": "~",
            "imports": [{ "name": "useThing", "from": "/project/composables/thing.ts" }],
        }));
        let out = run(&engine, "useThing()", APP_FILE);
        assert!(out.code.starts_with("import { useThing } from '/project/composables/thing.ts';"));

        let records = records(&buffer);
        assert_eq!(records[0].0, APP_FILE);
        assert_eq!(records[0].1, "import { useThing } from '~/composables/thing.ts';\n\n");
    }

    #[test]
    fn test_virtual_and_synthetic_ids_are_not_audited() {
        let (engine, buffer) = engine_in("insert");
        let out = run(&engine, "ref(1)", "\0virtual:entry.js");
        assert!(out.changed);
        assert!(records(&buffer).is_empty());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // VIRTUAL IMPORTS AND DEPENDENCIES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_virtual_import_is_rewritten_per_module() {
        let (engine, _) = engine_in("insert");
        let code = "import { ref, useMystery } from '#imports'\nconst a = ref(useMystery())";
        let out = run(&engine, code, APP_FILE);
        assert_eq!(
            out.code,
            "import { ref } from 'vue';\nimport { useMystery } from '#imports';\nconst a = ref(useMystery())"
        );
    }

    #[test]
    fn test_dependency_only_gets_virtual_imports_resolved() {
        let (engine, buffer) = engine_in("insert");
        let id = "/project/node_modules/lib/index.js";
        assert!(!engine.should_handle(id, "export const a = ref(1)"));

        let code = "import { computed } from '#imports'\nexport const a = computed(() => ref(1))";
        assert!(engine.should_handle(id, code));
        let out = run(&engine, code, id);
        assert_eq!(
            out.code,
            "import { computed } from 'vue';\nexport const a = computed(() => ref(1))"
        );
        assert!(records(&buffer).is_empty());
    }

    #[test]
    fn test_dependency_untouched_in_comment_and_log_modes() {
        for mode in ["comment", "log"] {
            let (engine, _) = engine_in(mode);
            let code = "import { computed } from '#imports'\ncomputed()";
            let out = run(&engine, code, "/project/node_modules/lib/index.js");
            assert!(!out.changed, "{}", mode);
        }
    }

    #[test]
    fn test_auto_import_switch() {
        let (engine, _) = engine_with(json!({ "mode": "insert", "autoImport": false }));
        assert!(!run(&engine, "ref(1)", APP_FILE).changed);

        let (engine, _) = engine_in("insert");
        let out = engine.transform("ref(1)", APP_FILE, TransformFlags { auto_import: false });
        assert!(!out.changed);
        let out = engine.transform(
            "import { ref } from '#imports'\nref(1)",
            APP_FILE,
            TransformFlags { auto_import: false },
        );
        assert!(out.code.starts_with("import { ref } from 'vue';"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // COMPONENTS AND SOURCE MAPS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_vue_component_script_setup() {
        let (engine, _) = engine_in("insert");
        let sfc = "<script setup lang=\"ts\">\nconst count = ref<number>(0)\n</script>\n<template><p>{{ computed }}</p></template>";
        let out = run(&engine, sfc, "/project/src/App.vue");
        assert_eq!(
            out.code,
            "<script setup lang=\"ts\">\nimport { ref } from 'vue';\nconst count = ref<number>(0)\n</script>\n<template><p>{{ computed }}</p></template>"
        );
    }

    #[test]
    fn test_vue_component_without_script_is_skipped() {
        let (engine, buffer) = engine_in("insert");
        let sfc = "<template>\n  <p>{{ ref(1) }}</p>\n</template>\n";
        let out = engine
            .try_transform(sfc, "/project/src/Static.vue", TransformFlags::default())
            .unwrap();
        assert!(!out.changed);
        assert_eq!(out.code, sfc);
        assert!(records(&buffer).is_empty());
    }

    #[test]
    fn test_vue_script_sub_request() {
        let (engine, _) = engine_in("insert");
        let id = "/project/src/App.vue?vue&type=script&setup=true&lang.ts";
        assert!(engine.should_handle(id, ""));
        let out = run(&engine, "const a: number = ref(1).value", id);
        assert!(out.code.starts_with("import { ref } from 'vue';\n"));
    }

    #[test]
    fn test_source_map_when_requested() {
        let (engine, _) = engine_with(json!({ "mode": "insert", "sourcemap": true }));
        let out = run(&engine, "const x = ref(1)\nx", APP_FILE);
        let map = out.map.unwrap();
        assert_eq!(map.sources, vec![APP_FILE.to_string()]);
        assert_eq!(map.mappings, ";AAAA;AACA");

        let (engine, _) = engine_in("insert");
        assert!(run(&engine, "ref()", APP_FILE).map.is_none());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CONCURRENCY
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_parallel_batch_keeps_order_and_audit_integrity() {
        let (engine, buffer) = engine_in("insert");
        let units: Vec<(String, String)> = (0..64)
            .map(|i| {
                let code = if i % 2 == 0 {
                    format!("export const v{} = ref({})", i, i)
                } else {
                    format!("export const v{} = {}", i, i)
                };
                (format!("/project/src/m{}.ts", i), code)
            })
            .collect();

        let outcomes = engine.transform_batch(&units, TransformFlags::default());
        assert_eq!(outcomes.len(), 64);
        for (i, ((_, code), out)) in units.iter().zip(&outcomes).enumerate() {
            assert_eq!(out.changed, i % 2 == 0);
            assert!(out.code.ends_with(code.as_str()));
        }

        let records = records(&buffer);
        assert_eq!(records.len(), 32);
        for (path, text) in records {
            assert!(path.starts_with("/project/src/m"));
            assert_eq!(text, "import { ref } from 'vue';\n\n");
        }
    }

    #[test]
    fn test_registry_swap_is_seen_by_next_transform() {
        let config = {
            let mut options = Options::default();
            options.mode = "insert".into();
            options.presets = vec![];
            options.cwd = Some(PathBuf::from("/project"));
            Arc::new(Config::resolve(options).unwrap())
        };
        let registry = Arc::new(Registry::new());
        let engine = TransformEngine::new(config, registry.clone(), Arc::new(AuditLog::disabled()));

        assert!(!run(&engine, "useA()", APP_FILE).changed);
        registry
            .begin_dynamic_update(|set| {
                set.push(ImportEntry::named("useA", "/project/composables/a.ts"));
                Ok(())
            })
            .unwrap();
        assert_eq!(
            run(&engine, "useA()", APP_FILE).code,
            "import { useA } from '/project/composables/a.ts';\nuseA()"
        );
    }
}
