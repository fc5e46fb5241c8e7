//! N-API surface for the JS host.

use napi_derive::napi;

use crate::config::Options;
use crate::logging::init_logging;
use crate::plugin::UndoImports;
use crate::transform::TransformFlags;

#[napi(object)]
pub struct TransformResult {
    pub code: String,
    /// Serialized v3 source map.
    pub map: Option<String>,
}

#[napi(object)]
pub struct Templates {
    pub imports_module: String,
    pub imports_declaration: String,
    pub type_declarations: String,
    pub global_registration: Option<String>,
}

#[napi(js_name = "UndoImports")]
pub struct UndoImportsNative {
    inner: UndoImports,
}

#[napi]
impl UndoImportsNative {
    #[napi(constructor)]
    pub fn new(options: serde_json::Value) -> napi::Result<Self> {
        init_logging();
        let options = Options::from_json(options)?;
        Ok(Self {
            inner: UndoImports::setup(options)?,
        })
    }

    #[napi]
    pub fn should_handle(&self, id: String, code: String) -> bool {
        self.inner.should_handle(&id, &code)
    }

    /// `null` when the file is left unchanged.
    #[napi]
    pub fn transform(
        &self,
        code: String,
        id: String,
        auto_import: Option<bool>,
    ) -> napi::Result<Option<TransformResult>> {
        let flags = TransformFlags {
            auto_import: auto_import.unwrap_or(true),
        };
        let outcome = self.inner.transform_with(&code, &id, flags);
        if !outcome.changed {
            return Ok(None);
        }
        let map = match &outcome.map {
            Some(map) => Some(map.to_json()?),
            None => None,
        };
        Ok(Some(TransformResult {
            code: outcome.code,
            map,
        }))
    }

    #[napi]
    pub fn on_file_change(&self, path: String) -> bool {
        self.inner
            .on_file_change(std::path::Path::new(&path))
            .is_some_and(|r| r.is_ok())
    }

    #[napi]
    pub fn on_generate_app(&self) -> napi::Result<u32> {
        Ok(self.inner.on_generate_app()? as u32)
    }

    #[napi]
    pub fn templates(&self) -> Templates {
        let t = self.inner.templates();
        Templates {
            imports_module: t.imports_module,
            imports_declaration: t.imports_declaration,
            type_declarations: t.type_declarations,
            global_registration: t.global_registration,
        }
    }

    #[napi]
    pub fn finish(&self) {
        self.inner.finish();
    }
}
