use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "UI-ERR-PARSE";
pub const ERR_RESCAN: &str = "UI-ERR-RESCAN";
pub const ERR_CONFIG: &str = "UI-ERR-CONFIG";
pub const ERR_SINK: &str = "UI-ERR-SINK";
pub const ERR_IO: &str = "UI-ERR-IO";
pub const ERR_JSON: &str = "UI-ERR-JSON";

#[derive(Error, Debug)]
pub enum UndoError {
    /// The usage detector could not analyze a unit. Callers fail open.
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    /// The scanner or an extension hook failed while rebuilding the dynamic partition.
    #[error("Rescan failed: {0}")]
    Rescan(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Audit sink unwritable: {0}")]
    SinkWrite(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UndoError>;

impl UndoError {
    pub fn parse(file: &str, message: impl Into<String>) -> Self {
        UndoError::Parse {
            file: file.to_string(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            UndoError::Parse { .. } => ERR_PARSE,
            UndoError::Rescan(_) => ERR_RESCAN,
            UndoError::Configuration(_) => ERR_CONFIG,
            UndoError::SinkWrite(_) => ERR_SINK,
            UndoError::Io(_) => ERR_IO,
            UndoError::Json(_) => ERR_JSON,
        }
    }

    /// Whether the error aborts the build invocation.
    ///
    /// Rescan errors are only fatal during the initial registry build; the
    /// orchestrator escalates those itself.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UndoError::Configuration(_))
    }
}

#[cfg(feature = "napi")]
impl From<UndoError> for napi::Error {
    fn from(err: UndoError) -> Self {
        napi::Error::from_reason(format!("[{}] {}", err.code(), err))
    }
}
