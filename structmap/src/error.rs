use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructMapError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Record type not registered: {0}")]
    NotRegistered(String),

    #[error("Record not persisted: {0} has no identifier")]
    NotPersisted(String),

    #[error("Unpersisted reference: referenced {0} has no identifier, insert it first")]
    UnpersistedReference(String),

    #[error("Referenced row not found: {table} with id {id}")]
    ReferenceNotFound { table: String, id: String },

    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Execution error while {context}: {source}")]
    Execution {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Cyclic reference: {0}")]
    CyclicReference(String),

    #[error("Reference depth exceeded: more than {0} nested references")]
    ReferenceDepthExceeded(usize),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StructMapError {
    /// Build a closure wrapping a backend error with what the mapper was doing.
    pub(crate) fn execution(
        context: impl Into<String>,
    ) -> impl FnOnce(rusqlite::Error) -> StructMapError {
        let context = context.into();
        move |source| StructMapError::Execution { context, source }
    }

    /// The backend error behind an `Execution` failure, if any.
    pub fn backend_error(&self) -> Option<&rusqlite::Error> {
        match self {
            StructMapError::Execution { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StructMapError>;
