pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dataset YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported dataset format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("Unknown relationship type: {value}")]
    UnknownRelationshipType { value: String },
}
