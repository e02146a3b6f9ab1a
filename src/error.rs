#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("unknown difficulty: {0:?}")]
    UnknownDifficulty(String),
    #[error("unknown confidence level: {0:?}")]
    UnknownConfidence(String),
    #[error("invalid timestamp {value:?} in {file}")]
    InvalidTimestamp { file: String, value: String },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
