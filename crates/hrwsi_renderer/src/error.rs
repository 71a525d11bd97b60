use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no renderer registered for routine '{0}'")]
    UnknownRoutine(String),
    #[error("invalid tile '{0}': expected MGRS-style code (e.g. 31TCH)")]
    InvalidTile(String),
    #[error("invalid measurement day {0}: must be in [2016-08-01, now]")]
    InvalidMeasurementDay(i32),
    #[error("invalid product name '{0}': {1}")]
    InvalidProductName(String, String),
    #[error("failed to write configuration file at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_yaml::Error),
}
