use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttributionError {
    /// Malformed, missing or ambiguous input rows.
    #[error("Data error: {key} — {reason}")]
    Data { key: String, reason: String },

    /// Invalid model, effect, criterion or request selection.
    #[error("Configuration error: {field} — {reason}")]
    Config { field: String, reason: String },

    /// Period tables that cannot be linked together.
    #[error("Linking error: period {period}, group '{group}' — {reason}")]
    Linking {
        period: String,
        group: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AttributionError {
    pub(crate) fn data(key: impl Into<String>, reason: impl Into<String>) -> Self {
        AttributionError::Data {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AttributionError::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn linking(
        period: impl Into<String>,
        group: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AttributionError::Linking {
            period: period.into(),
            group: group.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AttributionError {
    fn from(e: serde_json::Error) -> Self {
        AttributionError::Serialization(e.to_string())
    }
}
