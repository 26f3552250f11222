use thiserror::Error;

/// Fatal pipeline failures. Per-document extractor failures never surface
/// here; they become `ExtractionWarning`s instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read snapshot {path}: {source}")]
    SnapshotRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot: {0}")]
    SnapshotFormat(#[from] serde_json::Error),

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    ConfigFormat(#[from] serde_yaml::Error),
}

impl PipelineError {
    pub fn input(message: impl Into<String>) -> Self {
        PipelineError::Input(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Input(_)
                | PipelineError::SnapshotRead { .. }
                | PipelineError::SnapshotFormat(_)
        )
    }

    pub fn is_configuration_error(&self) -> bool {
        !self.is_input_error()
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_failures_are_input_errors() {
        let json_err = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        assert!(PipelineError::from(json_err).is_input_error());
        assert!(PipelineError::input("empty snapshot").is_input_error());
    }

    #[test]
    fn pattern_failures_are_configuration_errors() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err = PipelineError::InvalidPattern {
            pattern: "(unclosed".to_string(),
            source: regex_err,
        };
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("(unclosed"));
    }
}
