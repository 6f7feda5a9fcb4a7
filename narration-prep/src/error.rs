use llm_client::{LlmError, TokenUsage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid character mapping on line {line_number} ({line:?}): {reason}")]
    MappingParse {
        line_number: usize,
        line: String,
        reason: String,
    },

    #[error("{0}")]
    Generation(LlmError),

    #[error("Generated text was empty")]
    EmptyOutput { usage: TokenUsage },

    #[error("Input text is empty")]
    EmptyInput,
}

impl PrepError {
    /// Short classification used in per-chunk log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) | Self::MappingParse { .. } => "ConfigurationError",
            Self::Generation(_) => "GenerationError",
            Self::EmptyOutput { .. } => "ValidationFailure",
            Self::EmptyInput => "InvalidInput",
        }
    }

    /// Errors that abort a whole document instead of a single attempt
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::MappingParse { .. } | Self::EmptyInput
        )
    }

    /// Usage already spent when the attempt failed
    pub fn usage(&self) -> TokenUsage {
        match self {
            Self::EmptyOutput { usage } => *usage,
            _ => TokenUsage::default(),
        }
    }
}

impl From<LlmError> for PrepError {
    fn from(err: LlmError) -> Self {
        if err.is_configuration() {
            Self::Configuration(err.to_string())
        } else {
            Self::Generation(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_errors_are_classified() {
        let missing: PrepError = LlmError::MissingApiToken {
            provider: "Hugging Face".to_string(),
            env_var: "HUGGINGFACE_API_TOKEN".to_string(),
        }
        .into();
        assert!(matches!(missing, PrepError::Configuration(_)));
        assert!(missing.is_fatal());
        assert_eq!(missing.kind(), "ConfigurationError");

        let timeout: PrepError = LlmError::Timeout {
            timeout: std::time::Duration::from_secs(5),
        }
        .into();
        assert!(matches!(timeout, PrepError::Generation(_)));
        assert!(!timeout.is_fatal());
        assert_eq!(timeout.kind(), "GenerationError");
        assert_eq!(timeout.to_string(), "Generation timed out after 5s");
    }

    #[test]
    fn test_empty_output_keeps_usage() {
        let usage = TokenUsage {
            input_tokens: 12,
            output_tokens: 0,
            ..TokenUsage::default()
        };
        let err = PrepError::EmptyOutput { usage };
        assert_eq!(err.kind(), "ValidationFailure");
        assert_eq!(err.usage(), usage);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_mapping_error_names_line() {
        let err = PrepError::MappingParse {
            line_number: 3,
            line: "Bob".to_string(),
            reason: "missing '='".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid character mapping on line 3 (\"Bob\"): missing '='"
        );
    }
}
