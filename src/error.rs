/*!
 * Error handling for gorzdrav library operations
 *
 * Provides the library error type with request context and suggestions.
 * Upstream business failures are carried as a classified
 * [`FailureCondition`](crate::classify::FailureCondition).
 */

use thiserror::Error;

use crate::classify::FailureCondition;

/// Gorzdrav library result type
pub type Result<T> = std::result::Result<T, GorzdravError>;

/// Error types with context and suggestions
#[derive(Error, Debug)]
pub enum GorzdravError {
    /// The input does not carry usable booking identifiers.
    /// This is a regular negative answer of the link parser.
    #[error("Not a recognized gorzdrav booking link: {url}")]
    LinkNotRecognized {
        url: String,
    },

    /// A deep link was requested for identifiers with no field set
    #[error("Cannot build a booking link: {message}")]
    InvalidIdentifiers {
        message: String,
    },

    /// The upstream API answered with `success = false`
    #[error(transparent)]
    Upstream(#[from] FailureCondition),

    /// Non-success HTTP status after all retries
    #[error("HTTP error {status}")]
    Http {
        status: u16,
        context: RequestContext,
    },

    /// Transport failure after all retries
    #[error("Network error: {message}")]
    Network {
        message: String,
        context: RequestContext,
    },

    /// Response body did not match the expected envelope or record shape
    #[error("Response validation error: {message}")]
    ResponseValidation {
        message: String,
        context: RequestContext,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        suggestion: Option<String>,
    },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Feature not enabled error
    #[error("Feature '{feature}' is not enabled")]
    FeatureNotEnabled {
        feature: String,
        enable_instruction: String,
    },
}

/// Where a failed upstream request was headed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub url: Option<String>,
    pub attempts: Option<u32>,
}

impl RequestContext {
    pub fn new(url: impl Into<String>, attempts: u32) -> Self {
        Self {
            url: Some(url.into()),
            attempts: Some(attempts),
        }
    }
}

impl GorzdravError {
    /// Create a not-a-link result for the given input
    pub fn link_not_recognized(url: &str) -> Self {
        Self::LinkNotRecognized {
            url: url.to_string(),
        }
    }

    /// Create an invalid identifiers error for an empty identifier set
    pub fn empty_identifiers() -> Self {
        Self::InvalidIdentifiers {
            message: "at least one of district, lpu, specialty or doctor must be set".to_string(),
        }
    }

    /// Create a feature not enabled error
    pub fn feature_required(feature: &str) -> Self {
        let enable_instruction = match feature {
            "client" => "Add 'gorzdrav = { version = \"0.0\", features = [\"client\"] }' to your Cargo.toml",
            _ => "Enable the required feature in your Cargo.toml",
        };

        Self::FeatureNotEnabled {
            feature: feature.to_string(),
            enable_instruction: enable_instruction.to_string(),
        }
    }

    /// Classified upstream failure, if this error carries one
    pub fn failure_condition(&self) -> Option<&FailureCondition> {
        match self {
            Self::Upstream(condition) => Some(condition),
            _ => None,
        }
    }

    /// Whether a later identical request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Network { .. } => true,
            Self::Upstream(FailureCondition::UpstreamTimeout { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::LinkNotRecognized { .. } => format!(
                "{}\n\nSuggestion: copy the link from the gorzdrav.spb.ru schedule page; \
                it must contain at least an institution and a specialty",
                self
            ),
            Self::Http { context, .. } | Self::Network { context, .. } | Self::ResponseValidation { context, .. } => {
                match (&context.url, context.attempts) {
                    (Some(url), Some(attempts)) => {
                        format!("{}\n\nRequest: {} (attempts: {})", self, url, attempts)
                    }
                    (Some(url), None) => format!("{}\n\nRequest: {}", self, url),
                    _ => self.to_string(),
                }
            }
            Self::Configuration { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            Self::FeatureNotEnabled { enable_instruction, .. } => {
                format!("{}\n\nTo enable: {}", self, enable_instruction)
            }
            _ => self.to_string(),
        }
    }
}

// Convenience conversions
impl From<std::io::Error> for GorzdravError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<::config::ConfigError> for GorzdravError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Configuration {
            message: err.to_string(),
            suggestion: Some("Check the config file and GORZDRAV_* environment variables".to_string()),
        }
    }
}
