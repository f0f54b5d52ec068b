/*!
 * Upstream error classification
 *
 * The gorzdrav API reports business failures inside its response envelope
 * as `success = false` plus a numeric `errorCode`. This module maps those
 * codes onto a closed set of conditions callers can match on.
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upstream error code: the institution has no specialties open for booking
pub const CODE_NO_SPECIALTIES: i64 = 37;
/// Upstream error code: the specialty has no doctors open for booking
pub const CODE_NO_DOCTORS: i64 = 38;
/// Upstream error code: the doctor has no free tickets
pub const CODE_NO_TICKETS: i64 = 39;
/// Upstream error code: the medical organization did not answer in time
pub const CODE_UPSTREAM_TIMEOUT: i64 = 603;
/// Upstream error code: the medical information system failed
pub const CODE_UPSTREAM_SYSTEM_ERROR: i64 = 616;

/// Used when an unknown code arrives without any message
const GENERIC_FALLBACK_MESSAGE: &str = "upstream request failed";

/// Semantic failure reported by the upstream API
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum FailureCondition {
    #[error("No specialties (code {code}): {message}")]
    NoSpecialties { code: i64, message: String },

    #[error("No doctors (code {code}): {message}")]
    NoDoctors { code: i64, message: String },

    #[error("No tickets (code {code}): {message}")]
    NoTickets { code: i64, message: String },

    #[error("Upstream system error (code {code}): {message}")]
    UpstreamSystemError { code: i64, message: String },

    #[error("Upstream timeout (code {code}): {message}")]
    UpstreamTimeout { code: i64, message: String },

    #[error("Upstream failure (code {code}): {message}")]
    GenericUpstreamFailure { code: i64, message: String },
}

impl FailureCondition {
    /// Upstream error code this condition was built from
    pub fn code(&self) -> i64 {
        match self {
            Self::NoSpecialties { code, .. }
            | Self::NoDoctors { code, .. }
            | Self::NoTickets { code, .. }
            | Self::UpstreamSystemError { code, .. }
            | Self::UpstreamTimeout { code, .. }
            | Self::GenericUpstreamFailure { code, .. } => *code,
        }
    }

    /// Upstream message, or the table default when upstream sent none
    pub fn message(&self) -> &str {
        match self {
            Self::NoSpecialties { message, .. }
            | Self::NoDoctors { message, .. }
            | Self::NoTickets { message, .. }
            | Self::UpstreamSystemError { message, .. }
            | Self::UpstreamTimeout { message, .. }
            | Self::GenericUpstreamFailure { message, .. } => message,
        }
    }

    /// True for the "nothing to list" conditions.
    ///
    /// Directory lookups turn these into empty collections instead of errors.
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            Self::NoSpecialties { .. } | Self::NoDoctors { .. } | Self::NoTickets { .. }
        )
    }

    /// Short stable name, handy for logs and CLI output
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoSpecialties { .. } => "no_specialties",
            Self::NoDoctors { .. } => "no_doctors",
            Self::NoTickets { .. } => "no_tickets",
            Self::UpstreamSystemError { .. } => "upstream_system_error",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::GenericUpstreamFailure { .. } => "generic_upstream_failure",
        }
    }
}

/// Map an upstream `(errorCode, message)` pair onto a [`FailureCondition`].
///
/// Total over every code. A non-blank upstream message is kept verbatim;
/// blank ones count as absent and fall back to a fixed default text.
pub fn classify(code: i64, message: Option<&str>) -> FailureCondition {
    let upstream = message
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string);
    let or_default = |default: &str| upstream.clone().unwrap_or_else(|| default.to_string());

    match code {
        CODE_NO_SPECIALTIES => FailureCondition::NoSpecialties {
            code,
            message: or_default("no specialties available for this institution"),
        },
        CODE_NO_DOCTORS => FailureCondition::NoDoctors {
            code,
            message: or_default("no doctors available for this specialty"),
        },
        CODE_NO_TICKETS => FailureCondition::NoTickets {
            code,
            message: or_default("no appointment tickets available"),
        },
        CODE_UPSTREAM_SYSTEM_ERROR => FailureCondition::UpstreamSystemError {
            code,
            message: or_default("upstream medical information system error"),
        },
        CODE_UPSTREAM_TIMEOUT => FailureCondition::UpstreamTimeout {
            code,
            message: or_default("upstream medical organization did not respond in time"),
        },
        _ => FailureCondition::GenericUpstreamFailure {
            code,
            message: or_default(GENERIC_FALLBACK_MESSAGE),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_code_uses_default_message() {
        let condition = classify(37, None);
        assert_eq!(
            condition,
            FailureCondition::NoSpecialties {
                code: 37,
                message: "no specialties available for this institution".to_string(),
            }
        );
    }

    #[test]
    fn test_known_code_keeps_upstream_message() {
        let condition = classify(39, Some("Нет свободных талонов"));
        assert!(matches!(condition, FailureCondition::NoTickets { .. }));
        assert_eq!(condition.message(), "Нет свободных талонов");
    }

    #[test]
    fn test_table() {
        assert_eq!(classify(38, None).name(), "no_doctors");
        assert_eq!(classify(616, None).name(), "upstream_system_error");
        assert_eq!(classify(603, None).name(), "upstream_timeout");
        assert_eq!(
            classify(603, None).message(),
            "upstream medical organization did not respond in time"
        );
    }

    #[test]
    fn test_unknown_code_passes_message_through() {
        let condition = classify(9999, Some("x"));
        assert_eq!(
            condition,
            FailureCondition::GenericUpstreamFailure {
                code: 9999,
                message: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_code_is_total() {
        for code in [i64::MIN, -1, 0, 36, 40, 602, 604, 615, 617, i64::MAX] {
            let condition = classify(code, None);
            assert_eq!(condition.code(), code);
            assert!(matches!(condition, FailureCondition::GenericUpstreamFailure { .. }));
            assert_eq!(condition.message(), "upstream request failed");
        }
    }

    #[test]
    fn test_message_is_not_trimmed() {
        assert_eq!(classify(9999, Some("  x\n")).message(), "  x\n");
        assert_eq!(classify(38, Some(" Нет врачей ")).message(), " Нет врачей ");
    }

    #[test]
    fn test_blank_message_counts_as_absent() {
        assert_eq!(
            classify(38, Some("   ")).message(),
            "no doctors available for this specialty"
        );
    }

    #[test]
    fn test_empty_result_conditions() {
        assert!(classify(37, None).is_empty_result());
        assert!(classify(38, None).is_empty_result());
        assert!(classify(39, None).is_empty_result());
        assert!(!classify(603, None).is_empty_result());
        assert!(!classify(616, None).is_empty_result());
        assert!(!classify(1, None).is_empty_result());
    }

    #[test]
    fn test_display_carries_code_and_message() {
        let text = classify(616, Some("МИС недоступна")).to_string();
        assert!(text.contains("616"));
        assert!(text.contains("МИС недоступна"));
    }
}
