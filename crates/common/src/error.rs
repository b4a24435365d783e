//! Error taxonomy for the coin data pipeline.
//!
//! Every error carries a structured detail for JSON output:
//! - **code**: machine-readable error code (e.g. `COIN_NOT_FOUND`)
//! - **category**: error class (`transport`, `upstream`, `validation`, `not_found`, `config`, `system`)
//! - **recoverable**: whether retrying or fixing input can help
//! - **hints**: actionable suggestions
//!
//! ```json
//! {
//!   "ok": false,
//!   "error": {
//!     "code": "COIN_NOT_FOUND",
//!     "message": "Coin not found: bitcoinz",
//!     "category": "not_found",
//!     "recoverable": true,
//!     "hints": ["Search for the coin id: coinboard coins search <name>"]
//!   }
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

/// Error category: determines exit code and whether a request is retried.
///
/// Exit codes:
/// - `0`: success
/// - `1`: user error (validation, not found, config)
/// - `2`: transport or upstream failure
/// - `3`: system error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Transport,
    Upstream,
    Validation,
    NotFound,
    Config,
    System,
}

impl ErrorCategory {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Validation => 1,
            ErrorCategory::NotFound => 1,
            ErrorCategory::Config => 1,
            ErrorCategory::Transport => 2,
            ErrorCategory::Upstream => 2,
            ErrorCategory::System => 3,
        }
    }
}

/// Structured error detail for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub category: ErrorCategory,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

/// Top-level error type for all coinboard operations.
///
/// `Clone` because one in-flight fetch fans its result out to every caller
/// waiting on the same query key.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoinboardError {
    // ── Transport ───────────────────────────────────────────────────
    /// Network or store unreachable.
    #[error("Transport error: {0}")]
    Transport(String),

    // ── Upstream ────────────────────────────────────────────────────
    /// Non-success response or malformed payload from the market-data API.
    #[error("Upstream error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // ── Validation ──────────────────────────────────────────────────
    #[error("Validation error: {0}")]
    Validation(String),

    // ── Not found ───────────────────────────────────────────────────
    #[error("Coin not found: {0}")]
    NotFound(String),

    // ── Config ──────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── System ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoinboardError {
    /// Shorthand for an upstream error with a known HTTP status.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        CoinboardError::Upstream {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Shorthand for a malformed upstream payload.
    pub fn malformed(message: impl Into<String>) -> Self {
        CoinboardError::Upstream {
            status: None,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CoinboardError::Transport(_) => ErrorCategory::Transport,
            CoinboardError::Upstream { .. } | CoinboardError::RateLimited(_) => {
                ErrorCategory::Upstream
            }
            CoinboardError::Validation(_) => ErrorCategory::Validation,
            CoinboardError::NotFound(_) => ErrorCategory::NotFound,
            CoinboardError::Config(_) => ErrorCategory::Config,
            CoinboardError::Internal(_) => ErrorCategory::System,
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, rate limits and 5xx responses are transient.
    /// Validation, not-found, 4xx and malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CoinboardError::Transport(_) | CoinboardError::RateLimited(_) => true,
            CoinboardError::Upstream {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    /// Get the structured error detail for JSON output.
    pub fn detail(&self) -> ErrorDetail {
        match self {
            CoinboardError::Transport(msg) => ErrorDetail {
                code: "TRANSPORT_ERROR".into(),
                message: msg.clone(),
                category: ErrorCategory::Transport,
                recoverable: true,
                hints: vec![
                    "Check network connectivity".into(),
                    "Run: coinboard doctor".into(),
                ],
            },
            CoinboardError::Upstream { status, message } => ErrorDetail {
                code: "UPSTREAM_ERROR".into(),
                message: match status {
                    Some(s) => format!("HTTP {s}: {message}"),
                    None => message.clone(),
                },
                category: ErrorCategory::Upstream,
                recoverable: self.is_transient(),
                hints: vec![],
            },
            CoinboardError::RateLimited(msg) => ErrorDetail {
                code: "RATE_LIMITED".into(),
                message: msg.clone(),
                category: ErrorCategory::Upstream,
                recoverable: true,
                hints: vec![
                    "Wait a minute and retry".into(),
                    "Configure an API key: coinboard configure api-key <key>".into(),
                ],
            },
            CoinboardError::Validation(msg) => ErrorDetail {
                code: "VALIDATION_ERROR".into(),
                message: msg.clone(),
                category: ErrorCategory::Validation,
                recoverable: true,
                hints: vec![],
            },
            CoinboardError::NotFound(id) => ErrorDetail {
                code: "COIN_NOT_FOUND".into(),
                message: self.to_string(),
                category: ErrorCategory::NotFound,
                recoverable: true,
                hints: vec![format!("Search for the coin id: coinboard coins search {id}")],
            },
            CoinboardError::Config(msg) => ErrorDetail {
                code: "CONFIG_ERROR".into(),
                message: msg.clone(),
                category: ErrorCategory::Config,
                recoverable: true,
                hints: vec!["Run: coinboard configure show".into()],
            },
            CoinboardError::Internal(msg) => ErrorDetail {
                code: "INTERNAL_ERROR".into(),
                message: msg.clone(),
                category: ErrorCategory::System,
                recoverable: false,
                hints: vec![],
            },
        }
    }

    /// Exit code: 0 success, 1 user error, 2 transport/upstream, 3 system.
    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    /// Serialize this error as the JSON error envelope.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ok": false,
            "error": self.detail(),
        })
    }
}

pub type CoinboardResult<T> = Result<T, CoinboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CoinboardError::Transport("connection reset".into()).is_transient());
        assert!(CoinboardError::RateLimited("429".into()).is_transient());
        assert!(CoinboardError::upstream(503, "unavailable").is_transient());
        assert!(!CoinboardError::upstream(400, "bad request").is_transient());
        assert!(!CoinboardError::malformed("expected array").is_transient());
        assert!(!CoinboardError::Validation("empty prices".into()).is_transient());
        assert!(!CoinboardError::NotFound("nope".into()).is_transient());
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(CoinboardError::Validation("x".into()).exit_code(), 1);
        assert_eq!(CoinboardError::NotFound("x".into()).exit_code(), 1);
        assert_eq!(CoinboardError::Transport("x".into()).exit_code(), 2);
        assert_eq!(CoinboardError::upstream(500, "x").exit_code(), 2);
        assert_eq!(CoinboardError::Internal("x".into()).exit_code(), 3);
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = CoinboardError::upstream(502, "bad gateway");
        assert_eq!(err.to_string(), "Upstream error (502): bad gateway");
        let err = CoinboardError::malformed("missing field `prices`");
        assert_eq!(err.to_string(), "Upstream error: missing field `prices`");
    }

    #[test]
    fn test_error_json_format() {
        let err = CoinboardError::NotFound("bitcoinz".into());
        let json = err.to_json();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["code"], "COIN_NOT_FOUND");
        assert_eq!(json["error"]["category"], "not_found");
        assert_eq!(json["error"]["recoverable"], true);
        assert!(json["error"]["hints"].is_array());
    }

    #[test]
    fn test_error_json_no_empty_hints() {
        let detail = CoinboardError::Validation("Coin ID is required".into()).detail();
        let serialized = serde_json::to_string(&detail).unwrap();
        assert!(!serialized.contains("\"hints\""));
    }
}
