use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure `Status` body returned by the API server.
///
/// Carried verbatim to callers; no interpretation of `reason` happens in this crate.
#[derive(Error, Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[error("{message}: {reason}")]
pub struct ErrorResponse {
    /// The status
    pub status: String,
    /// A message about the error
    #[serde(default)]
    pub message: String,
    /// The reason for the error
    #[serde(default)]
    pub reason: String,
    /// The error code
    pub code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFLICT: &str = r#"
    {
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Failure",
      "message": "Operation cannot be fulfilled on configmaps \"cfg\": the object has been modified",
      "reason": "Conflict",
      "details": { "name": "cfg", "kind": "configmaps" },
      "code": 409
    }
    "#;

    #[test]
    fn parses_status_failure_body() {
        let err: ErrorResponse = serde_json::from_str(CONFLICT).unwrap();
        assert_eq!(err.code, 409);
        assert_eq!(err.reason, "Conflict");
        assert!(err.to_string().ends_with(": Conflict"));
    }

    #[test]
    fn message_and_reason_are_optional() {
        let err: ErrorResponse = serde_json::from_str(r#"{"status": "Failure", "code": 500}"#).unwrap();
        assert_eq!(err.message, "");
        assert_eq!(err.reason, "");
    }
}
