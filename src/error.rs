//! Error types for the Firma SDK.
//!
//! Every fallible operation in the crate returns [`FirmaError`]. Construction
//! failures (configuration, trust anchor, certificates, encryption) are fatal
//! for the client being built; document operation failures carry the HTTP
//! status and body so callers can branch on them.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Firma operations.
pub type Result<T> = std::result::Result<T, FirmaError>;

/// Errors that can occur when using the Firma SDK.
#[derive(Error, Debug)]
pub enum FirmaError {
    /// Required construction parameters are missing or malformed.
    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// A path failed strict validation.
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// No usable public key could be obtained from any source.
    #[error("Trust anchor unavailable: {0}")]
    TrustAnchorUnavailable(String),

    /// A certificate or key file for mutual TLS is missing or unreadable.
    #[error("Certificate unavailable: {0}")]
    CertificateUnavailable(String),

    /// Mutual TLS material could not be turned into a TLS context.
    #[error("Invalid certificate: {0}")]
    CertificateInvalid(String),

    /// The API key could not be encrypted with the trust anchor.
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// A document operation failed on the wire or returned a non-2xx status.
    #[error("Remote operation failed ({}): {message}", describe_status(.status_code))]
    RemoteOperationFailed {
        /// HTTP status code, if a response was received.
        status_code: Option<u16>,
        /// Human-readable failure description.
        message: String,
        /// Response body, if one was received.
        body: Option<String>,
    },

    /// The compared document carries no third-party signature (HTTP 422).
    #[error("No third-party signature to compare (status {status_code})")]
    NoThirdPartySignature {
        /// HTTP status code returned by the service.
        status_code: u16,
        /// Response body, if one was received.
        body: Option<String>,
    },

    /// A response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Reasons a path fails strict validation, checked in declaration order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path string is empty or only whitespace.
    #[error("path {0:?} is empty")]
    Empty(String),

    /// The resolved path does not exist.
    #[error("path {} does not exist", .0.display())]
    NotFound(PathBuf),

    /// The resolved path exists but is not a regular file.
    #[error("path {} is not a file", .0.display())]
    NotAFile(PathBuf),
}

fn describe_status(status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("status {}", code),
        None => "no response".to_string(),
    }
}

impl FirmaError {
    /// Returns the HTTP status code if available.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FirmaError::RemoteOperationFailed { status_code, .. } => *status_code,
            FirmaError::NoThirdPartySignature { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns the response body of a failed remote operation, if any.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            FirmaError::RemoteOperationFailed { body, .. }
            | FirmaError::NoThirdPartySignature { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    /// Returns true if this is compare's "no third-party signature" outcome.
    pub fn is_no_third_party_signature(&self) -> bool {
        matches!(self, FirmaError::NoThirdPartySignature { .. })
    }

    /// Returns true if the error came from a document operation exchange.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            FirmaError::RemoteOperationFailed { .. } | FirmaError::NoThirdPartySignature { .. }
        )
    }
}

impl From<reqwest::Error> for FirmaError {
    fn from(err: reqwest::Error) -> Self {
        FirmaError::RemoteOperationFailed {
            status_code: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FirmaError::RemoteOperationFailed {
            status_code: Some(500),
            message: "Internal Server Error".to_string(),
            body: Some("boom".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Remote operation failed (status 500): Internal Server Error"
        );

        let err = FirmaError::RemoteOperationFailed {
            status_code: None,
            message: "operation timed out".to_string(),
            body: None,
        };
        assert_eq!(
            err.to_string(),
            "Remote operation failed (no response): operation timed out"
        );
    }

    #[test]
    fn test_status_code() {
        let err = FirmaError::NoThirdPartySignature {
            status_code: 422,
            body: None,
        };
        assert_eq!(err.status_code(), Some(422));
        assert!(err.is_no_third_party_signature());
        assert!(err.is_remote());

        let err = FirmaError::EncryptionFailed("message too long".to_string());
        assert_eq!(err.status_code(), None);
        assert!(!err.is_remote());
    }

    #[test]
    fn test_response_body() {
        let err = FirmaError::RemoteOperationFailed {
            status_code: Some(400),
            message: "Bad Request".to_string(),
            body: Some(r#"{"error":"bad document"}"#.to_string()),
        };
        assert_eq!(err.response_body(), Some(r#"{"error":"bad document"}"#));
        assert_eq!(FirmaError::Decode("x".to_string()).response_body(), None);
    }

    #[test]
    fn test_path_error_display() {
        let err: FirmaError = PathError::NotFound(PathBuf::from("/nonexistent")).into();
        assert_eq!(err.to_string(), "Invalid path: path /nonexistent does not exist");
        assert_eq!(
            PathError::Empty("  ".to_string()).to_string(),
            "path \"  \" is empty"
        );
    }
}
