// Error handling framework

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving credentials or opening an SFTP session.
///
/// Configuration errors are detected before any network I/O. Connection
/// errors happen while dialing or authenticating. Both end the scrape with
/// the liveness gauge set to zero.
#[derive(Error, Debug)]
pub enum SftpError {
    #[error("only one of sftp.key and sftp.key_file should be provided")]
    ConflictingCredentialSource,

    #[error("SFTP key is not valid base64: {0}")]
    MalformedKeyEncoding(#[from] base64::DecodeError),

    #[error("Failed to read SFTP key file {}: {source}", path.display())]
    KeyFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("either one of sftp.password, sftp.key or sftp.key_file is required")]
    NoCredentialsProvided,

    #[error("SFTP connection failed: {0}")]
    ConnectionFailed(String),

    #[error("SFTP authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Failed to decrypt SSH key: {0}")]
    KeyDecryptionFailed(String),

    #[error("Invalid SSH key format: {0}")]
    InvalidKeyFormat(String),
}

impl SftpError {
    /// Whether the error was caused by the exporter configuration rather
    /// than by the remote end.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SftpError::ConflictingCredentialSource
                | SftpError::MalformedKeyEncoding(_)
                | SftpError::KeyFileUnreadable { .. }
                | SftpError::NoCredentialsProvided
        )
    }

    /// Short label used for the scrape result self-metric
    pub fn label(&self) -> &'static str {
        if self.is_configuration() {
            "configuration_error"
        } else {
            "connection_error"
        }
    }
}

/// Per-path query errors. These never leave the stat collector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("capacity query failed for {path}: {message}")]
    Capacity { path: String, message: String },

    #[error("walking {path} failed: {message}")]
    Walk { path: String, message: String },
}

impl RemoteError {
    pub fn capacity(path: impl Into<String>, message: impl ToString) -> Self {
        RemoteError::Capacity {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn walk(path: impl Into<String>, message: impl ToString) -> Self {
        RemoteError::Walk {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Remote path the error refers to
    pub fn path(&self) -> &str {
        match self {
            RemoteError::Capacity { path, .. } | RemoteError::Walk { path, .. } => path,
        }
    }
}

/// Settings loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required setting: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_classified() {
        assert!(SftpError::ConflictingCredentialSource.is_configuration());
        assert!(SftpError::NoCredentialsProvided.is_configuration());
        assert!(!SftpError::ConnectionFailed("refused".to_string()).is_configuration());
        assert!(!SftpError::KeyDecryptionFailed("bad".to_string()).is_configuration());
    }

    #[test]
    fn test_error_labels() {
        assert_eq!(SftpError::NoCredentialsProvided.label(), "configuration_error");
        assert_eq!(
            SftpError::AuthenticationFailed("denied".to_string()).label(),
            "connection_error"
        );
    }

    #[test]
    fn test_key_file_error_mentions_path() {
        let err = SftpError::KeyFileUnreadable {
            path: PathBuf::from("/etc/keys/id_rsa"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/etc/keys/id_rsa"));
    }

    #[test]
    fn test_remote_error_path() {
        let err = RemoteError::capacity("/upload", "permission denied");
        assert_eq!(err.path(), "/upload");
        assert!(err.to_string().contains("permission denied"));
    }
}
