//! Error types for Linkshare
//!
//! Every component reports failures through one of the enums below. None of
//! them are fatal: callers turn them into [`Notice`](crate::notice::Notice)s
//! and return to an idle state.

use thiserror::Error;

/// Local validation failures. Raised before any network or storage effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Candidate asset exceeds the configured byte limit
    #[error("Image size must be less than {limit} bytes (got {actual})")]
    Size { actual: u64, limit: u64 },

    /// Candidate asset is not an image
    #[error("Please upload an image file (got {mime_type:?})")]
    Type { mime_type: String },

    /// A required form field was left empty
    #[error("{field} can't be empty")]
    RequiredField { field: &'static str },

    /// A form field is present but malformed
    #[error("Invalid {field}: {value:?}")]
    Format { field: &'static str, value: String },
}

/// Failures of the binary asset storage call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Candidate rejected before any storage call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage backend denied permission
    #[error("Storage access denied")]
    Unauthorized,

    /// Storage backend gave up after its retry limit
    #[error("Upload timed out")]
    Timeout,

    /// Any other storage failure
    #[error("Upload failed: {0}")]
    Other(String),
}

impl UploadError {
    /// Message suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Validation(ValidationError::Size { limit, .. }) => {
                format!("Image size must be less than {}MB", limit / (1024 * 1024))
            }
            UploadError::Validation(ValidationError::Type { .. }) => {
                "Please upload an image file".to_string()
            }
            UploadError::Validation(other) => other.to_string(),
            UploadError::Unauthorized => "Storage access denied. Contact support.".to_string(),
            UploadError::Timeout => "Upload timeout. Please try again.".to_string(),
            UploadError::Other(message) => format!("Upload failed: {}", message),
        }
    }
}

/// A profile merge-write was rejected by the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to persist profile: {message}")]
pub struct PersistError {
    pub message: String,
}

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Credential errors reported by the identity provider.
///
/// Provider codes outside the known set collapse into [`AuthError::Unknown`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Incorrect password")]
    WrongPassword,

    #[error("No account found for this email")]
    UserNotFound,

    #[error("Password must be at least 8 characters with uppercase, number, and special character")]
    WeakPassword,

    #[error("Email already in use")]
    EmailAlreadyInUse,

    #[error("An error occurred")]
    Unknown,
}

impl AuthError {
    /// Map a provider error code (with or without the `auth/` prefix).
    pub fn from_code(code: &str) -> Self {
        let code = code.strip_prefix("auth/").unwrap_or(code);
        match code {
            "invalid-email" => AuthError::InvalidEmail,
            "wrong-password" => AuthError::WrongPassword,
            "user-not-found" => AuthError::UserNotFound,
            "weak-password" => AuthError::WeakPassword,
            "email-already-in-use" => AuthError::EmailAlreadyInUse,
            _ => AuthError::Unknown,
        }
    }

    /// Provider code for this category, `None` for the default bucket
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AuthError::InvalidEmail => Some("invalid-email"),
            AuthError::WrongPassword => Some("wrong-password"),
            AuthError::UserNotFound => Some("user-not-found"),
            AuthError::WeakPassword => Some("weak-password"),
            AuthError::EmailAlreadyInUse => Some("email-already-in-use"),
            AuthError::Unknown => None,
        }
    }
}

/// Main error type for Linkshare operations
#[derive(Error, Debug)]
pub enum LinkshareError {
    /// Local validation failed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Asset upload failed
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Profile write failed
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// Identity provider reported a credential error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Owner id cannot be used as a key or path segment
    #[error("Invalid owner id: {0:?}")]
    InvalidOwner(String),

    /// Error during storage operations (redb)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using LinkshareError
pub type LinkshareResult<T> = Result<T, LinkshareError>;
