//! Image Sets - Error Types

use thiserror::Error;

/// Result type for image set operations
pub type ImageSetResult<T> = Result<T, ImageSetError>;

/// Image set error types
#[derive(Error, Debug)]
pub enum ImageSetError {
    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Authentication failed - wrong password or corrupted data")]
    Authentication,

    #[error("Malformed sealed blob: {0}")]
    MalformedBlob(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // ═══════════════════════════════════════════════════════════════
    // PASSWORD ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Password cannot be empty")]
    EmptyPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password prompt failed: {0}")]
    PromptFailed(String),

    // ═══════════════════════════════════════════════════════════════
    // SET ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("No images found in {0}")]
    EmptySet(String),

    #[error("Set \"{0}\" already exists")]
    DuplicateSet(String),

    #[error("Set \"{0}\" not found")]
    SetNotFound(String),

    #[error("Set \"{0}\" is not encrypted")]
    SetNotEncrypted(String),

    #[error("Invalid set name: {0:?}")]
    InvalidSetName(String),

    #[error("Duplicate image name in source list: {0}")]
    DuplicateImageName(String),

    // ═══════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

impl ImageSetError {
    /// Check if this error points at tampering or a wrong secret
    pub fn is_security_critical(&self) -> bool {
        matches!(
            self,
            ImageSetError::Authentication | ImageSetError::MalformedBlob(_)
        )
    }

    /// Check if this error was caused by caller input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ImageSetError::EmptySet(_)
                | ImageSetError::DuplicateSet(_)
                | ImageSetError::SetNotFound(_)
                | ImageSetError::SetNotEncrypted(_)
                | ImageSetError::InvalidSetName(_)
                | ImageSetError::DuplicateImageName(_)
                | ImageSetError::EmptyPassword
                | ImageSetError::PasswordMismatch
        )
    }
}

impl From<serde_json::Error> for ImageSetError {
    fn from(e: serde_json::Error) -> Self {
        ImageSetError::Manifest(e.to_string())
    }
}

impl From<base64::DecodeError> for ImageSetError {
    fn from(e: base64::DecodeError) -> Self {
        ImageSetError::Manifest(format!("invalid base64: {}", e))
    }
}

impl From<walkdir::Error> for ImageSetError {
    fn from(e: walkdir::Error) -> Self {
        match e.into_io_error() {
            Some(io) => ImageSetError::Filesystem(io),
            None => ImageSetError::Filesystem(std::io::Error::new(
                std::io::ErrorKind::Other,
                "filesystem loop detected",
            )),
        }
    }
}
