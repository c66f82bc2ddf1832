//! Image Sets - Password Input
//!
//! The store never reads the terminal itself; it asks a `PasswordPrompt`.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{ImageSetError, ImageSetResult};

/// Source of secret strings
pub trait PasswordPrompt {
    /// Read one secret, showing `prompt` to the user if there is one
    fn read_password(&self, prompt: &str) -> ImageSetResult<SecretString>;
}

/// Reads from the controlling terminal without echo
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn read_password(&self, prompt: &str) -> ImageSetResult<SecretString> {
        rpassword::prompt_password(prompt)
            .map(SecretString::from)
            .map_err(|e| ImageSetError::PromptFailed(e.to_string()))
    }
}

/// Answers every prompt with the same secret
pub struct FixedPassword {
    password: SecretString,
}

impl FixedPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: SecretString::from(password.into()),
        }
    }
}

impl PasswordPrompt for FixedPassword {
    fn read_password(&self, _prompt: &str) -> ImageSetResult<SecretString> {
        Ok(SecretString::from(self.password.expose_secret().to_string()))
    }
}

/// Ask twice; reject a mismatch, then an empty password
pub fn obtain_password(prompt: &dyn PasswordPrompt) -> ImageSetResult<SecretString> {
    let password = prompt.read_password("Enter encryption password: ")?;
    let confirm = prompt.read_password("Confirm password: ")?;

    if password.expose_secret() != confirm.expose_secret() {
        return Err(ImageSetError::PasswordMismatch);
    }

    require_non_empty(password)
}

/// Reject an empty password
pub fn require_non_empty(password: SecretString) -> ImageSetResult<SecretString> {
    if password.expose_secret().is_empty() {
        return Err(ImageSetError::EmptyPassword);
    }
    Ok(password)
}
