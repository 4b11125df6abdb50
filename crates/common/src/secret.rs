//! Redacting wrapper for tokens and passwords

use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Sensitive value (access token, refresh token, password).
///
/// Debug and Display print `[REDACTED]` so a session can be logged with `?`
/// without leaking credentials. The buffer is zeroed on drop.
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the inner value. Keep the borrow short and never log it.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Read a secret kept alone in a file, such as a password file.
    ///
    /// Trailing line endings are dropped, other whitespace is kept. An empty
    /// file yields `None`.
    pub fn read_file(path: &Path) -> Result<Option<Self>> {
        let mut contents = std::fs::read_to_string(path).map_err(|source| Error::SecretFile {
            path: path.to_path_buf(),
            source,
        })?;
        let len = contents.trim_end_matches(['\r', '\n']).len();
        contents.truncate(len);
        if contents.is_empty() {
            contents.zeroize();
            return Ok(None);
        }
        Ok(Some(Self::new(contents)))
    }
}

impl<T: Zeroize> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
