//! Session persistence between runs
//!
//! Stores the access/refresh pair as a small JSON file so a CLI invocation can
//! pick up the session left by the previous one. Writes go through a temp file
//! and a rename so a crash never leaves half a token pair on disk.
//!
//! The file is a cache of the in-memory session, never the other way round:
//! callers log and move on when a write fails.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// On-disk shape of a session.
///
/// Absent tokens are written as `null` so a signed-out session is still a
/// valid file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// JSON file holding the last known session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted session.
    ///
    /// A missing file is a signed-out session, not an error.
    pub async fn load(&self) -> Result<PersistedSession> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "session file not found, starting signed out");
            return Ok(PersistedSession::default());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
        let persisted: PersistedSession = serde_json::from_str(&contents)
            .map_err(|e| Error::SessionParse(format!("parsing session file: {e}")))?;
        debug!(
            path = %self.path.display(),
            signed_in = persisted.refresh_token.is_some(),
            "loaded session"
        );
        Ok(persisted)
    }

    /// Replace the persisted session.
    pub async fn save(&self, session: &PersistedSession) -> Result<()> {
        write_atomic(&self.path, session).await
    }
}

/// Write the session atomically with 0600 permissions (unix only).
async fn write_atomic(path: &Path, session: &PersistedSession) -> Result<()> {
    let json = serde_json::to_string_pretty(session)
        .map_err(|e| Error::SessionParse(format!("serializing session: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Io(format!("creating session directory: {e}")))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}
