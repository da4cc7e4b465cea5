//! Credential storage for the OAuth access token
//!
//! Manages a single JSON record (`{oauth_token, oauth_token_secret, ...}`).
//! Writes use atomic temp-file + rename so a crash never leaves a truncated
//! record behind, and a tokio Mutex serializes concurrent writers.
//!
//! "No record" is a normal outcome of `load`, not an error: it is the signal
//! that the authorization flow has to run.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::token::AccessToken;

/// Default file name, relative to the working directory
pub const DEFAULT_CREDENTIALS_FILE: &str = "twitter_tokens.json";

/// File-backed store for one access token.
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store for `path`. No I/O happens until `load` or `save`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Read the stored access token.
    ///
    /// Returns `Ok(None)` when the file is absent, blank, or holds a record
    /// without both token and secret. Unparseable JSON is an error so a
    /// corrupted file is never silently overwritten by a new handshake.
    pub async fn load(&self) -> Result<Option<AccessToken>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "credential file not found");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(format!("reading credential file: {e}"))),
        };

        if contents.trim().is_empty() {
            info!(path = %self.path.display(), "credential file is empty");
            return Ok(None);
        }

        let token: AccessToken = serde_json::from_str(&contents)
            .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;

        if !token.is_complete() {
            warn!(path = %self.path.display(), "credential record is incomplete, ignoring it");
            return Ok(None);
        }

        debug!(path = %self.path.display(), screen_name = ?token.screen_name, "loaded credentials");
        Ok(Some(token))
    }

    /// Persist `token`, replacing any previous record.
    ///
    /// File permissions are set to 0600 (owner read/write only).
    pub async fn save(&self, token: &AccessToken) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_atomic(&self.path, token).await?;
        info!(path = %self.path.display(), "credentials stored");
        Ok(())
    }

    /// Modification time of the record, `None` when it does not exist.
    pub async fn modified(&self) -> Option<SystemTime> {
        tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .ok()
    }
}

/// Write the token to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target.
async fn write_atomic(path: &Path, token: &AccessToken) -> Result<()> {
    let json = serde_json::to_string_pretty(token)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp_path = dir.join(format!(".twitter_tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
