use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::{Credential, CredentialSource};

/// Credential stored as a plain-text file named after its key.
///
/// The file holds nothing but the token. A missing, unreadable or blank
/// file means there is no credential.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(key),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the token to disk, replacing any previous one
    pub fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create credential directory")?;
        }
        std::fs::write(&self.path, token.trim()).context("Failed to write credential file")?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    /// Remove the stored token
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove credential file")?;
        }
        Ok(())
    }
}

impl CredentialSource for FileCredentialStore {
    fn credential(&self) -> Option<Credential> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Credential::new(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Failed to read credential file");
                None
            }
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .context("Failed to restrict credential file permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
