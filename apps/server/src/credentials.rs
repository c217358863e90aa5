//! File-backed credential provider.

use std::path::{Component, Path, PathBuf};

use finlink_core::errors::{Error, Result};
use finlink_core::secrets::CredentialProvider;

/// Reads credentials from `<dir>/<name>`.
pub struct FileCredentialProvider {
    dir: PathBuf,
}

impl FileCredentialProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl CredentialProvider for FileCredentialProvider {
    fn get_credential(&self, name: &str) -> Result<Vec<u8>> {
        let mut components = Path::new(name).components();
        let is_plain_name =
            matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();
        if !is_plain_name {
            return Err(Error::Credential(format!(
                "Invalid credential name '{}'",
                name
            )));
        }

        let path = self.dir.join(name);
        let bytes = std::fs::read(&path).map_err(|e| {
            Error::Credential(format!(
                "Could not read credential '{}' from {}: {}",
                name,
                path.display(),
                e
            ))
        })?;
        if bytes.is_empty() {
            return Err(Error::Credential(format!("Credential '{}' is empty", name)));
        }
        tracing::debug!("Loaded credential '{}'", name);
        Ok(bytes)
    }
}
