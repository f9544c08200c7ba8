// File-system keyring
// <dir>/<ref>.asc holds the armored key, <dir>/<ref>.pass an optional passphrase

use async_trait::async_trait;
use cryptq_core::domain::{ArmoredKey, KeyRef, Passphrase, SecretKeyMaterial};
use cryptq_core::port::{KeyProvider, ProcessingError};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

const KEY_EXTENSION: &str = "asc";
const PASSPHRASE_EXTENSION: &str = "pass";

/// Reads key material from disk on every call; nothing is cached
#[derive(Debug, Clone)]
pub struct FsKeyring {
    dir: PathBuf,
}

impl FsKeyring {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &KeyRef, extension: &str) -> Result<PathBuf, ProcessingError> {
        let name = key.as_str();
        let valid = !name.is_empty()
            && !name.contains(['/', '\\', '\0'])
            && !name.starts_with('.')
            && name != "..";
        if !valid {
            return Err(ProcessingError::InvalidKey(format!(
                "invalid key reference '{}'",
                name
            )));
        }
        Ok(self.dir.join(format!("{}.{}", name, extension)))
    }

    async fn read_armored(&self, key: &KeyRef, what: &str) -> Result<ArmoredKey, ProcessingError> {
        let path = self.path_for(key, KEY_EXTENSION)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(ArmoredKey::new(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(
                ProcessingError::MissingParameter(format!("{} '{}' not found", what, key)),
            ),
            Err(e) => Err(ProcessingError::StreamIo(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl KeyProvider for FsKeyring {
    async fn public_key(&self, key: &KeyRef) -> Result<ArmoredKey, ProcessingError> {
        debug!(key_ref = %key, "Loading public key");
        self.read_armored(key, "public key").await
    }

    async fn secret_key(&self, key: &KeyRef) -> Result<SecretKeyMaterial, ProcessingError> {
        debug!(key_ref = %key, "Loading secret key");
        let armored = self.read_armored(key, "private key").await?;

        let pass_path = self.path_for(key, PASSPHRASE_EXTENSION)?;
        let passphrase = match tokio::fs::read_to_string(&pass_path).await {
            Ok(text) => {
                let text = Zeroizing::new(text);
                Some(Passphrase::new(text.trim_end_matches(['\r', '\n'])))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ProcessingError::StreamIo(format!(
                    "cannot read {}: {}",
                    pass_path.display(),
                    e
                )))
            }
        };
        Ok(SecretKeyMaterial::new(armored, passphrase))
    }
}
