// Key Provider Port (Interface)
// Resolves key references into key material for the duration of one task

use crate::domain::{ArmoredKey, KeyRef, SecretKeyMaterial};
use crate::port::ProcessingError;
use async_trait::async_trait;

#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Load an armored public key
    ///
    /// # Errors
    /// - ProcessingError::MissingParameter if the reference resolves to nothing
    async fn public_key(&self, key: &KeyRef) -> Result<ArmoredKey, ProcessingError>;

    /// Load an armored secret key plus its passphrase, if any
    async fn secret_key(&self, key: &KeyRef) -> Result<SecretKeyMaterial, ProcessingError>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory keyring
    #[derive(Default)]
    pub struct InMemoryKeyProvider {
        public: Mutex<HashMap<KeyRef, ArmoredKey>>,
        secret: Mutex<HashMap<KeyRef, SecretKeyMaterial>>,
    }

    impl InMemoryKeyProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert_public(&self, key: KeyRef, armored: ArmoredKey) {
            self.public.lock().unwrap().insert(key, armored);
        }

        pub fn insert_secret(&self, key: KeyRef, material: SecretKeyMaterial) {
            self.secret.lock().unwrap().insert(key, material);
        }
    }

    #[async_trait]
    impl KeyProvider for InMemoryKeyProvider {
        async fn public_key(&self, key: &KeyRef) -> Result<ArmoredKey, ProcessingError> {
            self.public.lock().unwrap().get(key).cloned().ok_or_else(|| {
                ProcessingError::MissingParameter(format!("public key '{}' not found", key))
            })
        }

        async fn secret_key(&self, key: &KeyRef) -> Result<SecretKeyMaterial, ProcessingError> {
            self.secret.lock().unwrap().get(key).cloned().ok_or_else(|| {
                ProcessingError::MissingParameter(format!("private key '{}' not found", key))
            })
        }
    }
}
