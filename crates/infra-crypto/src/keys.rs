// OpenPGP key parsing and unlocking

use cryptq_core::domain::{ArmoredKey, SecretKeyMaterial};
use cryptq_core::port::ProcessingError;
use pgp::composed::{Deserializable, SignedPublicKey, SignedPublicSubKey, SignedSecretKey};
use pgp::crypto::hash::HashAlgorithm;
use pgp::types::{Password, SecretKeyTrait};

/// Parsed recipient certificate
pub(crate) struct Recipient {
    key: SignedPublicKey,
}

impl Recipient {
    pub fn parse(armored: &ArmoredKey) -> Result<Self, ProcessingError> {
        let (key, _headers) = SignedPublicKey::from_string(armored.expose())
            .map_err(|e| ProcessingError::InvalidKey(format!("unreadable public key: {}", e)))?;
        if key.public_subkeys.is_empty() {
            return Err(ProcessingError::InvalidKey(
                "public key has no encryption subkey".to_string(),
            ));
        }
        Ok(Self { key })
    }

    /// First subkey flagged for encryption, else the first subkey
    pub fn encryption_subkey(&self) -> &SignedPublicSubKey {
        let subkeys = &self.key.public_subkeys;
        subkeys
            .iter()
            .find(|sk| {
                sk.signatures.iter().any(|sig| {
                    let flags = sig.key_flags();
                    flags.encrypt_comms() || flags.encrypt_storage()
                })
            })
            .unwrap_or(&subkeys[0])
    }
}

/// Secret key plus the passphrase proven to unlock it
pub(crate) struct UnlockedKey {
    pub key: SignedSecretKey,
    pub password: Password,
}

impl UnlockedKey {
    /// Parse and check that the passphrase (if any) unlocks the key
    pub fn unlock(material: &SecretKeyMaterial) -> Result<Self, ProcessingError> {
        let (key, _headers) = SignedSecretKey::from_string(material.armored.expose())
            .map_err(|e| ProcessingError::InvalidKey(format!("unreadable secret key: {}", e)))?;

        let password = match &material.passphrase {
            Some(p) => Password::from(p.expose()),
            None => Password::empty(),
        };

        // a throwaway signature over a dummy digest only succeeds with the right passphrase
        key.primary_key
            .create_signature(&password, HashAlgorithm::Sha256, &[0u8; 32])
            .map_err(|_| {
                ProcessingError::InvalidKey(
                    "secret key is locked: passphrase missing or wrong".to_string(),
                )
            })?;

        Ok(Self { key, password })
    }
}
