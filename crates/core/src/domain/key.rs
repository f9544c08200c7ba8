// Key Material - transient, zeroized on drop, never logged

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Reference to key material held by a KeyProvider (safe to persist)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRef(String);

impl KeyRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// ASCII-armored OpenPGP key block
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ArmoredKey(String);

impl ArmoredKey {
    pub fn new(armored: impl Into<String>) -> Self {
        Self(armored.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ArmoredKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArmoredKey([REDACTED])")
    }
}

/// Passphrase unlocking a secret key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Passphrase([REDACTED])")
    }
}

/// Armored secret key plus optional passphrase
#[derive(Clone, Debug, Zeroize, ZeroizeOnDrop)]
pub struct SecretKeyMaterial {
    pub armored: ArmoredKey,
    pub passphrase: Option<Passphrase>,
}

impl SecretKeyMaterial {
    pub fn new(armored: ArmoredKey, passphrase: Option<Passphrase>) -> Self {
        Self {
            armored,
            passphrase,
        }
    }

    pub fn unprotected(armored: impl Into<String>) -> Self {
        Self::new(ArmoredKey::new(armored), None)
    }
}
