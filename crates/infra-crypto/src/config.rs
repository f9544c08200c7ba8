// Engine configuration

use cryptq_core::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Copy buffer used by every transform (64 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Plaintext bytes per hybrid AEAD chunk (64 KiB)
pub const DEFAULT_CHUNK_SIZE: u32 = 64 * 1024;

pub const MIN_CHUNK_SIZE: u32 = 1024;
pub const MAX_CHUNK_SIZE: u32 = 16 * 1024 * 1024;

pub const DEFAULT_ZSTD_LEVEL: i32 = 3;
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// AEAD used for the HYBRID payload stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HybridCipher {
    #[default]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl HybridCipher {
    /// Identifier stored in the container header
    pub fn id(&self) -> u8 {
        match self {
            HybridCipher::Aes256Gcm => 1,
            HybridCipher::ChaCha20Poly1305 => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(HybridCipher::Aes256Gcm),
            2 => Some(HybridCipher::ChaCha20Poly1305),
            _ => None,
        }
    }
}

impl std::str::FromStr for HybridCipher {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" | "aes" => Ok(HybridCipher::Aes256Gcm),
            "chacha20-poly1305" | "chacha20poly1305" | "chacha" => {
                Ok(HybridCipher::ChaCha20Poly1305)
            }
            other => Err(AppError::Config(format!("unknown hybrid cipher: {}", other))),
        }
    }
}

/// Settings handed to `StreamingCryptoEngine::new`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub buffer_size: usize,
    pub chunk_size: u32,
    pub zstd_level: i32,
    pub gzip_level: u32,
    pub hybrid_cipher: HybridCipher,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            zstd_level: DEFAULT_ZSTD_LEVEL,
            gzip_level: DEFAULT_GZIP_LEVEL,
            hybrid_cipher: HybridCipher::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(AppError::Config("buffer_size must be > 0".to_string()));
        }
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(AppError::Config(format!(
                "chunk_size must be within {}..={}",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            )));
        }
        if !(1..=22).contains(&self.zstd_level) {
            return Err(AppError::Config("zstd_level must be within 1..=22".to_string()));
        }
        if self.gzip_level > 9 {
            return Err(AppError::Config("gzip_level must be within 0..=9".to_string()));
        }
        Ok(())
    }
}
