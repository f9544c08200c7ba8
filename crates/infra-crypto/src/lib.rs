// cryptq Infrastructure - Crypto Adapters
// Implements: CryptoEngine, KeyProvider, OwnerResolver

mod codec;
pub mod config;
mod engine;
mod hybrid;
mod io;
mod keyring;
mod keys;
mod owners;
mod pgp_stream;

pub use config::{EngineConfig, HybridCipher};
pub use engine::StreamingCryptoEngine;
pub use keyring::FsKeyring;
pub use owners::StaticOwnerResolver;
