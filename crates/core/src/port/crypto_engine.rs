// Crypto Engine Port
// Abstraction over the streaming transforms (implemented in cryptq-infra-crypto)

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{ArmoredKey, Scheme, SecretKeyMaterial};

/// Engine / worker level errors.
///
/// Recorded into `Job::error_detail` as `"<Kind>: <message>"`; never re-raised
/// to callers other than the completion listener of the task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("stream I/O failed: {0}")]
    StreamIo(String),

    #[error("processing aborted: {0}")]
    Aborted(String),
}

impl ProcessingError {
    /// Stable kind name
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::MissingParameter(_) => "MissingParameter",
            ProcessingError::InvalidKey(_) => "InvalidKey",
            ProcessingError::DecryptionFailed(_) => "DecryptionFailed",
            ProcessingError::StreamIo(_) => "StreamIO",
            ProcessingError::Aborted(_) => "Aborted",
        }
    }

    /// Human-readable detail persisted on the job
    pub fn detail(&self) -> String {
        let message = match self {
            ProcessingError::MissingParameter(m)
            | ProcessingError::InvalidKey(m)
            | ProcessingError::DecryptionFailed(m)
            | ProcessingError::StreamIo(m)
            | ProcessingError::Aborted(m) => m,
        };
        format!("{}: {}", self.kind(), message)
    }

    pub fn missing(name: &str) -> Self {
        ProcessingError::MissingParameter(format!("'{}' is required", name))
    }
}

impl From<std::io::Error> for ProcessingError {
    fn from(err: std::io::Error) -> Self {
        ProcessingError::StreamIo(err.to_string())
    }
}

/// Encryption request. Optional fields are validated by the engine.
#[derive(Debug, Clone)]
pub struct EncryptRequest {
    pub scheme: Scheme,
    pub source_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub public_key: Option<ArmoredKey>,
    pub sign_with_encryption: bool,
    pub signing_key: Option<SecretKeyMaterial>,
}

/// Decryption request (PGP and HYBRID share the shape)
#[derive(Debug, Clone)]
pub struct DecryptRequest {
    pub scheme: Scheme,
    pub source_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub secret_key: Option<SecretKeyMaterial>,
}

/// Compression / decompression request
#[derive(Debug, Clone)]
pub struct CodecRequest {
    pub scheme: Scheme,
    pub source_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
}

/// What a successful transform produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReport {
    pub output_path: PathBuf,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub duration_ms: i64,
}

/// Crypto Engine trait
///
/// Implementations:
/// - StreamingCryptoEngine: rPGP + STREAM AEAD + zstd/gzip over files
/// - MockCryptoEngine: scripted outcomes for worker tests
#[async_trait]
pub trait CryptoEngine: Send + Sync {
    /// Encrypt `source_path` to `<output_path>.enc`
    ///
    /// # Errors
    /// - MissingParameter if public key, source or output path is absent
    /// - InvalidKey if the armored key cannot be parsed
    /// - StreamIo on read/write failure
    async fn encrypt(&self, req: EncryptRequest) -> Result<TransformReport, ProcessingError>;

    /// Decrypt `source_path` to `output_path`
    ///
    /// # Errors
    /// - DecryptionFailed on wrong key or corrupted ciphertext
    async fn decrypt(&self, req: DecryptRequest) -> Result<TransformReport, ProcessingError>;

    async fn compress(&self, req: CodecRequest) -> Result<TransformReport, ProcessingError>;

    async fn decompress(&self, req: CodecRequest) -> Result<TransformReport, ProcessingError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock engine behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with the given error
        Fail(ProcessingError),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock Crypto Engine for testing
    pub struct MockCryptoEngine {
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockCryptoEngine {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }
        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }
        pub fn new_fail(error: ProcessingError) -> Self {
            Self::new(MockBehavior::Fail(error))
        }
        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }
        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        fn run(&self, output: Option<PathBuf>) -> Result<TransformReport, ProcessingError> {
            *self.call_count.lock().unwrap() += 1;
            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockBehavior::Success => Ok(TransformReport {
                    output_path: output.unwrap_or_default(),
                    bytes_read: 0,
                    bytes_written: 0,
                    duration_ms: 1,
                }),
                MockBehavior::Fail(err) => Err(err),
                MockBehavior::Panic(msg) => panic!("{}", msg),
            }
        }
    }

    #[async_trait]
    impl CryptoEngine for MockCryptoEngine {
        async fn encrypt(&self, req: EncryptRequest) -> Result<TransformReport, ProcessingError> {
            self.run(req.output_path)
        }
        async fn decrypt(&self, req: DecryptRequest) -> Result<TransformReport, ProcessingError> {
            self.run(req.output_path)
        }
        async fn compress(&self, req: CodecRequest) -> Result<TransformReport, ProcessingError> {
            self.run(req.output_path)
        }
        async fn decompress(&self, req: CodecRequest) -> Result<TransformReport, ProcessingError> {
            self.run(req.output_path)
        }
    }
}
