// Worker Processors - one per operation category

mod codec;
mod decryption;
mod encryption;

pub use codec::{CompressionProcessor, DecompressionProcessor};
pub use decryption::DecryptionProcessor;
pub use encryption::EncryptionProcessor;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{JobPayload, OperationCategory};
use crate::port::{CryptoEngine, KeyProvider, ProcessingError, TransformReport};

/// Executes one payload of a single category.
///
/// Key material is fetched per call and dropped (zeroized) when the call returns.
#[async_trait]
pub trait Processor: Send + Sync {
    fn category(&self) -> OperationCategory;

    async fn process(&self, payload: &JobPayload) -> Result<TransformReport, ProcessingError>;
}

/// Processor for `category`, sharing one engine and keyring
pub fn processor_for(
    category: OperationCategory,
    engine: Arc<dyn CryptoEngine>,
    keys: Arc<dyn KeyProvider>,
) -> Arc<dyn Processor> {
    match category {
        OperationCategory::Encrypt => Arc::new(EncryptionProcessor::new(engine, keys)),
        OperationCategory::Decrypt => Arc::new(DecryptionProcessor::new(engine, keys)),
        OperationCategory::Compress => Arc::new(CompressionProcessor::new(engine)),
        OperationCategory::Decompress => Arc::new(DecompressionProcessor::new(engine)),
    }
}

/// Reject payloads routed to the wrong processor
fn ensure_category(
    payload: &JobPayload,
    expected: OperationCategory,
) -> Result<(), ProcessingError> {
    if payload.category != expected {
        return Err(ProcessingError::Aborted(format!(
            "{} payload delivered to {} processor",
            payload.category, expected
        )));
    }
    Ok(())
}

fn required_path(value: &Option<String>, name: &str) -> Result<PathBuf, ProcessingError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v)),
        _ => Err(ProcessingError::missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Job, Scheme};
    use crate::port::crypto_engine::mocks::MockCryptoEngine;
    use crate::port::key_provider::mocks::InMemoryKeyProvider;

    #[test]
    fn test_processor_for_matches_category() {
        let engine: Arc<dyn CryptoEngine> = Arc::new(MockCryptoEngine::new_success());
        let keys: Arc<dyn KeyProvider> = Arc::new(InMemoryKeyProvider::new());
        for category in OperationCategory::ALL {
            let p = processor_for(category, Arc::clone(&engine), Arc::clone(&keys));
            assert_eq!(p.category(), category);
        }
    }

    #[test]
    fn test_required_path() {
        assert!(required_path(&Some("/a".to_string()), "sourcePath").is_ok());
        let err = required_path(&Some("  ".to_string()), "sourcePath").unwrap_err();
        assert_eq!(err.kind(), "MissingParameter");
        assert!(required_path(&None, "outputPath").is_err());
    }

    #[test]
    fn test_required_path_keeps_surrounding_spaces() {
        let path = required_path(&Some(" /data/in.bin ".to_string()), "sourcePath").unwrap();
        assert_eq!(path, PathBuf::from(" /data/in.bin "));
    }

    #[test]
    fn test_category_mismatch_is_rejected() {
        let job = Job::new_test(OperationCategory::Compress, Scheme::Zstd);
        let payload = JobPayload::for_job(&job, None, None);
        let err = ensure_category(&payload, OperationCategory::Decrypt).unwrap_err();
        assert_eq!(err.kind(), "Aborted");
    }
}
