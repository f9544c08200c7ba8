// Decryption processor

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{ensure_category, required_path, Processor};
use crate::domain::{JobPayload, OperationCategory};
use crate::port::{CryptoEngine, DecryptRequest, KeyProvider, ProcessingError, TransformReport};

pub struct DecryptionProcessor {
    engine: Arc<dyn CryptoEngine>,
    keys: Arc<dyn KeyProvider>,
}

impl DecryptionProcessor {
    pub fn new(engine: Arc<dyn CryptoEngine>, keys: Arc<dyn KeyProvider>) -> Self {
        Self { engine, keys }
    }
}

#[async_trait]
impl Processor for DecryptionProcessor {
    fn category(&self) -> OperationCategory {
        OperationCategory::Decrypt
    }

    async fn process(&self, payload: &JobPayload) -> Result<TransformReport, ProcessingError> {
        ensure_category(payload, OperationCategory::Decrypt)?;
        let source_path = required_path(&payload.source_path, "sourcePath")?;
        let output_path = required_path(&payload.output_path, "outputPath")?;
        let private_ref = payload
            .private_key
            .as_ref()
            .ok_or_else(|| ProcessingError::missing("privateKey"))?;
        let secret_key = self.keys.secret_key(private_ref).await?;

        debug!(job_id = %payload.job_id, scheme = %payload.scheme, "Decrypting");
        self.engine
            .decrypt(DecryptRequest {
                scheme: payload.scheme.clone(),
                source_path: Some(source_path),
                output_path: Some(output_path),
                secret_key: Some(secret_key),
            })
            .await
    }
}
