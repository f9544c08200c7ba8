// Encryption processor

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{ensure_category, required_path, Processor};
use crate::domain::{JobPayload, OperationCategory};
use crate::port::{CryptoEngine, EncryptRequest, KeyProvider, ProcessingError, TransformReport};

pub struct EncryptionProcessor {
    engine: Arc<dyn CryptoEngine>,
    keys: Arc<dyn KeyProvider>,
}

impl EncryptionProcessor {
    pub fn new(engine: Arc<dyn CryptoEngine>, keys: Arc<dyn KeyProvider>) -> Self {
        Self { engine, keys }
    }
}

#[async_trait]
impl Processor for EncryptionProcessor {
    fn category(&self) -> OperationCategory {
        OperationCategory::Encrypt
    }

    async fn process(&self, payload: &JobPayload) -> Result<TransformReport, ProcessingError> {
        ensure_category(payload, OperationCategory::Encrypt)?;
        let source_path = required_path(&payload.source_path, "sourcePath")?;
        let output_path = required_path(&payload.output_path, "outputPath")?;
        let public_ref = payload
            .public_key
            .as_ref()
            .ok_or_else(|| ProcessingError::missing("publicKey"))?;

        let signing_key = if payload.sign_with_encryption {
            let private_ref = payload
                .private_key
                .as_ref()
                .ok_or_else(|| ProcessingError::missing("privateKey"))?;
            Some(self.keys.secret_key(private_ref).await?)
        } else {
            None
        };
        let public_key = self.keys.public_key(public_ref).await?;

        debug!(job_id = %payload.job_id, scheme = %payload.scheme, signed = payload.sign_with_encryption, "Encrypting");
        self.engine
            .encrypt(EncryptRequest {
                scheme: payload.scheme.clone(),
                source_path: Some(source_path),
                output_path: Some(output_path),
                public_key: Some(public_key),
                sign_with_encryption: payload.sign_with_encryption,
                signing_key,
            })
            .await
    }
}
