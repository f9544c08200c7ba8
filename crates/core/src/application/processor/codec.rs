// Compression / decompression processors (no key material)

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{ensure_category, required_path, Processor};
use crate::domain::{JobPayload, OperationCategory};
use crate::port::{CodecRequest, CryptoEngine, ProcessingError, TransformReport};

fn codec_request(payload: &JobPayload) -> Result<CodecRequest, ProcessingError> {
    Ok(CodecRequest {
        scheme: payload.scheme.clone(),
        source_path: Some(required_path(&payload.source_path, "sourcePath")?),
        output_path: Some(required_path(&payload.output_path, "outputPath")?),
    })
}

pub struct CompressionProcessor {
    engine: Arc<dyn CryptoEngine>,
}

impl CompressionProcessor {
    pub fn new(engine: Arc<dyn CryptoEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Processor for CompressionProcessor {
    fn category(&self) -> OperationCategory {
        OperationCategory::Compress
    }

    async fn process(&self, payload: &JobPayload) -> Result<TransformReport, ProcessingError> {
        ensure_category(payload, OperationCategory::Compress)?;
        let req = codec_request(payload)?;
        debug!(job_id = %payload.job_id, scheme = %payload.scheme, "Compressing");
        self.engine.compress(req).await
    }
}

pub struct DecompressionProcessor {
    engine: Arc<dyn CryptoEngine>,
}

impl DecompressionProcessor {
    pub fn new(engine: Arc<dyn CryptoEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Processor for DecompressionProcessor {
    fn category(&self) -> OperationCategory {
        OperationCategory::Decompress
    }

    async fn process(&self, payload: &JobPayload) -> Result<TransformReport, ProcessingError> {
        ensure_category(payload, OperationCategory::Decompress)?;
        let req = codec_request(payload)?;
        debug!(job_id = %payload.job_id, "Decompressing");
        self.engine.decompress(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Job, Scheme};
    use crate::port::crypto_engine::mocks::MockCryptoEngine;

    #[tokio::test]
    async fn test_compress_missing_output() {
        let engine = Arc::new(MockCryptoEngine::new_success());
        let processor = CompressionProcessor::new(engine.clone());

        let job = Job::new_test(OperationCategory::Compress, Scheme::Gzip);
        let mut payload = JobPayload::for_job(&job, None, None);
        payload.output_path = None;

        let err = processor.process(&payload).await.unwrap_err();
        assert_eq!(err, ProcessingError::missing("outputPath"));
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_decompress_rejects_compress_payload() {
        let engine = Arc::new(MockCryptoEngine::new_success());
        let processor = DecompressionProcessor::new(engine.clone());

        let job = Job::new_test(OperationCategory::Compress, Scheme::Zstd);
        let payload = JobPayload::for_job(&job, None, None);
        assert!(processor.process(&payload).await.is_err());
        assert_eq!(engine.call_count(), 0);
    }
}
