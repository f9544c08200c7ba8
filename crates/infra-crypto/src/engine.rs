// Streaming Crypto Engine
// OpenPGP + hybrid AEAD + zstd/gzip over files, one blocking thread per transform

use async_trait::async_trait;
use cryptq_core::domain::{Scheme, ENCRYPTED_SUFFIX};
use cryptq_core::error::Result;
use cryptq_core::port::{
    CodecRequest, CryptoEngine, DecryptRequest, EncryptRequest, ProcessingError, TransformReport,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::codec::{self, Codec};
use crate::config::EngineConfig;
use crate::hybrid;
use crate::io::{open_source, write_atomically};
use crate::keys::{Recipient, UnlockedKey};
use crate::pgp_stream;

/// File-to-file engine. Each call owns its key material and drops it on return.
pub struct StreamingCryptoEngine {
    config: Arc<EngineConfig>,
}

impl StreamingCryptoEngine {
    /// # Errors
    /// - AppError::Config if the settings are out of range
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn required<T>(value: Option<T>, name: &str) -> std::result::Result<T, ProcessingError> {
    value.ok_or_else(|| ProcessingError::missing(name))
}

fn unsupported(op: &str, scheme: &Scheme) -> ProcessingError {
    ProcessingError::Aborted(format!("unsupported scheme for {}: {}", op, scheme))
}

fn encrypted_path(output: &Path) -> PathBuf {
    let mut s = output.as_os_str().to_owned();
    s.push(ENCRYPTED_SUFFIX);
    PathBuf::from(s)
}

fn report(
    output_path: PathBuf,
    bytes_read: &AtomicU64,
    bytes_written: u64,
    started: Instant,
) -> TransformReport {
    TransformReport {
        output_path,
        bytes_read: bytes_read.load(Ordering::Relaxed),
        bytes_written,
        duration_ms: started.elapsed().as_millis() as i64,
    }
}

/// Run a transform on the blocking pool; a panic there becomes `Aborted`
async fn run_blocking<F>(op: &'static str, f: F) -> std::result::Result<TransformReport, ProcessingError>
where
    F: FnOnce() -> std::result::Result<TransformReport, ProcessingError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(f).await.map_err(|e| {
        if e.is_panic() {
            ProcessingError::Aborted(format!("{} panicked", op))
        } else {
            ProcessingError::Aborted(format!("{} cancelled", op))
        }
    })?;

    match &result {
        Ok(r) => info!(
            op,
            output = %r.output_path.display(),
            bytes_read = r.bytes_read,
            bytes_written = r.bytes_written,
            duration_ms = r.duration_ms,
            "Transform finished"
        ),
        Err(e) => debug!(op, kind = e.kind(), "Transform failed"),
    }
    result
}

#[async_trait]
impl CryptoEngine for StreamingCryptoEngine {
    async fn encrypt(
        &self,
        req: EncryptRequest,
    ) -> std::result::Result<TransformReport, ProcessingError> {
        let public_key = required(req.public_key, "publicKey")?;
        let source = required(req.source_path, "sourcePath")?;
        let output = required(req.output_path, "outputPath")?;
        let signing_key = if req.sign_with_encryption {
            Some(required(req.signing_key, "privateKey")?)
        } else {
            None
        };
        if !matches!(req.scheme, Scheme::Pgp | Scheme::Hybrid) {
            return Err(unsupported("encryption", &req.scheme));
        }

        let scheme = req.scheme;
        let config = Arc::clone(&self.config);
        run_blocking("encrypt", move || {
            let started = Instant::now();
            let recipient = Recipient::parse(&public_key)?;
            let signer = signing_key.as_ref().map(UnlockedKey::unlock).transpose()?;
            let (mut reader, bytes_read) = open_source(&source, config.buffer_size)?;
            let file_name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let final_path = encrypted_path(&output);
            let written = write_atomically(&final_path, |out| match scheme {
                Scheme::Pgp => {
                    pgp_stream::encrypt(&mut reader, &file_name, &recipient, signer.as_ref(), out)
                }
                _ => hybrid::encrypt(
                    &mut reader,
                    out,
                    &recipient,
                    signer.as_ref(),
                    config.hybrid_cipher,
                    config.chunk_size,
                )
                .map(|_| ()),
            })?;
            Ok(report(final_path, &bytes_read, written, started))
        })
        .await
    }

    async fn decrypt(
        &self,
        req: DecryptRequest,
    ) -> std::result::Result<TransformReport, ProcessingError> {
        let secret_key = required(req.secret_key, "privateKey")?;
        let source = required(req.source_path, "sourcePath")?;
        let output = required(req.output_path, "outputPath")?;
        if !matches!(req.scheme, Scheme::Pgp | Scheme::Hybrid) {
            return Err(unsupported("decryption", &req.scheme));
        }

        let scheme = req.scheme;
        let config = Arc::clone(&self.config);
        run_blocking("decrypt", move || {
            let started = Instant::now();
            let key = UnlockedKey::unlock(&secret_key)?;
            let (mut reader, bytes_read) = open_source(&source, config.buffer_size)?;

            let written = write_atomically(&output, |out| match scheme {
                Scheme::Pgp => {
                    pgp_stream::decrypt(reader, &key, out, config.buffer_size).map(|_| ())
                }
                _ => hybrid::decrypt(&mut reader, out, &key).map(|_| ()),
            })?;
            Ok(report(output, &bytes_read, written, started))
        })
        .await
    }

    async fn compress(
        &self,
        req: CodecRequest,
    ) -> std::result::Result<TransformReport, ProcessingError> {
        let source = required(req.source_path, "sourcePath")?;
        let output = required(req.output_path, "outputPath")?;
        let codec =
            Codec::for_scheme(&req.scheme).ok_or_else(|| unsupported("compression", &req.scheme))?;

        let config = Arc::clone(&self.config);
        run_blocking("compress", move || {
            let started = Instant::now();
            let (reader, bytes_read) = open_source(&source, config.buffer_size)?;
            let written = write_atomically(&output, |out| {
                codec::compress(
                    codec,
                    reader,
                    out,
                    config.zstd_level,
                    config.gzip_level,
                    config.buffer_size,
                )
                .map(|_| ())
            })?;
            Ok(report(output, &bytes_read, written, started))
        })
        .await
    }

    /// Codec comes from the stream's magic bytes; the scheme is informational
    async fn decompress(
        &self,
        req: CodecRequest,
    ) -> std::result::Result<TransformReport, ProcessingError> {
        let source = required(req.source_path, "sourcePath")?;
        let output = required(req.output_path, "outputPath")?;

        let config = Arc::clone(&self.config);
        run_blocking("decompress", move || {
            let started = Instant::now();
            let (reader, bytes_read) = open_source(&source, config.buffer_size)?;
            let written = write_atomically(&output, |out| {
                codec::decompress(reader, out, config.buffer_size).map(|_| ())
            })?;
            Ok(report(output, &bytes_read, written, started))
        })
        .await
    }
}
