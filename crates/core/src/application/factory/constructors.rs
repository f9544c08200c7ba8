// Built-in job constructors

use async_trait::async_trait;

use super::request::CreateJobRequest;
use super::submit::{dispatch, draft};
use super::{FactoryContext, JobConstructor};
use crate::domain::{Job, OperationCategory, Scheme};
use crate::error::{AppError, Result};

/// A scheme-specific constructor only builds jobs of its own scheme
fn pinned(name: &str, own: Scheme, requested: Scheme) -> Result<Scheme> {
    if requested != own {
        return Err(AppError::Validation(format!(
            "{} cannot construct a {} job",
            name, requested
        )));
    }
    Ok(own)
}

async fn construct_encryption(
    ctx: &FactoryContext,
    scheme: Scheme,
    req: CreateJobRequest,
) -> Result<Job> {
    let draft = draft(ctx, OperationCategory::Encrypt, scheme, req).await?;
    let private_key = if draft.job.sign_with_encryption {
        Some(draft.require_private_key()?)
    } else {
        None
    };
    let payload = draft.payload(Some(draft.owner.public_key.clone()), private_key);
    dispatch(ctx, draft.job, payload).await
}

async fn construct_decryption(
    ctx: &FactoryContext,
    scheme: Scheme,
    req: CreateJobRequest,
) -> Result<Job> {
    let draft = draft(ctx, OperationCategory::Decrypt, scheme, req).await?;
    let private_key = draft.require_private_key()?;
    let payload = draft.payload(None, Some(private_key));
    dispatch(ctx, draft.job, payload).await
}

async fn construct_codec(
    ctx: &FactoryContext,
    category: OperationCategory,
    scheme: Scheme,
    req: CreateJobRequest,
) -> Result<Job> {
    let draft = draft(ctx, category, scheme, req).await?;
    let payload = draft.payload(None, None);
    dispatch(ctx, draft.job, payload).await
}

/// OpenPGP message encryption
pub struct PgpEncryptionJob;

#[async_trait]
impl JobConstructor for PgpEncryptionJob {
    fn name(&self) -> &'static str {
        "pgp-encryption"
    }
    fn category(&self) -> OperationCategory {
        OperationCategory::Encrypt
    }
    async fn construct(
        &self,
        ctx: &FactoryContext,
        scheme: Scheme,
        req: CreateJobRequest,
    ) -> Result<Job> {
        construct_encryption(ctx, pinned(self.name(), Scheme::Pgp, scheme)?, req).await
    }
}

/// PGP-wrapped session key + chunked AEAD stream
pub struct HybridEncryptionJob;

#[async_trait]
impl JobConstructor for HybridEncryptionJob {
    fn name(&self) -> &'static str {
        "hybrid-encryption"
    }
    fn category(&self) -> OperationCategory {
        OperationCategory::Encrypt
    }
    async fn construct(
        &self,
        ctx: &FactoryContext,
        scheme: Scheme,
        req: CreateJobRequest,
    ) -> Result<Job> {
        construct_encryption(ctx, pinned(self.name(), Scheme::Hybrid, scheme)?, req).await
    }
}

pub struct PgpDecryptionJob;

#[async_trait]
impl JobConstructor for PgpDecryptionJob {
    fn name(&self) -> &'static str {
        "pgp-decryption"
    }
    fn category(&self) -> OperationCategory {
        OperationCategory::Decrypt
    }
    async fn construct(
        &self,
        ctx: &FactoryContext,
        scheme: Scheme,
        req: CreateJobRequest,
    ) -> Result<Job> {
        construct_decryption(ctx, pinned(self.name(), Scheme::Pgp, scheme)?, req).await
    }
}

pub struct HybridDecryptionJob;

#[async_trait]
impl JobConstructor for HybridDecryptionJob {
    fn name(&self) -> &'static str {
        "hybrid-decryption"
    }
    fn category(&self) -> OperationCategory {
        OperationCategory::Decrypt
    }
    async fn construct(
        &self,
        ctx: &FactoryContext,
        scheme: Scheme,
        req: CreateJobRequest,
    ) -> Result<Job> {
        construct_decryption(ctx, pinned(self.name(), Scheme::Hybrid, scheme)?, req).await
    }
}

pub struct ZstdCompressionJob;

#[async_trait]
impl JobConstructor for ZstdCompressionJob {
    fn name(&self) -> &'static str {
        "zstd-compression"
    }
    fn category(&self) -> OperationCategory {
        OperationCategory::Compress
    }
    async fn construct(
        &self,
        ctx: &FactoryContext,
        scheme: Scheme,
        req: CreateJobRequest,
    ) -> Result<Job> {
        construct_codec(ctx, OperationCategory::Compress, pinned(self.name(), Scheme::Zstd, scheme)?, req).await
    }
}

pub struct GzipCompressionJob;

#[async_trait]
impl JobConstructor for GzipCompressionJob {
    fn name(&self) -> &'static str {
        "gzip-compression"
    }
    fn category(&self) -> OperationCategory {
        OperationCategory::Compress
    }
    async fn construct(
        &self,
        ctx: &FactoryContext,
        scheme: Scheme,
        req: CreateJobRequest,
    ) -> Result<Job> {
        construct_codec(ctx, OperationCategory::Compress, pinned(self.name(), Scheme::Gzip, scheme)?, req).await
    }
}

/// Codec-agnostic decompression (format sniffed at execution time)
pub struct DecompressionJob;

#[async_trait]
impl JobConstructor for DecompressionJob {
    fn name(&self) -> &'static str {
        "decompression"
    }
    fn category(&self) -> OperationCategory {
        OperationCategory::Decompress
    }
    async fn construct(
        &self,
        ctx: &FactoryContext,
        scheme: Scheme,
        req: CreateJobRequest,
    ) -> Result<Job> {
        construct_codec(ctx, OperationCategory::Decompress, scheme, req).await
    }
}
