//! Submit → queue → worker → engine → inventory, over SQLite and real files

mod common;

use common::{artifact, patterned, Harness};
use cryptq_core::application::CreateJobRequest;
use cryptq_core::domain::{JobState, OperationCategory};

const TEN_MB: usize = 10 * 1024 * 1024;

async fn encrypt_then_decrypt(scheme: &str) {
    let h = Harness::new().await;
    let data = patterned(TEN_MB);
    let source = h.write_file("big.bin", &data);

    let job = h
        .submit(
            OperationCategory::Encrypt,
            scheme,
            CreateJobRequest::new("alice", &source).with_output(h.path("big")),
        )
        .await
        .unwrap();
    assert_eq!(job.state, JobState::Queued);

    let completions = h.drain(OperationCategory::Encrypt).await;
    assert_eq!(completions.len(), 1);
    let report = completions[0].result.as_ref().unwrap();
    assert_eq!(report.bytes_read, TEN_MB as u64);

    let job = h.service.get_job(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::Succeeded);
    assert!(job.started_at.is_some() && job.finished_at.is_some());
    assert!(job.error_detail.is_none());
    let sealed = artifact(&job);
    assert_eq!(sealed, report.output_path);
    assert!(sealed.display().to_string().ends_with("big.enc"));
    let ciphertext = std::fs::read(&sealed).unwrap();
    assert!(!ciphertext.is_empty());
    assert_ne!(ciphertext, data);
    assert_eq!(report.bytes_written, ciphertext.len() as u64);

    let job = h
        .submit(
            OperationCategory::Decrypt,
            scheme,
            CreateJobRequest::new("alice", sealed.display().to_string())
                .with_output(h.path("big.out")),
        )
        .await
        .unwrap();
    let completions = h.drain(OperationCategory::Decrypt).await;
    assert!(completions[0].is_success());

    let job = h.service.get_job(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::Succeeded);
    assert_eq!(std::fs::read(artifact(&job)).unwrap(), data);
}

#[tokio::test]
async fn test_pgp_ten_megabytes_round_trip() {
    encrypt_then_decrypt("PGP").await;
}

#[tokio::test]
async fn test_hybrid_ten_megabytes_round_trip() {
    encrypt_then_decrypt("HYBRID").await;
}

#[tokio::test]
async fn test_signed_hybrid_round_trip() {
    let h = Harness::new().await;
    let data = patterned(100_000);
    let source = h.write_file("signed.bin", &data);

    h.submit(
        OperationCategory::Encrypt,
        "hybrid",
        CreateJobRequest::new("alice", &source)
            .with_output(h.path("signed"))
            .signed(),
    )
    .await
    .unwrap();
    assert!(h.drain(OperationCategory::Encrypt).await[0].is_success());

    let job = h
        .submit(
            OperationCategory::Decrypt,
            "HYBRID",
            CreateJobRequest::new("alice", h.path("signed.enc")).with_output(h.path("signed.out")),
        )
        .await
        .unwrap();
    assert!(h.drain(OperationCategory::Decrypt).await[0].is_success());
    assert_eq!(std::fs::read(artifact(&job)).unwrap(), data);
}

#[tokio::test]
async fn test_corrupted_hybrid_records_decryption_failed() {
    let h = Harness::new().await;
    let source = h.write_file("doc.bin", &patterned(300_000));
    h.submit(
        OperationCategory::Encrypt,
        "HYBRID",
        CreateJobRequest::new("alice", &source).with_output(h.path("doc")),
    )
    .await
    .unwrap();
    h.drain(OperationCategory::Encrypt).await;

    let sealed = h.path("doc.enc");
    let mut bytes = std::fs::read(&sealed).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x5A;
    std::fs::write(&sealed, &bytes).unwrap();

    let output = h.path("doc.out");
    let job = h
        .submit(
            OperationCategory::Decrypt,
            "HYBRID",
            CreateJobRequest::new("alice", &sealed).with_output(&output),
        )
        .await
        .unwrap();
    let completions = h.drain(OperationCategory::Decrypt).await;
    assert_eq!(completions.len(), 1);
    assert_eq!(
        completions[0].result.as_ref().unwrap_err().kind(),
        "DecryptionFailed"
    );

    let job = h.service.get_job(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(job
        .error_detail
        .as_deref()
        .unwrap()
        .starts_with("DecryptionFailed: "));
    assert!(!std::path::Path::new(&output).exists());
    assert!(!std::path::Path::new(&format!("{}.part", output)).exists());
}

#[tokio::test]
async fn test_wrong_recipient_cannot_decrypt() {
    let h = Harness::new().await;
    let source = h.write_file("secret.txt", b"only mallory could read this");

    // eve's public key is mallory's, her private key is alice's
    h.submit(
        OperationCategory::Encrypt,
        "PGP",
        CreateJobRequest::new("eve", &source).with_output(h.path("secret")),
    )
    .await
    .unwrap();
    assert!(h.drain(OperationCategory::Encrypt).await[0].is_success());

    let job = h
        .submit(
            OperationCategory::Decrypt,
            "PGP",
            CreateJobRequest::new("eve", h.path("secret.enc")).with_output(h.path("secret.out")),
        )
        .await
        .unwrap();
    h.drain(OperationCategory::Decrypt).await;

    let job = h.service.get_job(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(job
        .error_detail
        .unwrap()
        .starts_with("DecryptionFailed: "));
}

#[tokio::test]
async fn test_compression_pipeline() {
    let h = Harness::new().await;
    let data = b"2026-10-17T00:00:00Z INFO request served in 3ms\n".repeat(20_000);
    let source = h.write_file("access.log", &data);

    for scheme in ["ZSTD", "GZIP"] {
        let packed = h.path(&format!("access.log.{}", scheme.to_lowercase()));
        h.submit(
            OperationCategory::Compress,
            scheme,
            CreateJobRequest::new("alice", &source).with_output(&packed),
        )
        .await
        .unwrap();
        let completions = h.drain(OperationCategory::Compress).await;
        let report = completions[0].result.as_ref().unwrap();
        assert!(report.bytes_written < report.bytes_read / 10);

        // decompression accepts any scheme label and sniffs the codec
        let job = h
            .submit(
                OperationCategory::Decompress,
                "whatever",
                CreateJobRequest::new("alice", &packed).with_output(format!("{}.out", packed)),
            )
            .await
            .unwrap();
        assert!(h.drain(OperationCategory::Decompress).await[0].is_success());
        assert_eq!(std::fs::read(artifact(&job)).unwrap(), data);
    }
}

#[tokio::test]
async fn test_missing_source_fails_with_stream_io() {
    let h = Harness::new().await;
    let job = h
        .submit(
            OperationCategory::Compress,
            "ZSTD",
            CreateJobRequest::new("alice", h.path("vanished.bin")).with_output(h.path("v.zst")),
        )
        .await
        .unwrap();
    h.drain(OperationCategory::Compress).await;

    let job = h.service.get_job(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(job.error_detail.unwrap().starts_with("StreamIO: "));
}
