//! Factory selection, validation and compensation against SQLite

mod common;

use common::Harness;
use cryptq_core::application::{CreateJobRequest, RecoveryService};
use cryptq_core::domain::{DomainError, JobState, OperationCategory};
use cryptq_core::error::AppError;
use cryptq_core::port::time_provider::SystemTimeProvider;
use std::sync::Arc;

#[tokio::test]
async fn test_unsupported_scheme_creates_nothing() {
    let h = Harness::new().await;
    let source = h.write_file("a.txt", b"a");

    for (category, scheme) in [
        (OperationCategory::Encrypt, "ROT13"),
        (OperationCategory::Decrypt, "ZSTD"),
        (OperationCategory::Compress, "PGP"),
    ] {
        let err = h
            .submit(category, scheme, CreateJobRequest::new("alice", &source))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Domain(DomainError::UnsupportedScheme { .. })),
            "{} {} gave {:?}",
            category,
            scheme,
            err
        );
    }
    assert_eq!(h.count_rows("jobs").await, 0);
    assert_eq!(h.count_rows("queue_tasks").await, 0);
}

#[tokio::test]
async fn test_unknown_owner_creates_nothing() {
    let h = Harness::new().await;
    let err = h
        .submit(
            OperationCategory::Encrypt,
            "PGP",
            CreateJobRequest::new("trudy", h.path("a.txt")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(h.count_rows("jobs").await, 0);
}

#[tokio::test]
async fn test_invalid_request_creates_nothing() {
    let h = Harness::new().await;
    let err = h
        .submit(OperationCategory::Compress, "GZIP", CreateJobRequest::new("alice", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(h.count_rows("jobs").await, 0);
}

#[tokio::test]
async fn test_output_path_is_derived_from_source() {
    let h = Harness::new().await;
    let source = h.write_file("invoice.pdf", b"%PDF");
    let job = h
        .submit(OperationCategory::Compress, "ZSTD", CreateJobRequest::new("alice", &source))
        .await
        .unwrap();

    let derived = std::path::Path::new(&job.output_path);
    assert_eq!(derived.parent(), Some(h.dir.path()));
    let name = derived.file_name().unwrap().to_string_lossy().into_owned();
    // <YYYYMMDD-HHMMSS>-invoice.pdf
    assert_eq!(name.len(), "20261017-000000-invoice.pdf".len());
    assert!(name.ends_with("-invoice.pdf"));
    assert_eq!(&name[8..9], "-");
}

#[tokio::test]
async fn test_failed_enqueue_compensates_job() {
    let h = Harness::new().await;
    sqlx::query("DROP TABLE queue_tasks")
        .execute(&h.pool)
        .await
        .unwrap();

    let err = h
        .submit(
            OperationCategory::Compress,
            "ZSTD",
            CreateJobRequest::new("alice", h.path("x.bin")),
        )
        .await
        .unwrap_err();
    let job_id = match err {
        AppError::SubmissionFailed { job_id, .. } => job_id,
        other => panic!("expected SubmissionFailed, got {:?}", other),
    };

    let job = h.service.get_job(&job_id).await.unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(job
        .error_detail
        .unwrap()
        .starts_with("SubmissionFailed: "));
}

#[tokio::test]
async fn test_recovery_fails_abandoned_running_job() {
    let h = Harness::new().await;
    let job = h
        .submit(
            OperationCategory::Compress,
            "GZIP",
            CreateJobRequest::new("alice", h.path("y.bin")),
        )
        .await
        .unwrap();

    // a worker claimed the job and then died
    let task = h.queues.try_dequeue(&job.queue).await.unwrap().unwrap();
    h.jobs
        .update_status(&job.id, JobState::Running, None)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let recovery = RecoveryService::new(
        h.jobs.clone(),
        h.queues.clone(),
        Arc::new(SystemTimeProvider),
        Some(10),
    );
    assert_eq!(recovery.recover_orphaned_jobs().await.unwrap(), 1);

    let job = h.service.get_job(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.error_detail.as_deref(), Some("Aborted: worker crashed"));
    assert_eq!(task.payload.job_id, job.id);
}
