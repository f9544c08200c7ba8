// Shared submission path: validate -> resolve owner -> persist -> enqueue (with compensation)

use std::path::Path;
use tracing::{error, info, warn};

use super::output_path::prefix_with_timestamp;
use super::request::{validate_request, CreateJobRequest};
use super::FactoryContext;
use crate::domain::{Job, JobPayload, JobState, KeyRef, OperationCategory, Scheme};
use crate::error::{AppError, Result};
use crate::port::OwnerIdentity;

/// A validated job that has not been written anywhere yet
pub(crate) struct Draft {
    pub job: Job,
    pub owner: OwnerIdentity,
}

impl Draft {
    /// Private key reference, required by decryption and by signed encryption
    pub fn require_private_key(&self) -> Result<KeyRef> {
        self.owner.private_key.clone().ok_or_else(|| {
            AppError::Validation(format!(
                "owner {} has no private key on record",
                self.owner.owner_id
            ))
        })
    }

    pub fn payload(&self, public_key: Option<KeyRef>, private_key: Option<KeyRef>) -> JobPayload {
        JobPayload::for_job(&self.job, public_key, private_key)
    }
}

/// Validate the request and build the QUEUED job (no writes)
pub(crate) async fn draft(
    ctx: &FactoryContext,
    category: OperationCategory,
    scheme: Scheme,
    req: CreateJobRequest,
) -> Result<Draft> {
    validate_request(&req)?;
    let owner = ctx.owner_resolver.resolve(&req.owner_id).await?;

    let now = ctx.time_provider.now_millis();
    let output_path = req
        .output_path
        .clone()
        .unwrap_or_else(|| prefix_with_timestamp(&req.source_path, now));

    let mut job = Job::new(
        ctx.id_provider.generate_id(),
        now,
        owner.owner_id.clone(),
        category,
        scheme,
        ctx.routing.queue_for(category),
        req.source_path,
        output_path,
    );
    job.sign_with_encryption = category == OperationCategory::Encrypt && req.sign_with_encryption;

    // the worker renames its result onto the artifact path
    if job.artifact_path() == Path::new(&job.source_path) {
        return Err(AppError::Validation(format!(
            "{} job would overwrite its source {}",
            category, job.source_path
        )));
    }

    Ok(Draft { job, owner })
}

/// Persist the job, then hand its payload to the queue.
///
/// If the enqueue fails the job is moved to FAILED before the error is returned,
/// so no job stays QUEUED without a task behind it.
pub(crate) async fn dispatch(ctx: &FactoryContext, job: Job, payload: JobPayload) -> Result<Job> {
    let created = ctx.job_inventory.create_job(&job).await?;

    match ctx.queue_inventory.enqueue(&created.queue, &payload).await {
        Ok(assignment) => {
            info!(
                job_id = %created.id,
                queue = %assignment.queue,
                task_id = %assignment.task_id,
                category = %created.category,
                scheme = %created.scheme,
                "Job submitted"
            );
            Ok(created)
        }
        Err(e) => {
            let reason = e.to_string();
            warn!(job_id = %created.id, queue = %created.queue, error = %reason, "Enqueue failed, compensating");

            let detail = format!("SubmissionFailed: {}", reason);
            if let Err(comp_err) = ctx
                .job_inventory
                .update_status(&created.id, JobState::Failed, Some(&detail))
                .await
            {
                error!(
                    job_id = %created.id,
                    error = %comp_err,
                    "Compensation failed, job left QUEUED without assignment"
                );
            }

            Err(AppError::SubmissionFailed {
                job_id: created.id,
                reason,
            })
        }
    }
}
