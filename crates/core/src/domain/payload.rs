// Job Payload - the immutable subset of a Job handed to a worker

use serde::{Deserialize, Serialize};

use crate::domain::job::{Job, JobId, OperationCategory};
use crate::domain::key::KeyRef;
use crate::domain::scheme::Scheme;

/// Payload stored with a queued task.
///
/// Carries key *references* only; key bytes are resolved by the worker for the
/// duration of one execution. Optional fields are validated by the processor,
/// since the payload crosses a storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub job_id: JobId,
    pub category: OperationCategory,
    pub scheme: Scheme,
    pub source_path: Option<String>,
    pub output_path: Option<String>,
    #[serde(default)]
    pub public_key: Option<KeyRef>,
    #[serde(default)]
    pub private_key: Option<KeyRef>,
    #[serde(default)]
    pub sign_with_encryption: bool,
}

impl JobPayload {
    /// Build the payload for a job (key references chosen by the factory)
    pub fn for_job(job: &Job, public_key: Option<KeyRef>, private_key: Option<KeyRef>) -> Self {
        Self {
            job_id: job.id.clone(),
            category: job.category,
            scheme: job.scheme.clone(),
            source_path: Some(job.source_path.clone()),
            output_path: Some(job.output_path.clone()),
            public_key,
            private_key,
            sign_with_encryption: job.sign_with_encryption,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
