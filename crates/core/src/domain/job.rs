// Job Domain Model

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::error::{DomainError, Result};
use crate::domain::scheme::Scheme;

/// Job ID (UUID v4)
pub type JobId = String;

/// Owner reference (resolved by the OwnerResolver port)
pub type OwnerId = String;

/// Suffix appended to the output path by encryption jobs
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Job State
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Whether `self -> next` is a legal (monotonic) transition
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Running)
                | (JobState::Queued, JobState::Failed)
                | (JobState::Running, JobState::Succeeded)
                | (JobState::Running, JobState::Failed)
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "QUEUED"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Succeeded => write!(f, "SUCCEEDED"),
            JobState::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "QUEUED" => Ok(JobState::Queued),
            "RUNNING" => Ok(JobState::Running),
            "SUCCEEDED" => Ok(JobState::Succeeded),
            "FAILED" => Ok(JobState::Failed),
            other => Err(DomainError::ValidationError(format!(
                "unknown job state: {}",
                other
            ))),
        }
    }
}

/// Operation category (one worker queue per category)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationCategory {
    Encrypt,
    Decrypt,
    Compress,
    Decompress,
}

impl OperationCategory {
    pub const ALL: [OperationCategory; 4] = [
        OperationCategory::Encrypt,
        OperationCategory::Decrypt,
        OperationCategory::Compress,
        OperationCategory::Decompress,
    ];

    /// Default queue name for this category
    pub fn default_queue(&self) -> &'static str {
        match self {
            OperationCategory::Encrypt => "encryption",
            OperationCategory::Decrypt => "decryption",
            OperationCategory::Compress => "compression",
            OperationCategory::Decompress => "decompression",
        }
    }
}

impl std::fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationCategory::Encrypt => write!(f, "ENCRYPT"),
            OperationCategory::Decrypt => write!(f, "DECRYPT"),
            OperationCategory::Compress => write!(f, "COMPRESS"),
            OperationCategory::Decompress => write!(f, "DECOMPRESS"),
        }
    }
}

impl std::str::FromStr for OperationCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ENCRYPT" => Ok(OperationCategory::Encrypt),
            "DECRYPT" => Ok(OperationCategory::Decrypt),
            "COMPRESS" => Ok(OperationCategory::Compress),
            "DECOMPRESS" => Ok(OperationCategory::Decompress),
            other => Err(DomainError::ValidationError(format!(
                "unknown operation category: {}",
                other
            ))),
        }
    }
}

/// Job Entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    // Identity
    pub id: JobId,
    pub owner_id: OwnerId,
    pub category: OperationCategory,
    pub scheme: Scheme,
    pub queue: String,

    // Files
    pub source_path: String,
    pub output_path: String,
    pub sign_with_encryption: bool,

    // Lifecycle
    pub state: JobState,
    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub error_detail: Option<String>,
}

impl Job {
    /// Create a new Job in QUEUED state
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `owner_id` - Owner reference
    /// * `category` - Operation category
    /// * `scheme` - Requested scheme
    /// * `queue` - Queue the job is routed to
    /// * `source_path` - File to read
    /// * `output_path` - File to write (encryption appends `.enc`)
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        owner_id: impl Into<String>,
        category: OperationCategory,
        scheme: Scheme,
        queue: impl Into<String>,
        source_path: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            category,
            scheme,
            queue: queue.into(),
            source_path: source_path.into(),
            output_path: output_path.into(),
            sign_with_encryption: false,
            state: JobState::Queued,
            created_at,
            started_at: None,
            finished_at: None,
            error_detail: None,
        }
    }

    /// Create a test job with deterministic ID and timestamp (test-1, test-2, ...)
    ///
    /// **Note**: production code injects ID and time via providers.
    pub fn new_test(category: OperationCategory, scheme: Scheme) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self::new(
            format!("test-{}", counter),
            (counter * 1000) as i64,
            "owner-test",
            category,
            scheme,
            category.default_queue(),
            format!("/tmp/cryptq-test/source-{}", counter),
            format!("/tmp/cryptq-test/output-{}", counter),
        )
    }

    /// Path the worker actually writes on success
    pub fn artifact_path(&self) -> PathBuf {
        match self.category {
            OperationCategory::Encrypt => {
                PathBuf::from(format!("{}{}", self.output_path, ENCRYPTED_SUFFIX))
            }
            _ => PathBuf::from(&self.output_path),
        }
    }

    /// Apply a validated state transition
    pub fn transition(
        &mut self,
        next: JobState,
        now_millis: i64,
        error_detail: Option<&str>,
    ) -> Result<()> {
        match next {
            JobState::Running => self.start(now_millis),
            JobState::Succeeded => self.succeed(now_millis),
            JobState::Failed => self.fail(now_millis, error_detail.unwrap_or("unknown failure")),
            JobState::Queued => Err(self.invalid(next)),
        }
    }

    /// Transition to Running state with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        if !self.state.can_transition_to(JobState::Running) {
            return Err(self.invalid(JobState::Running));
        }
        self.state = JobState::Running;
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Succeeded state with explicit timestamp
    pub fn succeed(&mut self, now_millis: i64) -> Result<()> {
        if !self.state.can_transition_to(JobState::Succeeded) {
            return Err(self.invalid(JobState::Succeeded));
        }
        self.state = JobState::Succeeded;
        self.finished_at = Some(now_millis);
        self.error_detail = None;
        Ok(())
    }

    /// Transition to Failed state, recording the error detail
    pub fn fail(&mut self, now_millis: i64, detail: impl Into<String>) -> Result<()> {
        if !self.state.can_transition_to(JobState::Failed) {
            return Err(self.invalid(JobState::Failed));
        }
        self.state = JobState::Failed;
        self.finished_at = Some(now_millis);
        self.error_detail = Some(detail.into());
        Ok(())
    }

    fn invalid(&self, to: JobState) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }
}
