// Job creation request + validation

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Longest owner reference accepted
pub const MAX_OWNER_ID_LEN: usize = 128;

/// Longest path accepted (bytes)
pub const MAX_PATH_LEN: usize = 4096;

/// What a caller hands the factory layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub owner_id: String,
    pub source_path: String,

    /// Derived from the source path when absent
    #[serde(default)]
    pub output_path: Option<String>,

    /// Co-sign while encrypting (encryption jobs only)
    #[serde(default)]
    pub sign_with_encryption: bool,
}

impl CreateJobRequest {
    pub fn new(owner_id: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            source_path: source_path.into(),
            output_path: None,
            sign_with_encryption: false,
        }
    }

    pub fn with_output(mut self, output_path: impl Into<String>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    pub fn signed(mut self) -> Self {
        self.sign_with_encryption = true;
        self
    }
}

/// Validate a request before anything is persisted
pub fn validate_request(req: &CreateJobRequest) -> Result<()> {
    if req.owner_id.trim().is_empty() {
        return Err(AppError::Validation("owner_id must not be empty".to_string()));
    }
    if req.owner_id.len() > MAX_OWNER_ID_LEN {
        return Err(AppError::Validation(format!(
            "owner_id too long (max {} bytes)",
            MAX_OWNER_ID_LEN
        )));
    }

    validate_path("source_path", &req.source_path)?;
    if let Some(output) = &req.output_path {
        validate_path("output_path", output)?;
        if output == &req.source_path {
            return Err(AppError::Validation(
                "output_path must differ from source_path".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_path(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    if path.len() > MAX_PATH_LEN {
        return Err(AppError::Validation(format!(
            "{} too long (max {} bytes)",
            field, MAX_PATH_LEN
        )));
    }
    if path.contains('\0') {
        return Err(AppError::Validation(format!(
            "{} contains a NUL byte",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_owner_empty() {
        let req = CreateJobRequest::new("  ", "/data/in.bin");
        let result = validate_request(&req);
        assert!(result.unwrap_err().to_string().contains("owner_id"));
    }

    #[test]
    fn test_validate_owner_too_long() {
        let req = CreateJobRequest::new("a".repeat(MAX_OWNER_ID_LEN + 1), "/data/in.bin");
        let result = validate_request(&req);
        assert!(result.unwrap_err().to_string().contains("too long"));
    }

    #[test]
    fn test_validate_source_empty() {
        let req = CreateJobRequest::new("alice", "");
        let result = validate_request(&req);
        assert!(result.unwrap_err().to_string().contains("source_path"));
    }

    #[test]
    fn test_validate_nul_in_output() {
        let req = CreateJobRequest::new("alice", "/data/in.bin").with_output("/data/o\0ut");
        let result = validate_request(&req);
        assert!(result.unwrap_err().to_string().contains("NUL"));
    }

    #[test]
    fn test_validate_output_equals_source() {
        let req = CreateJobRequest::new("alice", "/data/in.bin").with_output("/data/in.bin");
        let result = validate_request(&req);
        assert!(result.unwrap_err().to_string().contains("differ"));
    }

    #[test]
    fn test_validate_valid_request() {
        let req = CreateJobRequest::new("alice", "/data/in.bin")
            .with_output("/data/out.bin")
            .signed();
        assert!(validate_request(&req).is_ok());
    }
}
