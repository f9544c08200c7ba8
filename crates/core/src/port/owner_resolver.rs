// Owner Resolution Port (Interface)

use crate::domain::{KeyRef, OwnerId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Validated identity of a job owner, as needed for key lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerIdentity {
    pub owner_id: OwnerId,
    pub public_key: KeyRef,
    #[serde(default)]
    pub private_key: Option<KeyRef>,
}

/// Resolves an owner reference (user management lives outside this core)
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    /// # Errors
    /// - AppError::NotFound if the owner is unknown
    async fn resolve(&self, owner_id: &str) -> Result<OwnerIdentity>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;

    /// Fixed owner table
    #[derive(Default)]
    pub struct MockOwnerResolver {
        owners: HashMap<OwnerId, OwnerIdentity>,
    }

    impl MockOwnerResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_owner(mut self, identity: OwnerIdentity) -> Self {
            self.owners.insert(identity.owner_id.clone(), identity);
            self
        }
    }

    #[async_trait]
    impl OwnerResolver for MockOwnerResolver {
        async fn resolve(&self, owner_id: &str) -> Result<OwnerIdentity> {
            self.owners
                .get(owner_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Owner {} not found", owner_id)))
        }
    }
}
