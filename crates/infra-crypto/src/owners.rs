// Static owner table loaded from JSON

use async_trait::async_trait;
use cryptq_core::domain::{KeyRef, OwnerId};
use cryptq_core::error::{AppError, Result};
use cryptq_core::port::{KeyProvider, OwnerIdentity, OwnerResolver};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Owner directory read once at start-up.
///
/// File format: `[{"owner_id": "alice", "public_key": "alice.pub", "private_key": "alice.sec"}]`
#[derive(Debug, Default)]
pub struct StaticOwnerResolver {
    owners: HashMap<OwnerId, OwnerIdentity>,
}

impl StaticOwnerResolver {
    pub fn new(identities: impl IntoIterator<Item = OwnerIdentity>) -> Self {
        Self {
            owners: identities
                .into_iter()
                .map(|identity| (identity.owner_id.clone(), identity))
                .collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let identities: Vec<OwnerIdentity> = serde_json::from_str(json)
            .map_err(|e| AppError::Config(format!("invalid owners file: {}", e)))?;
        Ok(Self::new(identities))
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Config(format!("cannot read owners file {}: {}", path.display(), e))
        })?;
        let resolver = Self::from_json(&json)?;
        info!(path = %path.display(), owners = resolver.len(), "Loaded owner directory");
        Ok(resolver)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Key references no job of their owner could load, sorted by owner
    pub async fn unresolved_keys(&self, keys: &dyn KeyProvider) -> Vec<(OwnerId, KeyRef)> {
        let mut owners: Vec<&OwnerIdentity> = self.owners.values().collect();
        owners.sort_by(|a, b| a.owner_id.cmp(&b.owner_id));

        let mut unresolved = Vec::new();
        for owner in owners {
            if let Err(e) = keys.public_key(&owner.public_key).await {
                warn!(owner_id = %owner.owner_id, key_ref = %owner.public_key, "Public key unavailable: {}", e);
                unresolved.push((owner.owner_id.clone(), owner.public_key.clone()));
            }
            if let Some(private_key) = &owner.private_key {
                if let Err(e) = keys.secret_key(private_key).await {
                    warn!(owner_id = %owner.owner_id, key_ref = %private_key, "Private key unavailable: {}", e);
                    unresolved.push((owner.owner_id.clone(), private_key.clone()));
                }
            }
        }
        unresolved
    }
}

#[async_trait]
impl OwnerResolver for StaticOwnerResolver {
    async fn resolve(&self, owner_id: &str) -> Result<OwnerIdentity> {
        self.owners
            .get(owner_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Owner {} not found", owner_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FsKeyring;

    const OWNERS: &str = r#"[
        {"owner_id": "alice", "public_key": "alice.pub", "private_key": "alice.sec"},
        {"owner_id": "bob", "public_key": "bob.pub"}
    ]"#;

    #[tokio::test]
    async fn test_resolves_known_owner() {
        let resolver = StaticOwnerResolver::from_json(OWNERS).unwrap();
        assert_eq!(resolver.len(), 2);

        let alice = resolver.resolve("alice").await.unwrap();
        assert_eq!(alice.public_key, KeyRef::new("alice.pub"));
        assert_eq!(alice.private_key, Some(KeyRef::new("alice.sec")));

        let bob = resolver.resolve("bob").await.unwrap();
        assert!(bob.private_key.is_none());
    }

    #[tokio::test]
    async fn test_unknown_owner_is_not_found() {
        let resolver = StaticOwnerResolver::from_json(OWNERS).unwrap();
        assert!(matches!(
            resolver.resolve("mallory").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(
            StaticOwnerResolver::from_json("{not json"),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owners.json");
        std::fs::write(&path, OWNERS).unwrap();
        let resolver = StaticOwnerResolver::load(&path).await.unwrap();
        assert!(!resolver.is_empty());

        let missing = StaticOwnerResolver::load(&dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_unresolved_keys_lists_missing_references() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alice.pub.asc"), "PUBLIC BLOCK").unwrap();
        std::fs::write(dir.path().join("alice.sec.asc"), "SECRET BLOCK").unwrap();
        let keyring = FsKeyring::new(dir.path());

        let resolver = StaticOwnerResolver::from_json(OWNERS).unwrap();
        let unresolved = resolver.unresolved_keys(&keyring).await;
        assert_eq!(
            unresolved,
            vec![("bob".to_string(), KeyRef::new("bob.pub"))]
        );
    }
}
