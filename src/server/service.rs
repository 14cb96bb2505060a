//! Secret store service: type checks and not-found translation on top of
//! the repository.

use tracing::debug;

use super::error::StoreError;
use super::repository::{NewSecret, SecretRepository};
use crate::secret::{Secret, SecretKind};

/// Which secret a request addresses. `owner` always comes from the
/// verified session, never from the request body.
#[derive(Debug, Clone)]
pub struct SecretKey<'a> {
    pub owner: i64,
    pub kind: &'a str,
    pub name: &'a str,
}

#[derive(Clone)]
pub struct SecretService {
    repo: SecretRepository,
}

impl SecretService {
    pub fn new(repo: SecretRepository) -> Self {
        Self { repo }
    }

    /// Store a new secret. The type is checked before the store is
    /// touched.
    pub fn create(
        &self,
        key: &SecretKey<'_>,
        payload: Vec<u8>,
        metadata: Vec<u8>,
    ) -> Result<(), StoreError> {
        let kind = parse_kind(key.kind)?;
        let created_at = self.repo.create(&NewSecret {
            owner: key.owner,
            kind,
            name: key.name.to_string(),
            payload,
            metadata,
        })?;
        debug!(user_id = key.owner, %kind, name = key.name, %created_at, "secret created");
        Ok(())
    }

    pub fn read(&self, key: &SecretKey<'_>) -> Result<Secret, StoreError> {
        let kind = parse_kind(key.kind)?;
        self.repo
            .get(key.owner, kind, key.name)?
            .ok_or(StoreError::NotFound)
    }

    /// Replace payload and metadata of an existing secret.
    pub fn update(
        &self,
        key: &SecretKey<'_>,
        payload: &[u8],
        metadata: &[u8],
    ) -> Result<(), StoreError> {
        let kind = parse_kind(key.kind)?;
        match self
            .repo
            .update(key.owner, kind, key.name, payload, metadata)?
        {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }

    pub fn delete(&self, key: &SecretKey<'_>) -> Result<(), StoreError> {
        let kind = parse_kind(key.kind)?;
        match self.repo.delete(key.owner, kind, key.name)? {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }
}

fn parse_kind(kind: &str) -> Result<SecretKind, StoreError> {
    kind.parse()
        .map_err(|_| StoreError::InvalidType(kind.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::db::Database;
    use crate::server::repository::UserRepository;

    fn setup() -> (SecretService, i64) {
        let db = Database::open_in_memory().unwrap();
        let owner = UserRepository::new(db.clone())
            .create("alice", "hash")
            .unwrap();
        (SecretService::new(SecretRepository::new(db)), owner)
    }

    fn key(owner: i64, kind: &'static str, name: &'static str) -> SecretKey<'static> {
        SecretKey { owner, kind, name }
    }

    #[test]
    fn unknown_type_is_rejected_for_every_operation() {
        let (service, owner) = setup();
        let k = key(owner, "files", "x");

        assert!(matches!(
            service.create(&k, vec![], vec![]),
            Err(StoreError::InvalidType(_))
        ));
        assert!(matches!(service.read(&k), Err(StoreError::InvalidType(_))));
        assert!(matches!(
            service.update(&k, b"", b""),
            Err(StoreError::InvalidType(_))
        ));
        assert!(matches!(service.delete(&k), Err(StoreError::InvalidType(_))));
    }

    #[test]
    fn duplicate_create_propagates_already_exists() {
        let (service, owner) = setup();
        let k = key(owner, "card", "visa");
        service.create(&k, b"one".to_vec(), b"{}".to_vec()).unwrap();
        assert!(matches!(
            service.create(&k, b"two".to_vec(), b"{}".to_vec()),
            Err(StoreError::AlreadyExists)
        ));
        assert_eq!(service.read(&k).unwrap().payload, b"one");
    }

    #[test]
    fn missing_secret_is_not_found() {
        let (service, owner) = setup();
        let k = key(owner, "text", "ghost");
        assert!(matches!(service.read(&k), Err(StoreError::NotFound)));
        assert!(matches!(
            service.update(&k, b"x", b"{}"),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(service.delete(&k), Err(StoreError::NotFound)));
        // The failed update wrote nothing.
        assert!(matches!(service.read(&k), Err(StoreError::NotFound)));
    }

    #[test]
    fn update_replaces_payload_and_keeps_created_at() {
        let (service, owner) = setup();
        let k = key(owner, "text", "note");
        service.create(&k, b"v1".to_vec(), b"{}".to_vec()).unwrap();
        let before = service.read(&k).unwrap();

        service.update(&k, b"v2", b"{\"k\":\"v\"}").unwrap();
        let after = service.read(&k).unwrap();
        assert_eq!(after.payload, b"v2");
        assert_eq!(after.metadata, b"{\"k\":\"v\"}");
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn delete_is_immediate() {
        let (service, owner) = setup();
        let k = key(owner, "binary", "blob");
        service.create(&k, vec![0, 1, 2], b"{}".to_vec()).unwrap();
        service.delete(&k).unwrap();
        assert!(matches!(service.read(&k), Err(StoreError::NotFound)));
    }
}
