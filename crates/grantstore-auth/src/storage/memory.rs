//! In-memory storage backends.
//!
//! Token records live behind a single `RwLock` so that `save` can evict and
//! insert under one write guard. Client and user registries are plain
//! concurrent maps.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;

use crate::AuthResult;
use crate::storage::{AccessTokenStorage, ClientStorage, RefreshTokenStorage, UserStorage};
use crate::token::key::TokenKey;
use crate::types::{AccessTokenRecord, ClientRegistration, RefreshTokenRecord, User};

// =============================================================================
// Token Records
// =============================================================================

#[derive(Default)]
struct AccessTokenTable {
    records: HashMap<String, AccessTokenRecord>,
    by_token_key: HashMap<TokenKey, String>,
    by_authentication_key: HashMap<TokenKey, String>,
    /// Insertion sequence per record id; lower is older.
    inserted_at: HashMap<String, u64>,
    next_sequence: u64,
}

impl AccessTokenTable {
    fn insert(&mut self, record: &AccessTokenRecord) {
        self.by_token_key
            .insert(record.token_key.clone(), record.record_id.clone());
        self.by_authentication_key
            .insert(record.authentication_key.clone(), record.record_id.clone());
        self.inserted_at
            .insert(record.record_id.clone(), self.next_sequence);
        self.next_sequence += 1;
        self.records
            .insert(record.record_id.clone(), record.clone());
    }

    fn remove(&mut self, record_id: &str) -> Option<AccessTokenRecord> {
        let record = self.records.remove(record_id)?;
        self.by_token_key.remove(&record.token_key);
        self.by_authentication_key.remove(&record.authentication_key);
        self.inserted_at.remove(record_id);
        Some(record)
    }

    /// Records matching `predicate`, oldest first.
    fn select(&self, predicate: impl Fn(&AccessTokenRecord) -> bool) -> Vec<AccessTokenRecord> {
        let mut matches: Vec<(u64, &AccessTokenRecord)> = self
            .records
            .iter()
            .filter(|(_, record)| predicate(*record))
            .map(|(id, record)| (self.inserted_at.get(id).copied().unwrap_or(u64::MAX), record))
            .collect();
        matches.sort_by_key(|(sequence, _)| *sequence);
        matches.into_iter().map(|(_, record)| record.clone()).collect()
    }

    fn lookup(&self, index: &HashMap<TokenKey, String>, key: &TokenKey) -> Option<AccessTokenRecord> {
        index
            .get(key)
            .and_then(|id| self.records.get(id))
            .cloned()
    }
}

#[derive(Default)]
struct RefreshTokenTable {
    records: HashMap<String, RefreshTokenRecord>,
    by_token_key: HashMap<TokenKey, String>,
}

/// In-memory access and refresh token record storage.
///
/// Implements both [`AccessTokenStorage`] and [`RefreshTokenStorage`], so
/// one `Arc` can back both halves of the token store.
#[derive(Clone, Default)]
pub struct InMemoryTokenRecordStorage {
    access: Arc<RwLock<AccessTokenTable>>,
    refresh: Arc<RwLock<RefreshTokenTable>>,
}

impl InMemoryTokenRecordStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live access token records.
    pub async fn access_token_count(&self) -> usize {
        self.access.read().await.records.len()
    }

    /// Number of live refresh token records.
    pub async fn refresh_token_count(&self) -> usize {
        self.refresh.read().await.records.len()
    }
}

#[async_trait]
impl AccessTokenStorage for InMemoryTokenRecordStorage {
    async fn save(&self, record: &AccessTokenRecord) -> AuthResult<Vec<AccessTokenRecord>> {
        let mut table = self.access.write().await;

        let mut conflicting: Vec<String> = [
            table.by_token_key.get(&record.token_key),
            table.by_authentication_key.get(&record.authentication_key),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
        conflicting.dedup();

        let evicted = conflicting
            .iter()
            .filter_map(|id| table.remove(id))
            .collect();

        table.insert(record);

        Ok(evicted)
    }

    async fn find_by_token_key(
        &self,
        token_key: &TokenKey,
    ) -> AuthResult<Option<AccessTokenRecord>> {
        let table = self.access.read().await;
        Ok(table.lookup(&table.by_token_key, token_key))
    }

    async fn find_by_authentication_key(
        &self,
        authentication_key: &TokenKey,
    ) -> AuthResult<Option<AccessTokenRecord>> {
        let table = self.access.read().await;
        Ok(table.lookup(&table.by_authentication_key, authentication_key))
    }

    async fn find_by_refresh_key(
        &self,
        refresh_key: &TokenKey,
    ) -> AuthResult<Option<AccessTokenRecord>> {
        // refresh_key is not unique; the oldest record wins
        let table = self.access.read().await;
        Ok(table
            .select(|r| r.refresh_key.as_ref() == Some(refresh_key))
            .into_iter()
            .next())
    }

    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Vec<AccessTokenRecord>> {
        let table = self.access.read().await;
        Ok(table.select(|r| r.client_id == client_id))
    }

    async fn find_by_client_id_and_username(
        &self,
        client_id: &str,
        username: &str,
    ) -> AuthResult<Vec<AccessTokenRecord>> {
        let table = self.access.read().await;
        Ok(table.select(|r| r.client_id == client_id && r.username.as_deref() == Some(username)))
    }

    async fn delete(&self, record_id: &str) -> AuthResult<bool> {
        let mut table = self.access.write().await;
        Ok(table.remove(record_id).is_some())
    }
}

#[async_trait]
impl RefreshTokenStorage for InMemoryTokenRecordStorage {
    async fn save(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        let mut table = self.refresh.write().await;

        if let Some(previous) = table
            .by_token_key
            .insert(record.token_key.clone(), record.record_id.clone())
        {
            table.records.remove(&previous);
        }
        table
            .records
            .insert(record.record_id.clone(), record.clone());

        Ok(())
    }

    async fn find_by_token_key(
        &self,
        token_key: &TokenKey,
    ) -> AuthResult<Option<RefreshTokenRecord>> {
        let table = self.refresh.read().await;
        Ok(table
            .by_token_key
            .get(token_key)
            .and_then(|id| table.records.get(id))
            .cloned())
    }

    async fn delete(&self, record_id: &str) -> AuthResult<bool> {
        let mut table = self.refresh.write().await;
        match table.records.remove(record_id) {
            Some(record) => {
                table.by_token_key.remove(&record.token_key);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// =============================================================================
// Client Registry
// =============================================================================

/// In-memory client registry.
#[derive(Clone, Default)]
pub struct InMemoryClientStorage {
    clients: Arc<DashMap<String, ClientRegistration>>,
}

impl InMemoryClientStorage {
    /// Creates a registry with an initial set of clients.
    #[must_use]
    pub fn new(initial_clients: Vec<ClientRegistration>) -> Self {
        let clients = DashMap::new();
        for client in initial_clients {
            clients.insert(client.client_id.clone(), client);
        }
        Self {
            clients: Arc::new(clients),
        }
    }
}

#[async_trait]
impl ClientStorage for InMemoryClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<ClientRegistration>> {
        Ok(self
            .clients
            .get(client_id)
            .map(|entry| entry.value().clone()))
    }

    async fn save(&self, registration: &ClientRegistration) -> AuthResult<()> {
        self.clients
            .insert(registration.client_id.clone(), registration.clone());
        Ok(())
    }
}

// =============================================================================
// Users
// =============================================================================

/// In-memory login user storage, keyed by user id.
#[derive(Clone, Default)]
pub struct InMemoryUserStorage {
    users: Arc<DashMap<String, User>>,
}

impl InMemoryUserStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn find_by_username(&self, username: &str) -> AuthResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone())
            .collect();
        // DashMap iteration order is arbitrary; keep "first match" stable.
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn latest_id_with_prefix(&self, prefix: &str) -> AuthResult<Option<String>> {
        Ok(self
            .users
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .filter_map(|entry| {
                let sequence = entry.key()[prefix.len()..].parse::<u64>().ok()?;
                Some((sequence, entry.key().clone()))
            })
            .max_by_key(|(sequence, _)| *sequence)
            .map(|(_, id)| id))
    }

    async fn create(&self, user: &User) -> AuthResult<bool> {
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(user.clone());
                Ok(true)
            }
        }
    }

    async fn save(&self, user: &User) -> AuthResult<()> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessToken, Authentication, OAuth2Request, RefreshToken};

    fn access_record(value: &str, fingerprint: &str, client_id: &str) -> AccessTokenRecord {
        AccessTokenRecord {
            record_id: crate::types::generate_record_id(),
            token_key: TokenKey::derive(value),
            token: AccessToken::new(value),
            authentication_key: TokenKey::derive(fingerprint),
            username: Some("alice".to_string()),
            client_id: client_id.to_string(),
            authentication: Authentication::client_only(OAuth2Request::new(client_id)),
            refresh_key: None,
        }
    }

    fn refresh_record(value: &str) -> RefreshTokenRecord {
        RefreshTokenRecord {
            record_id: crate::types::generate_record_id(),
            token_key: TokenKey::derive(value),
            token: RefreshToken::new(value),
            authentication: Authentication::client_only(OAuth2Request::new("web-app")),
        }
    }

    #[tokio::test]
    async fn test_save_evicts_same_authentication_key() {
        let storage = InMemoryTokenRecordStorage::new();
        let first = access_record("abc123", "grant-1", "web-app");
        let second = access_record("abc999", "grant-1", "web-app");

        assert!(AccessTokenStorage::save(&storage, &first).await.unwrap().is_empty());
        let evicted = AccessTokenStorage::save(&storage, &second).await.unwrap();

        assert_eq!(evicted, vec![first.clone()]);
        assert_eq!(storage.access_token_count().await, 1);
        assert!(
            AccessTokenStorage::find_by_token_key(&storage, &first.token_key)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_save_evicts_both_conflicts_once() {
        let storage = InMemoryTokenRecordStorage::new();
        let by_value = access_record("abc123", "grant-1", "web-app");
        let by_grant = access_record("abc999", "grant-2", "web-app");
        AccessTokenStorage::save(&storage, &by_value).await.unwrap();
        AccessTokenStorage::save(&storage, &by_grant).await.unwrap();

        // same value as the first, same fingerprint as the second
        let replacement = access_record("abc123", "grant-2", "web-app");
        let evicted = AccessTokenStorage::save(&storage, &replacement).await.unwrap();

        assert_eq!(evicted.len(), 2);
        assert_eq!(storage.access_token_count().await, 1);
    }

    #[tokio::test]
    async fn test_secondary_index_scans() {
        let storage = InMemoryTokenRecordStorage::new();
        AccessTokenStorage::save(&storage, &access_record("a", "g1", "web-app")).await.unwrap();
        AccessTokenStorage::save(&storage, &access_record("b", "g2", "web-app")).await.unwrap();
        AccessTokenStorage::save(&storage, &access_record("c", "g3", "cli")).await.unwrap();

        assert_eq!(storage.find_by_client_id("web-app").await.unwrap().len(), 2);
        assert_eq!(
            storage
                .find_by_client_id_and_username("cli", "alice")
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            storage
                .find_by_client_id_and_username("cli", "bob")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_shared_refresh_key_resolves_to_oldest() {
        for _ in 0..20 {
            let storage = InMemoryTokenRecordStorage::new();
            let refresh_key = TokenKey::derive("ref456");
            let mut older = access_record("old", "g-read", "web-app");
            older.refresh_key = Some(refresh_key.clone());
            let mut newer = access_record("new", "g-write", "web-app");
            newer.refresh_key = Some(refresh_key.clone());

            AccessTokenStorage::save(&storage, &older).await.unwrap();
            AccessTokenStorage::save(&storage, &newer).await.unwrap();

            let found = storage.find_by_refresh_key(&refresh_key).await.unwrap().unwrap();
            assert_eq!(found.record_id, older.record_id);
        }
    }

    #[tokio::test]
    async fn test_client_listing_is_in_insertion_order() {
        let storage = InMemoryTokenRecordStorage::new();
        for (value, grant) in [("c", "g1"), ("a", "g2"), ("b", "g3")] {
            AccessTokenStorage::save(&storage, &access_record(value, grant, "web-app"))
                .await
                .unwrap();
        }

        let values: Vec<String> = storage
            .find_by_client_id("web-app")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.token.value)
            .collect();
        assert_eq!(values, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let storage = InMemoryTokenRecordStorage::new();
        let record = access_record("a", "g1", "web-app");
        AccessTokenStorage::save(&storage, &record).await.unwrap();

        assert!(AccessTokenStorage::delete(&storage, &record.record_id).await.unwrap());
        assert!(!AccessTokenStorage::delete(&storage, &record.record_id).await.unwrap());
        assert!(
            storage
                .find_by_authentication_key(&record.authentication_key)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_refresh_save_replaces_same_key() {
        let storage = InMemoryTokenRecordStorage::new();
        let first = refresh_record("ref456");
        let second = refresh_record("ref456");

        RefreshTokenStorage::save(&storage, &first).await.unwrap();
        RefreshTokenStorage::save(&storage, &second).await.unwrap();

        assert_eq!(storage.refresh_token_count().await, 1);
        let found = RefreshTokenStorage::find_by_token_key(&storage, &first.token_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.record_id, second.record_id);

        assert!(!RefreshTokenStorage::delete(&storage, &first.record_id).await.unwrap());
        assert!(RefreshTokenStorage::delete(&storage, &second.record_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_latest_user_id() {
        let storage = InMemoryUserStorage::new();
        assert_eq!(storage.latest_id_with_prefix("LoginUser:").await.unwrap(), None);

        for id in ["LoginUser:2", "LoginUser:10", "LoginUser:9", "Other:99"] {
            storage
                .save(&User {
                    id: id.to_string(),
                    username: id.to_string(),
                    password_hash: String::new(),
                    authorities: Default::default(),
                    enabled: true,
                    account_non_expired: true,
                    account_non_locked: true,
                    credentials_non_expired: true,
                })
                .await
                .unwrap();
        }

        assert_eq!(
            storage.latest_id_with_prefix("LoginUser:").await.unwrap(),
            Some("LoginUser:10".to_string())
        );
    }
}
