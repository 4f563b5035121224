use crate::errors::{Operation, SessionError, StoreError};
use crate::identity::Identity;
use crate::models::{DEFAULT_DAILY_GOAL, Profile};
use crate::schema::{self, IdentityFields};
use crate::store::{Store, Table};
use tracing::{info, warn};

pub async fn find_profile(store: &dyn Store, user_id: &str) -> Result<Option<Profile>, StoreError> {
    let rows = store
        .select(Table::Profiles, &schema::profile_key(user_id))
        .await?;
    rows.into_iter()
        .next()
        .map(|row| schema::decode_profile(Operation::Select, row))
        .transpose()
}

/// Fetch or create the profile for `identity`, then bring its name and
/// avatar fields in line with what the host reports.
///
/// A second call with the same identity issues no writes.
pub async fn reconcile(store: &dyn Store, identity: &Identity) -> Result<Profile, SessionError> {
    let user_id = identity.user_id();
    let existing = find_profile(store, &user_id)
        .await
        .map_err(SessionError::from_lookup)?;

    match existing {
        Some(stored) => Ok(sync_identity(store, stored, identity).await),
        None => create_profile(store, identity).await,
    }
}

async fn create_profile(store: &dyn Store, identity: &Identity) -> Result<Profile, SessionError> {
    let row = schema::new_profile_row(identity, DEFAULT_DAILY_GOAL);
    let rows = match store.insert(Table::Profiles, row).await {
        Ok(rows) => rows,
        // Another launch of the same user created the row first.
        Err(StoreError::Rejected { status: 409, .. }) => {
            return adopt_concurrent_profile(store, identity).await;
        }
        Err(err @ StoreError::Unreachable { .. }) => return Err(SessionError::Connectivity(err)),
        Err(other) => return Err(SessionError::ProfileCreation(other.to_string())),
    };

    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| SessionError::ProfileCreation("insert returned no row".into()))?;
    let profile = schema::decode_profile(Operation::Insert, row)
        .map_err(|err| SessionError::ProfileCreation(err.to_string()))?;

    info!(user_id = %profile.user_id, goal = profile.daily_goal, "profile created");
    Ok(profile)
}

async fn adopt_concurrent_profile(
    store: &dyn Store,
    identity: &Identity,
) -> Result<Profile, SessionError> {
    let user_id = identity.user_id();
    match find_profile(store, &user_id)
        .await
        .map_err(SessionError::from_lookup)?
    {
        Some(stored) => {
            info!(user_id = %user_id, "profile created concurrently, reusing it");
            Ok(sync_identity(store, stored, identity).await)
        }
        None => Err(SessionError::ProfileCreation(format!(
            "insert conflicted but no profile exists for user {user_id}"
        ))),
    }
}

async fn sync_identity(store: &dyn Store, mut stored: Profile, identity: &Identity) -> Profile {
    let observed = IdentityFields::of_identity(identity);
    if observed == IdentityFields::of_profile(&stored) {
        return stored;
    }

    let result = store
        .update(
            Table::Profiles,
            &schema::profile_key(&stored.user_id),
            observed.to_patch(),
        )
        .await;

    match result {
        Ok(rows) if rows.is_empty() => {
            warn!(
                user_id = %stored.user_id,
                operation = "update",
                table = Table::Profiles.name(),
                "keeping stale profile, identity refresh matched no row"
            );
        }
        Ok(_) => {
            info!(user_id = %stored.user_id, "profile identity fields refreshed");
            observed.apply_to(&mut stored);
        }
        Err(err) => {
            warn!(
                user_id = %stored.user_id,
                operation = "update",
                table = Table::Profiles.name(),
                "keeping stale profile, identity refresh failed: {err}"
            );
        }
    }
    stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Filter, MemoryStore};
    use async_trait::async_trait;
    use serde_json::Value;

    /// Yields after every read so concurrent callers interleave, and can
    /// drop updates the way a row-level policy silently does.
    #[derive(Default)]
    struct InterleavingStore {
        inner: MemoryStore,
        drop_updates: bool,
    }

    #[async_trait]
    impl Store for InterleavingStore {
        async fn select(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>, StoreError> {
            let rows = self.inner.select(table, filters).await;
            tokio::task::yield_now().await;
            rows
        }

        async fn insert(&self, table: Table, row: Value) -> Result<Vec<Value>, StoreError> {
            self.inner.insert(table, row).await
        }

        async fn update(
            &self,
            table: Table,
            filters: &[Filter],
            patch: Value,
        ) -> Result<Vec<Value>, StoreError> {
            if self.drop_updates {
                return Ok(Vec::new());
            }
            self.inner.update(table, filters, patch).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
    }

    fn identity(id: i64, name: &str) -> Identity {
        Identity {
            id,
            first_name: name.into(),
            last_name: None,
            username: None,
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn creates_profile_once_with_default_goal() {
        let store = MemoryStore::new();
        let ada = identity(1, "A");

        let created = reconcile(&store, &ada).await.unwrap();
        assert_eq!(created.user_id, "1");
        assert_eq!(created.daily_goal, 2000);
        assert_eq!(created.first_name, "A");
        assert!(created.created_at.is_some());
        assert_eq!(store.write_count(), 1);

        let again = reconcile(&store, &ada).await.unwrap();
        assert_eq!(again, created);
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.rows(Table::Profiles).await.len(), 1);
    }

    #[tokio::test]
    async fn drift_issues_one_update_and_merges() {
        let store = MemoryStore::new();
        reconcile(&store, &identity(1, "A")).await.unwrap();

        let renamed = Identity {
            username: Some("ada".into()),
            photo_url: Some("https://x/a.png".into()),
            ..identity(1, "Ada")
        };
        let profile = reconcile(&store, &renamed).await.unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.username.as_deref(), Some("ada"));
        assert_eq!(profile.photo_url.as_deref(), Some("https://x/a.png"));
        assert_eq!(profile.daily_goal, 2000);

        let stored = find_profile(&store, "1").await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Ada");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_profile() {
        let store = MemoryStore::new();
        reconcile(&store, &identity(1, "A")).await.unwrap();
        store.reject_writes(Table::Profiles, true);

        let profile = reconcile(&store, &identity(1, "B")).await.unwrap();
        assert_eq!(profile.first_name, "A");
    }

    #[tokio::test]
    async fn concurrent_first_launches_share_one_profile() {
        let store = InterleavingStore::default();
        let ada = identity(1, "A");

        let (first, second) = tokio::join!(reconcile(&store, &ada), reconcile(&store, &ada));
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.user_id, "1");
        assert_eq!(second.user_id, "1");
        assert_eq!(second.daily_goal, 2000);
        assert_eq!(store.inner.rows(Table::Profiles).await.len(), 1);
        assert_eq!(store.inner.write_count(), 1);
    }

    #[tokio::test]
    async fn refresh_matching_no_row_keeps_stale_profile() {
        let mut store = InterleavingStore::default();
        reconcile(&store, &identity(1, "A")).await.unwrap();
        store.drop_updates = true;

        let profile = reconcile(&store, &identity(1, "B")).await.unwrap();
        assert_eq!(profile.first_name, "A");
        let stored = find_profile(&store, "1").await.unwrap().unwrap();
        assert_eq!(stored.first_name, "A");
    }

    #[tokio::test]
    async fn creation_failure_is_fatal() {
        let store = MemoryStore::new();
        store.reject_writes(Table::Profiles, true);

        let err = reconcile(&store, &identity(1, "A")).await.unwrap_err();
        assert_eq!(err.kind(), "write_rejected");
    }

    #[tokio::test]
    async fn unreachable_store_is_a_connectivity_error() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let err = reconcile(&store, &identity(1, "A")).await.unwrap_err();
        assert!(matches!(err, SessionError::Connectivity(_)));
    }
}
