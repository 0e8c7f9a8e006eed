//! Access to the `user_profiles` collection.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use dentalcare_auth::profile::PROFILES_TABLE;
use dentalcare_auth::{Profile, ProfileFetchError, ProfileRow, ProfileUpdate, PrincipalId, Role};

use crate::data::{DataService, Query};
use crate::error::DataRequestError;

const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Reads and writes profile rows, parsing them at the trust boundary.
#[derive(Clone)]
pub struct ProfileDirectory {
    data: Arc<dyn DataService>,
    retries: u32,
    backoff: Duration,
}

impl ProfileDirectory {
    pub fn new(data: Arc<dyn DataService>, retries: u32) -> Self {
        Self {
            data,
            retries,
            backoff: RETRY_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn fetch_once(&self, id: PrincipalId) -> Result<Profile, ProfileFetchError> {
        let rows = self
            .data
            .select(PROFILES_TABLE, &Query::new().eq("id", id).limit(1))
            .await
            .map_err(|e| match e {
                e if e.is_transient() => ProfileFetchError::NetworkFailure(e.to_string()),
                DataRequestError::Parse(m) => ProfileFetchError::Malformed(m),
                other => ProfileFetchError::Malformed(other.to_string()),
            })?;
        let row = rows.into_iter().next().ok_or(ProfileFetchError::NotFound)?;
        let row: ProfileRow =
            serde_json::from_value(row).map_err(|e| ProfileFetchError::Malformed(e.to_string()))?;
        Profile::try_from(row)
    }

    /// Fetch and parse the profile of `id`.
    ///
    /// Network failures are retried up to the configured count; not-found
    /// and malformed rows are final on the first attempt.
    pub async fn fetch_profile(&self, id: PrincipalId) -> Result<Profile, ProfileFetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(id).await {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(principal = %id, attempt, error = %e, "profile fetch failed; retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                other => return other,
            }
        }
    }

    /// Profiles newest first, optionally filtered by name or email.
    pub async fn list(&self, search: &str) -> Result<Vec<ProfileRow>, DataRequestError> {
        let query = Query::new()
            .search(&["full_name", "email"], search)
            .order_by("created_at", false);
        let rows = self.data.select(PROFILES_TABLE, &query).await?;
        rows.into_iter()
            .map(|r| serde_json::from_value(r).map_err(DataRequestError::from))
            .collect()
    }

    /// Principals whose role may be assigned appointments.
    pub async fn practitioners(&self) -> Result<Vec<Profile>, DataRequestError> {
        let practitioner_roles = Role::ALL.into_iter().filter(|r| r.is_practitioner()).map(Role::as_str);
        let query = Query::new()
            .in_list("role", practitioner_roles)
            .order_by("full_name", true);
        let rows = self.data.select(PROFILES_TABLE, &query).await?;
        // Rows that fail to parse are left out rather than failing the list.
        Ok(rows
            .into_iter()
            .filter_map(|r| serde_json::from_value::<ProfileRow>(r).ok())
            .filter_map(|r| Profile::try_from(r).ok())
            .collect())
    }

    pub async fn insert(&self, profile: &Profile) -> Result<ProfileRow, DataRequestError> {
        let row = serde_json::to_value(ProfileRow::from(profile))?;
        let stored = self.data.insert(PROFILES_TABLE, row).await?;
        Ok(serde_json::from_value(stored)?)
    }

    pub async fn update(&self, id: PrincipalId, update: &ProfileUpdate) -> Result<ProfileRow, DataRequestError> {
        let patch: Value = serde_json::to_value(update)?;
        let stored = self.data.update(PROFILES_TABLE, &id.to_string(), patch).await?;
        Ok(serde_json::from_value(stored)?)
    }

    pub async fn delete(&self, id: PrincipalId) -> Result<(), DataRequestError> {
        self.data.delete(PROFILES_TABLE, &id.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryDataService;
    use serde_json::json;

    fn directory(retries: u32) -> (Arc<InMemoryDataService>, ProfileDirectory) {
        let svc = Arc::new(InMemoryDataService::new());
        let dir = ProfileDirectory::new(svc.clone(), retries).with_backoff(Duration::from_millis(1));
        (svc, dir)
    }

    #[tokio::test]
    async fn fetch_parses_role() {
        let (svc, dir) = directory(2);
        let id = PrincipalId::new();
        svc.seed(
            PROFILES_TABLE,
            [json!({"id": id.to_string(), "full_name": "Dr. Amal", "email": "amal@clinic.test", "role": "dentist"})],
        );
        let p = dir.fetch_profile(id).await.unwrap();
        assert_eq!(p.role, Role::Dentist);
        assert_eq!(p.full_name, "Dr. Amal");
    }

    #[tokio::test]
    async fn missing_row_is_not_found_without_retry() {
        let (svc, dir) = directory(2);
        assert_eq!(dir.fetch_profile(PrincipalId::new()).await, Err(ProfileFetchError::NotFound));
        assert_eq!(svc.request_count(), 1);
    }

    #[tokio::test]
    async fn unknown_role_is_malformed() {
        let (svc, dir) = directory(2);
        let id = PrincipalId::new();
        svc.seed(PROFILES_TABLE, [json!({"id": id.to_string(), "role": "superuser"})]);
        assert!(matches!(dir.fetch_profile(id).await, Err(ProfileFetchError::Malformed(_))));
    }

    #[tokio::test]
    async fn network_failures_are_retried_then_reported() {
        let (svc, dir) = directory(2);
        svc.set_offline(true);
        let err = dir.fetch_profile(PrincipalId::new()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(svc.request_count(), 3);
    }

    #[tokio::test]
    async fn practitioners_are_admins_and_dentists() {
        let (svc, dir) = directory(0);
        svc.seed(
            PROFILES_TABLE,
            [
                json!({"id": PrincipalId::new().to_string(), "full_name": "B", "role": "dentist"}),
                json!({"id": PrincipalId::new().to_string(), "full_name": "A", "role": "admin"}),
                json!({"id": PrincipalId::new().to_string(), "full_name": "C", "role": "assistant"}),
            ],
        );
        let names: Vec<_> = dir.practitioners().await.unwrap().into_iter().map(|p| p.full_name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
