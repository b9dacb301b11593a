use crate::{identity::TrainerStatus, models::Profile};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// ProfileStore Trait
///
/// The narrow slice of the document store this service needs: read a profile at sign-in
/// or refresh, and let admins move trainers through review. Handlers and extractors only
/// ever see `Arc<dyn ProfileStore>`, so tests run against [`InMemoryProfileStore`].
///
/// Like the rest of the persistence layer, failures are logged here and surface as
/// `None` or an empty list; callers treat them as "not found".
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Option<Profile>;

    /// Sets a trainer's review status. Returns `None` if the uid is unknown or
    /// the profile is not a trainer.
    async fn set_trainer_status(&self, uid: &str, status: TrainerStatus) -> Option<Profile>;

    /// All trainer profiles, oldest update first. Raw status strings are returned as-is;
    /// filtering by `status` compares the classified value.
    async fn list_trainers(&self, status: Option<TrainerStatus>) -> Vec<Profile>;
}

pub type ProfileStoreState = Arc<dyn ProfileStore>;

fn matches_status(profile: &Profile, wanted: Option<TrainerStatus>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => profile.signal().status() == Some(wanted),
    }
}

/// PostgresProfileStore
///
/// `profiles` table backed implementation.
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `profiles` table if missing. Local development only; production
    /// schemas are owned by the platform's migrations.
    pub async fn ensure_schema(&self) {
        let result = sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                uid TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                role TEXT NOT NULL,
                status TEXT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!("ensure_schema error: {:?}", e);
        }
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn get_profile(&self, uid: &str) -> Option<Profile> {
        let result = sqlx::query_as::<_, Profile>(
            "SELECT uid, email, role, status, updated_at FROM profiles WHERE uid = $1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!("get_profile error: {:?}", e);
                None
            }
        }
    }

    async fn set_trainer_status(&self, uid: &str, status: TrainerStatus) -> Option<Profile> {
        // Role comparison happens in SQL so a concurrent role change cannot slip through.
        let result = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET status = $2, updated_at = $3
            WHERE uid = $1 AND lower(trim(role)) = 'trainer'
            RETURNING uid, email, role, status, updated_at
            "#,
        )
        .bind(uid)
        .bind(status.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!("set_trainer_status error: {:?}", e);
                None
            }
        }
    }

    async fn list_trainers(&self, status: Option<TrainerStatus>) -> Vec<Profile> {
        let result = sqlx::query_as::<_, Profile>(
            r#"
            SELECT uid, email, role, status, updated_at
            FROM profiles
            WHERE lower(trim(role)) = 'trainer'
            ORDER BY updated_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await;

        match result {
            Ok(profiles) => profiles
                .into_iter()
                .filter(|p| matches_status(p, status))
                .collect(),
            Err(e) => {
                tracing::error!("list_trainers error: {:?}", e);
                vec![]
            }
        }
    }
}

/// InMemoryProfileStore
///
/// Used for local runs without `DATABASE_URL` and throughout the test suite.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let map = profiles
            .into_iter()
            .map(|p| (p.uid.clone(), p))
            .collect::<HashMap<_, _>>();
        Self {
            profiles: RwLock::new(map),
        }
    }

    pub async fn insert(&self, profile: Profile) {
        self.profiles
            .write()
            .await
            .insert(profile.uid.clone(), profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, uid: &str) -> Option<Profile> {
        self.profiles.read().await.get(uid).cloned()
    }

    async fn set_trainer_status(&self, uid: &str, status: TrainerStatus) -> Option<Profile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(uid)?;
        if !profile.role.trim().eq_ignore_ascii_case("trainer") {
            return None;
        }
        profile.status = Some(status.as_str().to_string());
        profile.updated_at = Utc::now();
        Some(profile.clone())
    }

    async fn list_trainers(&self, status: Option<TrainerStatus>) -> Vec<Profile> {
        let mut trainers: Vec<Profile> = self
            .profiles
            .read()
            .await
            .values()
            .filter(|p| p.role.trim().eq_ignore_ascii_case("trainer"))
            .filter(|p| matches_status(p, status))
            .cloned()
            .collect();
        trainers.sort_by_key(|p| p.updated_at);
        trainers
    }
}
