use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;

use crate::model::user::UserProfile;

const MAX_PROFILES: u64 = 50_000;

/// Short-lived profile cache keyed by user id.
///
/// Every write path that touches a user must call [`ProfileCache::invalidate`]
/// after its store write.
#[derive(Clone)]
pub struct ProfileCache {
    inner: Cache<u64, UserProfile>,
    /// Bumped by every invalidation.
    generation: Arc<AtomicU64>,
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_PROFILES)
                .time_to_live(ttl)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read before loading from the store; hand it back to [`Self::put_if_current`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn get(&self, user_id: u64) -> Option<UserProfile> {
        self.inner.get(&user_id).await
    }

    /// Caches a profile loaded at `generation`. If an invalidation ran since,
    /// the entry is dropped again so a stale read never outlives it.
    pub async fn put_if_current(&self, profile: UserProfile, generation: u64) {
        let user_id = profile.id;
        self.inner.insert(user_id, profile).await;
        if self.generation() != generation {
            self.inner.invalidate(&user_id).await;
        }
    }

    pub async fn invalidate(&self, user_id: u64) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.invalidate(&user_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::model::user::LeaveBalance;
    use chrono::Utc;

    fn profile(id: u64) -> UserProfile {
        UserProfile {
            id,
            employee_id: format!("EMP{:03}", id),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            role: Role::Employee,
            department: "Ops".into(),
            gender: None,
            leave_balance: LeaveBalance::default(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[actix_web::test]
    async fn invalidation_drops_cached_profile() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        cache.put_if_current(profile(1), cache.generation()).await;
        assert!(cache.get(1).await.is_some());

        cache.invalidate(1).await;
        assert!(cache.get(1).await.is_none());
    }

    #[actix_web::test]
    async fn load_that_raced_an_invalidation_is_not_kept() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        let seen = cache.generation();
        // A writer commits and invalidates while the load is in flight
        cache.invalidate(1).await;
        cache.put_if_current(profile(1), seen).await;
        assert!(cache.get(1).await.is_none());

        cache.put_if_current(profile(1), cache.generation()).await;
        assert!(cache.get(1).await.is_some());
    }
}
