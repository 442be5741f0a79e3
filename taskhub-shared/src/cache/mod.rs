/// Per-user task-listing cache
///
/// Memoizes the result of the role-scoped task listing under a key derived
/// from `(user_id, role)`. The cache is an optimization for the repeated
/// reader only: it is never authoritative, always safe to evict, and a
/// mutation evicts exactly the acting user's key. Freshness for *other*
/// users is carried by the notification channel, not by the cache, so the
/// staleness window for them is bounded by the entry TTL.
///
/// Admin listings change more often (they see every task), so they get a
/// shorter TTL than regular users.
///
/// Every operation degrades gracefully: a cache backend failure is logged
/// and treated as a miss (or a no-op for writes), never surfaced to the
/// request.
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::cache::ListingCache;
/// use taskhub_shared::models::user::UserRole;
/// use taskhub_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = RedisClient::new(RedisConfig::from_env()?).await?;
/// let cache = ListingCache::new(client);
///
/// if let Some(listing) = cache.get(1, UserRole::User).await {
///     println!("cache hit: {} tasks", listing.len());
/// }
/// # Ok(())
/// # }
/// ```

use crate::models::task::TaskWithUsers;
use crate::models::user::UserRole;
use crate::redis::client::RedisClient;
use redis::AsyncCommands;

/// Cache TTL for admin listings (seconds)
const ADMIN_TTL_SECS: u64 = 180;

/// Cache TTL for regular-user listings (seconds)
const USER_TTL_SECS: u64 = 300;

/// Redis-backed task-listing cache keyed by `(user_id, role)`
#[derive(Clone)]
pub struct ListingCache {
    client: RedisClient,
}

impl ListingCache {
    /// Creates a cache on top of an existing Redis client
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// The underlying Redis client (used for health checks)
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    /// Derives the cache key for a `(user_id, role)` pair
    pub fn listing_key(user_id: i64, role: UserRole) -> String {
        format!("tasks:listing:{}:{}", role.as_str(), user_id)
    }

    /// Time-to-live for a listing entry, by role
    pub fn ttl_secs(role: UserRole) -> u64 {
        match role {
            UserRole::Admin => ADMIN_TTL_SECS,
            UserRole::User => USER_TTL_SECS,
        }
    }

    /// Looks up the cached listing for an actor
    ///
    /// Returns None on miss, on an unreadable entry, or when the cache
    /// backend is unavailable (degrading to a storage read).
    pub async fn get(&self, user_id: i64, role: UserRole) -> Option<Vec<TaskWithUsers>> {
        let key = Self::listing_key(user_id, role);
        let mut conn = self.client.get_connection();

        let cached: Option<String> = match conn.get(&key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, "Cache read failed, falling back to storage: {}", e);
                return None;
            }
        };

        let raw = cached?;
        match serde_json::from_str(&raw) {
            Ok(listing) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(listing)
            }
            Err(e) => {
                tracing::warn!(key = %key, "Discarding undecodable cache entry: {}", e);
                None
            }
        }
    }

    /// Stores a listing for an actor with the role-dependent TTL
    pub async fn put(&self, user_id: i64, role: UserRole, listing: &[TaskWithUsers]) {
        let key = Self::listing_key(user_id, role);

        let serialized = match serde_json::to_string(listing) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(key = %key, "Failed to serialize listing for cache: {}", e);
                return;
            }
        };

        let mut conn = self.client.get_connection();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(&key, serialized, Self::ttl_secs(role))
            .await
        {
            tracing::warn!(key = %key, "Cache write failed: {}", e);
        }
    }

    /// Evicts the listing entry for an actor
    ///
    /// Called after every mutation by that actor. Eviction failure is
    /// logged and ignored; the entry expires by TTL anyway.
    pub async fn evict(&self, user_id: i64, role: UserRole) {
        let key = Self::listing_key(user_id, role);

        let mut conn = self.client.get_connection();
        if let Err(e) = conn.del::<_, ()>(&key).await {
            tracing::warn!(key = %key, "Cache eviction failed: {}", e);
        } else {
            tracing::debug!(key = %key, "Cache entry evicted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_key_shape() {
        assert_eq!(
            ListingCache::listing_key(42, UserRole::Admin),
            "tasks:listing:admin:42"
        );
        assert_eq!(
            ListingCache::listing_key(7, UserRole::User),
            "tasks:listing:user:7"
        );
    }

    #[test]
    fn test_admin_ttl_shorter_than_user_ttl() {
        assert!(ListingCache::ttl_secs(UserRole::Admin) < ListingCache::ttl_secs(UserRole::User));
        assert_eq!(ListingCache::ttl_secs(UserRole::Admin), 180);
        assert_eq!(ListingCache::ttl_secs(UserRole::User), 300);
    }
}
