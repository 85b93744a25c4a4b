// Follow-graph storage - explicit queries, no implicit reverse relations
use async_trait::async_trait;
use rusqlite::params;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Follow state of one target user, as seen after a toggle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FollowState {
    pub is_following: bool,
    pub followers_count: i64,
    pub following_count: i64,
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Does a (follower -> following) edge exist?
    async fn is_following(&self, follower_id: &str, following_id: &str) -> AppResult<bool>;

    /// Flip the (follower -> following) edge: delete it if present, create
    /// it otherwise. Runs inside an immediate transaction. Returns the new
    /// state plus the target's updated counts.
    async fn toggle(&self, follower_id: &str, following_id: &str) -> AppResult<FollowState>;

    /// Users who follow `user_id`.
    async fn count_followers(&self, user_id: &str) -> AppResult<i64>;

    /// Users `user_id` follows.
    async fn count_following(&self, user_id: &str) -> AppResult<i64>;

    async fn list_followers(&self, user_id: &str) -> AppResult<Vec<String>>;

    async fn list_following(&self, user_id: &str) -> AppResult<Vec<String>>;
}

/// SQLite implementation
pub struct SqliteFollowRepository {
    pool: DbPool,
}

impl SqliteFollowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowRepository for SqliteFollowRepository {
    async fn is_following(&self, follower_id: &str, following_id: &str) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM follows WHERE follower_id = ?1 AND following_id = ?2",
            params![follower_id, following_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn toggle(&self, follower_id: &str, following_id: &str) -> AppResult<FollowState> {
        if follower_id == following_id {
            return Err(AppError::BadRequest(
                "Users cannot follow themselves.".to_string(),
            ));
        }

        let conn = self.pool.get()?;

        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: AppResult<FollowState> = (|| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                params![follower_id, following_id],
            )?;
            let is_following = if removed == 0 {
                conn.execute(
                    "INSERT INTO follows (follower_id, following_id) VALUES (?1, ?2)",
                    params![follower_id, following_id],
                )?;
                true
            } else {
                false
            };

            let followers_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
                params![following_id],
                |row| row.get(0),
            )?;
            let following_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
                params![following_id],
                |row| row.get(0),
            )?;

            Ok(FollowState {
                is_following,
                followers_count,
                following_count,
            })
        })();

        match result {
            Ok(state) => {
                conn.execute("COMMIT", [])?;
                Ok(state)
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e)
            }
        }
    }

    async fn count_followers(&self, user_id: &str) -> AppResult<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn count_following(&self, user_id: &str) -> AppResult<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn list_followers(&self, user_id: &str) -> AppResult<Vec<String>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT u.username FROM follows f \
             JOIN users u ON u.id = f.follower_id \
             WHERE f.following_id = ?1 ORDER BY u.username",
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_following(&self, user_id: &str) -> AppResult<Vec<String>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT u.username FROM follows f \
             JOIN users u ON u.id = f.following_id \
             WHERE f.follower_id = ?1 ORDER BY u.username",
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Type alias for Arc-wrapped repository (for AppState)
pub type DynFollowRepository = Arc<dyn FollowRepository>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::users;

    fn create_test_repo() -> (SqliteFollowRepository, DbPool) {
        let pool = db::test_pool();
        (SqliteFollowRepository::new(pool.clone()), pool)
    }

    fn seed_user(pool: &DbPool, name: &str) -> String {
        users::create(pool, name, "test@example.com", "hash")
            .unwrap()
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn toggle_creates_then_removes_edge() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");

        let on = repo.toggle(&alice, &bob).await.unwrap();
        assert!(on.is_following);
        assert_eq!(on.followers_count, 1);
        assert_eq!(on.following_count, 0);
        assert!(repo.is_following(&alice, &bob).await.unwrap());

        let off = repo.toggle(&alice, &bob).await.unwrap();
        assert!(!off.is_following);
        assert_eq!(off.followers_count, 0);
        assert!(!repo.is_following(&alice, &bob).await.unwrap());
    }

    #[tokio::test]
    async fn self_follow_is_rejected_in_any_state() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");

        let err = repo.toggle(&alice, &alice).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn edges_are_directed() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");

        repo.toggle(&alice, &bob).await.unwrap();
        assert!(repo.is_following(&alice, &bob).await.unwrap());
        assert!(!repo.is_following(&bob, &alice).await.unwrap());
    }

    #[tokio::test]
    async fn counts_and_lists_agree() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        let carol = seed_user(&pool, "carol");

        repo.toggle(&alice, &bob).await.unwrap();
        repo.toggle(&carol, &bob).await.unwrap();
        repo.toggle(&bob, &alice).await.unwrap();

        assert_eq!(repo.count_followers(&bob).await.unwrap(), 2);
        assert_eq!(repo.count_following(&bob).await.unwrap(), 1);
        assert_eq!(
            repo.list_followers(&bob).await.unwrap(),
            vec!["alice".to_string(), "carol".to_string()]
        );
        assert_eq!(
            repo.list_following(&bob).await.unwrap(),
            vec!["alice".to_string()]
        );
    }

    #[tokio::test]
    async fn deleting_user_removes_their_edges() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");

        repo.toggle(&alice, &bob).await.unwrap();
        repo.toggle(&bob, &alice).await.unwrap();

        users::delete(&pool, &bob).unwrap();
        assert_eq!(repo.count_followers(&alice).await.unwrap(), 0);
        assert_eq!(repo.count_following(&alice).await.unwrap(), 0);
    }
}
