// Repository pattern - isolates all database side effects
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;
use std::sync::Arc;

use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// A post row joined with everything a feed needs: the author's username,
/// the like count, and whether the viewer has liked it.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub post: Post,
    pub author_username: String,
    pub likes: i64,
    pub liked: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct LikeState {
    pub likes: i64,
    pub liked: bool,
}

/// Which posts a feed query selects.
#[derive(Debug, Clone, Copy)]
pub enum FeedFilter<'a> {
    /// Every post.
    All,
    /// Posts authored by anyone the viewer follows.
    Following { viewer_id: &'a str },
    /// Posts by a single author.
    Author { author_id: &'a str },
}

/// Post storage operations.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, author_id: &str, content: &str) -> AppResult<Post>;

    async fn get(&self, post_id: i64) -> AppResult<Option<Post>>;

    /// Load one post with its feed metadata, relative to `viewer`.
    async fn record(&self, post_id: i64, viewer: Option<&str>) -> AppResult<Option<PostRecord>>;

    /// Replace the content and bump the edited timestamp.
    async fn update_content(&self, post_id: i64, content: &str) -> AppResult<()>;

    async fn delete(&self, post_id: i64) -> AppResult<bool>;

    /// Flip the viewer's membership in the post's liker set.
    /// Runs inside an immediate transaction so concurrent toggles by the
    /// same user serialize instead of losing updates.
    async fn toggle_like(&self, post_id: i64, user_id: &str) -> AppResult<LikeState>;

    /// Total number of posts the filter selects.
    async fn count(&self, filter: FeedFilter<'_>) -> AppResult<usize>;

    /// One page of posts, newest first.
    async fn page(
        &self,
        filter: FeedFilter<'_>,
        viewer: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<PostRecord>>;
}

/// SQLite implementation
pub struct SqlitePostRepository {
    pool: DbPool,
}

impl SqlitePostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const RECORD_COLUMNS: &str = "p.id, p.author_id, p.content, p.created_at, p.edited_at, u.username, \
     (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id), \
     EXISTS(SELECT 1 FROM post_likes pl WHERE pl.post_id = p.id AND pl.user_id = ?1)";

fn map_record(row: &rusqlite::Row<'_>) -> Result<PostRecord, rusqlite::Error> {
    Ok(PostRecord {
        post: Post {
            id: row.get(0)?,
            author_id: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            edited_at: row.get(4)?,
        },
        author_username: row.get(5)?,
        likes: row.get(6)?,
        liked: row.get(7)?,
    })
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create(&self, author_id: &str, content: &str) -> AppResult<Post> {
        let conn = self.pool.get()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO posts (author_id, content, created_at, edited_at) VALUES (?1, ?2, ?3, ?3)",
            params![author_id, content, now],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Post {
            id,
            author_id: author_id.to_string(),
            content: content.to_string(),
            created_at: now.clone(),
            edited_at: now,
        })
    }

    async fn get(&self, post_id: i64) -> AppResult<Option<Post>> {
        let conn = self.pool.get()?;
        let result = conn.query_row(
            "SELECT id, author_id, content, created_at, edited_at FROM posts WHERE id = ?1",
            params![post_id],
            |row| {
                Ok(Post {
                    id: row.get(0)?,
                    author_id: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                    edited_at: row.get(4)?,
                })
            },
        );
        match result {
            Ok(post) => Ok(Some(post)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn record(&self, post_id: i64, viewer: Option<&str>) -> AppResult<Option<PostRecord>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM posts p \
             JOIN users u ON u.id = p.author_id \
             WHERE p.id = ?2"
        );
        let result = conn.query_row(&sql, params![viewer, post_id], map_record);
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_content(&self, post_id: i64, content: &str) -> AppResult<()> {
        let conn = self.pool.get()?;
        let now = Utc::now().to_rfc3339();
        let rows = conn.execute(
            "UPDATE posts SET content = ?1, edited_at = ?2 WHERE id = ?3",
            params![content, now, post_id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, post_id: i64) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
        Ok(rows > 0)
    }

    async fn toggle_like(&self, post_id: i64, user_id: &str) -> AppResult<LikeState> {
        let conn = self.pool.get()?;

        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: AppResult<LikeState> = (|| {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
                params![post_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(AppError::NotFound);
            }

            let removed = conn.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
            )?;
            let liked = if removed == 0 {
                conn.execute(
                    "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                    params![post_id, user_id],
                )?;
                true
            } else {
                false
            };

            let likes: i64 = conn.query_row(
                "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
                params![post_id],
                |row| row.get(0),
            )?;

            Ok(LikeState { likes, liked })
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

    async fn count(&self, filter: FeedFilter<'_>) -> AppResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = match filter {
            FeedFilter::All => {
                conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?
            }
            FeedFilter::Following { viewer_id } => conn.query_row(
                "SELECT COUNT(*) FROM posts p \
                 JOIN follows f ON f.following_id = p.author_id AND f.follower_id = ?1",
                params![viewer_id],
                |row| row.get(0),
            )?,
            FeedFilter::Author { author_id } => conn.query_row(
                "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
                params![author_id],
                |row| row.get(0),
            )?,
        };
        Ok(count as usize)
    }

    async fn page(
        &self,
        filter: FeedFilter<'_>,
        viewer: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<PostRecord>> {
        let conn = self.pool.get()?;
        let limit = limit as i64;
        let offset = offset as i64;

        let rows = match filter {
            FeedFilter::All => {
                let sql = format!(
                    "SELECT {RECORD_COLUMNS} FROM posts p \
                     JOIN users u ON u.id = p.author_id \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT ?2 OFFSET ?3"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![viewer, limit, offset], map_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            FeedFilter::Following { viewer_id } => {
                let sql = format!(
                    "SELECT {RECORD_COLUMNS} FROM posts p \
                     JOIN users u ON u.id = p.author_id \
                     JOIN follows f ON f.following_id = p.author_id AND f.follower_id = ?2 \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT ?3 OFFSET ?4"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![viewer, viewer_id, limit, offset], map_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            FeedFilter::Author { author_id } => {
                let sql = format!(
                    "SELECT {RECORD_COLUMNS} FROM posts p \
                     JOIN users u ON u.id = p.author_id \
                     WHERE p.author_id = ?2 \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT ?3 OFFSET ?4"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![viewer, author_id, limit, offset], map_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(rows)
    }
}

/// Type alias for Arc-wrapped repository (for AppState)
pub type DynPostRepository = Arc<dyn PostRepository>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::users;

    fn create_test_repo() -> (SqlitePostRepository, DbPool) {
        let pool = db::test_pool();
        (SqlitePostRepository::new(pool.clone()), pool)
    }

    fn seed_user(pool: &DbPool, name: &str) -> String {
        users::create(pool, name, "test@example.com", "hash")
            .unwrap()
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_sets_both_timestamps() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");

        let post = repo.create(&alice, "hello").await.unwrap();
        assert_eq!(post.content, "hello");
        assert_eq!(post.created_at, post.edited_at);
        assert!(post.id > 0);
    }

    #[tokio::test]
    async fn edit_bumps_edited_at_but_not_created_at() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");

        let post = repo.create(&alice, "first").await.unwrap();
        repo.update_content(post.id, "second").await.unwrap();

        let updated = repo.get(post.id).await.unwrap().unwrap();
        assert_eq!(updated.content, "second");
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.edited_at >= updated.created_at);
    }

    #[tokio::test]
    async fn update_unknown_post_is_not_found() {
        let (repo, _pool) = create_test_repo();
        let err = repo.update_content(999, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn toggle_like_twice_restores_original_state() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        let post = repo.create(&alice, "hello").await.unwrap();

        let first = repo.toggle_like(post.id, &bob).await.unwrap();
        assert!(first.liked);
        assert_eq!(first.likes, 1);

        let second = repo.toggle_like(post.id, &bob).await.unwrap();
        assert!(!second.liked);
        assert_eq!(second.likes, 0);
    }

    #[tokio::test]
    async fn toggle_like_on_unknown_post_is_not_found() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let err = repo.toggle_like(42, &alice).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn record_reflects_viewer() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        let post = repo.create(&alice, "hello").await.unwrap();
        repo.toggle_like(post.id, &bob).await.unwrap();

        let for_bob = repo.record(post.id, Some(&bob)).await.unwrap().unwrap();
        assert_eq!(for_bob.likes, 1);
        assert!(for_bob.liked);
        assert_eq!(for_bob.author_username, "alice");

        let for_alice = repo.record(post.id, Some(&alice)).await.unwrap().unwrap();
        assert!(!for_alice.liked);

        let anonymous = repo.record(post.id, None).await.unwrap().unwrap();
        assert_eq!(anonymous.likes, 1);
        assert!(!anonymous.liked);
    }

    #[tokio::test]
    async fn page_all_is_newest_first() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        for i in 0..3 {
            repo.create(&alice, &format!("post {}", i)).await.unwrap();
        }

        let page = repo.page(FeedFilter::All, None, 10, 0).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].post.content, "post 2");
        assert_eq!(page[2].post.content, "post 0");
    }

    #[tokio::test]
    async fn page_respects_limit_and_offset() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        for i in 0..15 {
            repo.create(&alice, &format!("post {}", i)).await.unwrap();
        }

        assert_eq!(repo.count(FeedFilter::All).await.unwrap(), 15);
        let first = repo.page(FeedFilter::All, None, 10, 0).await.unwrap();
        assert_eq!(first.len(), 10);
        let second = repo.page(FeedFilter::All, None, 10, 10).await.unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[4].post.content, "post 0");
    }

    #[tokio::test]
    async fn following_feed_only_shows_followed_authors() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        let carol = seed_user(&pool, "carol");

        repo.create(&bob, "from bob").await.unwrap();
        repo.create(&carol, "from carol").await.unwrap();

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO follows (follower_id, following_id) VALUES (?1, ?2)",
            params![alice, bob],
        )
        .unwrap();
        drop(conn);

        let filter = FeedFilter::Following { viewer_id: &alice };
        assert_eq!(repo.count(filter).await.unwrap(), 1);
        let page = repo.page(filter, Some(&alice), 10, 0).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].author_username, "bob");
    }

    #[tokio::test]
    async fn author_feed_filters_by_author() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        repo.create(&alice, "mine").await.unwrap();
        repo.create(&bob, "theirs").await.unwrap();

        let filter = FeedFilter::Author { author_id: &alice };
        assert_eq!(repo.count(filter).await.unwrap(), 1);
        let page = repo.page(filter, None, 10, 0).await.unwrap();
        assert_eq!(page[0].post.content, "mine");
    }

    #[tokio::test]
    async fn delete_removes_post_and_likes() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        let post = repo.create(&alice, "hello").await.unwrap();
        repo.toggle_like(post.id, &bob).await.unwrap();

        assert!(repo.delete(post.id).await.unwrap());
        assert!(repo.get(post.id).await.unwrap().is_none());

        let conn = pool.get().unwrap();
        let likes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
                params![post.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(likes, 0);
        drop(conn);

        // Second delete is a no-op
        assert!(!repo.delete(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_author_cascades_to_posts() {
        let (repo, pool) = create_test_repo();
        let alice = seed_user(&pool, "alice");
        repo.create(&alice, "one").await.unwrap();
        repo.create(&alice, "two").await.unwrap();

        users::delete(&pool, &alice).unwrap();
        assert_eq!(repo.count(FeedFilter::All).await.unwrap(), 0);
    }
}
