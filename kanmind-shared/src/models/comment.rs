/// Comment model
///
/// Comments form a flat thread under a task, deleted with it. The author is
/// recorded from the authenticated actor at creation time and can never be
/// supplied by the client.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::policy::CommentScope;
use crate::models::task::Task;

/// Comment model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    /// Unique comment ID (UUID v4)
    pub id: Uuid,

    /// Task this comment belongs to
    pub task_id: Uuid,

    /// The authenticated user who wrote the comment
    pub author_id: Uuid,

    /// Comment text
    pub content: String,

    /// When the comment was created
    pub created_at: DateTime<Utc>,
}

/// Comment projection with the author's display name, for list payloads
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    /// Comment ID
    pub id: Uuid,

    /// When the comment was created
    pub created_at: DateTime<Utc>,

    /// Author's display name
    pub author: String,

    /// Comment text
    pub content: String,
}

impl Comment {
    /// Creates a new comment authored by `author_id`
    pub async fn create(
        pool: &PgPool,
        task_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, author_id, content, created_at
            "#,
        )
        .bind(task_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// Finds a comment by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, author_id, content, created_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    /// Finds a comment with its author's display name
    pub async fn find_with_author(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<CommentWithAuthor>, sqlx::Error> {
        let comment = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.created_at, u.fullname AS author, c.content
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    /// Lists the comments on a task, newest first
    pub async fn list_by_task(
        pool: &PgPool,
        task_id: Uuid,
    ) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.created_at, u.fullname AS author, c.content
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.task_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// Deletes a comment by ID
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads the authorization scope for a comment
    ///
    /// Returns `None` when the comment does not exist or is not attached to
    /// the given task, so a comment id from another task's thread reads as
    /// 404 rather than leaking its existence.
    pub async fn load_scope(
        pool: &PgPool,
        task_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<CommentScope>, sqlx::Error> {
        let row = sqlx::query_as::<_, ScopeRow>(
            r#"
            SELECT c.id AS comment_id, c.author_id, c.task_id
            FROM comments c
            WHERE c.id = $1 AND c.task_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(task_id)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let Some(task) = Task::load_scope(pool, row.task_id).await? else {
            return Ok(None);
        };

        Ok(Some(CommentScope {
            comment_id: row.comment_id,
            author_id: row.author_id,
            task,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct ScopeRow {
    comment_id: Uuid,
    author_id: Uuid,
    task_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_with_author_serialization() {
        let comment = CommentWithAuthor {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            author: "Ada Lovelace".to_string(),
            content: "Looks good to me".to_string(),
        };

        let json = serde_json::to_value(&comment).expect("Serialization should succeed");
        assert_eq!(json["author"], "Ada Lovelace");
        assert_eq!(json["content"], "Looks good to me");
    }

    // Integration tests for database operations are in kanmind-api/tests/
}
