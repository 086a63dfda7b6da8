/// Board model, membership, and annotated count queries
///
/// A board belongs to exactly one owner and carries a set of explicit
/// members. Ownership is NOT membership: the owner appears in
/// `member_count` and the members list only when also inserted into
/// `board_members`. Access checks treat the two roles separately via
/// [`BoardScope`](crate::auth::policy::BoardScope).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE board_members (
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     PRIMARY KEY (board_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::policy::BoardScope;
use crate::models::user::UserShort;

/// Board model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    /// Unique board ID (UUID v4)
    pub id: Uuid,

    /// Board title
    pub title: String,

    /// Owner (the user who created the board)
    pub owner_id: Uuid,

    /// When the board was created
    pub created_at: DateTime<Utc>,

    /// When the board was last updated
    pub updated_at: DateTime<Utc>,
}

/// Board projection annotated with aggregate counts
///
/// Counts are computed in SQL at read time, never stored:
///
/// - `member_count`: explicit members (the owner is not counted unless
///   also a member)
/// - `ticket_count`: all tasks on the board
/// - `tasks_to_do_count`: tasks with status `to-do`
/// - `tasks_high_prio_count`: tasks with priority `high`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardWithCounts {
    /// Board ID
    pub id: Uuid,

    /// Board title
    pub title: String,

    /// Owner user ID
    pub owner_id: Uuid,

    /// Number of explicit members
    pub member_count: i64,

    /// Total number of tasks
    pub ticket_count: i64,

    /// Number of tasks in `to-do` status
    pub tasks_to_do_count: i64,

    /// Number of tasks with `high` priority
    pub tasks_high_prio_count: i64,
}

const COUNT_COLUMNS: &str = r#"
    b.id,
    b.title,
    b.owner_id,
    (SELECT COUNT(*) FROM board_members m WHERE m.board_id = b.id) AS member_count,
    (SELECT COUNT(*) FROM tasks t WHERE t.board_id = b.id) AS ticket_count,
    (SELECT COUNT(*) FROM tasks t WHERE t.board_id = b.id AND t.status = 'to-do') AS tasks_to_do_count,
    (SELECT COUNT(*) FROM tasks t WHERE t.board_id = b.id AND t.priority = 'high') AS tasks_high_prio_count
"#;

impl Board {
    /// Creates a new board owned by `owner_id`
    ///
    /// Runs inside a caller-provided transaction so that the board row and
    /// its initial membership commit or roll back together.
    pub async fn create(
        conn: &mut PgConnection,
        owner_id: Uuid,
        title: &str,
    ) -> Result<Self, sqlx::Error> {
        let board = sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (title, owner_id)
            VALUES ($1, $2)
            RETURNING id, title, owner_id, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(owner_id)
        .fetch_one(conn)
        .await?;

        Ok(board)
    }

    /// Finds a board by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let board = sqlx::query_as::<_, Board>(
            r#"
            SELECT id, title, owner_id, created_at, updated_at
            FROM boards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(board)
    }

    /// Finds a board with its aggregate counts
    pub async fn find_with_counts(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<BoardWithCounts>, sqlx::Error> {
        let query = format!("SELECT {COUNT_COLUMNS} FROM boards b WHERE b.id = $1");

        let board = sqlx::query_as::<_, BoardWithCounts>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(board)
    }

    /// Lists boards visible to a user, with aggregate counts
    ///
    /// A board is visible when the user owns it or is an explicit member.
    /// Ordered by creation time, oldest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<BoardWithCounts>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {COUNT_COLUMNS}
            FROM boards b
            WHERE b.owner_id = $1
               OR EXISTS (
                   SELECT 1 FROM board_members m
                   WHERE m.board_id = b.id AND m.user_id = $1
               )
            ORDER BY b.created_at ASC
            "#
        );

        let boards = sqlx::query_as::<_, BoardWithCounts>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(boards)
    }

    /// Replaces the board's member set
    ///
    /// Deletes the existing membership rows and inserts the given ids.
    /// Duplicates in the input collapse via `ON CONFLICT DO NOTHING`. Runs
    /// inside a caller-provided transaction.
    pub async fn replace_members(
        conn: &mut PgConnection,
        board_id: Uuid,
        member_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM board_members WHERE board_id = $1")
            .bind(board_id)
            .execute(&mut *conn)
            .await?;

        if !member_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO board_members (board_id, user_id)
                SELECT $1, unnest($2::uuid[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(board_id)
            .bind(member_ids)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Lists the board's members as short profiles
    ///
    /// Ordered by fullname for stable output. The owner is included only
    /// when also a member.
    pub async fn members_short(
        pool: &PgPool,
        board_id: Uuid,
    ) -> Result<Vec<UserShort>, sqlx::Error> {
        let members = sqlx::query_as::<_, UserShort>(
            r#"
            SELECT u.id, u.email, u.fullname
            FROM board_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.board_id = $1
            ORDER BY u.fullname ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Updates the board title
    pub async fn update_title(
        conn: &mut PgConnection,
        board_id: Uuid,
        title: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let board = sqlx::query_as::<_, Board>(
            r#"
            UPDATE boards
            SET title = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, owner_id, created_at, updated_at
            "#,
        )
        .bind(board_id)
        .bind(title)
        .fetch_optional(conn)
        .await?;

        Ok(board)
    }

    /// Deletes a board by ID
    ///
    /// Cascades membership rows, tasks, reviewer sets, and comments.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads the authorization scope for a board
    ///
    /// Returns `None` when the board does not exist, which callers map to
    /// 404 before any access decision is made.
    pub async fn load_scope(
        pool: &PgPool,
        board_id: Uuid,
    ) -> Result<Option<BoardScope>, sqlx::Error> {
        let row = sqlx::query_as::<_, ScopeRow>(
            r#"
            SELECT
                b.id AS board_id,
                b.owner_id,
                COALESCE(
                    (SELECT array_agg(m.user_id) FROM board_members m WHERE m.board_id = b.id),
                    ARRAY[]::uuid[]
                ) AS member_ids
            FROM boards b
            WHERE b.id = $1
            "#,
        )
        .bind(board_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| BoardScope {
            board_id: r.board_id,
            owner_id: r.owner_id,
            member_ids: r.member_ids,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct ScopeRow {
    board_id: Uuid,
    owner_id: Uuid,
    member_ids: Vec<Uuid>,
}
