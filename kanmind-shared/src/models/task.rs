/// Task model, status/priority enums, and reviewer sets
///
/// Tasks live on a board and are deleted with it. Each task has exactly one
/// assignee and zero or more reviewers; both must be the board owner or a
/// board member, enforced at the route layer before any write.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('to-do', 'in-progress', 'review', 'done');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status task_status NOT NULL DEFAULT 'to-do',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     assignee_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     due_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_reviewers (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     PRIMARY KEY (task_id, user_id)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::policy::{BoardScope, TaskScope};
use crate::models::user::UserShort;

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    /// Not yet started
    #[serde(rename = "to-do")]
    #[sqlx(rename = "to-do")]
    ToDo,

    /// Being worked on
    #[serde(rename = "in-progress")]
    #[sqlx(rename = "in-progress")]
    InProgress,

    /// Awaiting review
    #[serde(rename = "review")]
    #[sqlx(rename = "review")]
    Review,

    /// Completed
    #[serde(rename = "done")]
    #[sqlx(rename = "done")]
    Done,
}

impl TaskStatus {
    /// Returns the wire/database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "to-do",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }
}

/// Task priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    /// Returns the wire/database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID (UUID v4)
    pub id: Uuid,

    /// Board this task belongs to
    pub board_id: Uuid,

    /// Task title
    pub title: String,

    /// Free-form description (empty string when not provided)
    pub description: String,

    /// Workflow status
    pub status: TaskStatus,

    /// Priority level
    pub priority: TaskPriority,

    /// The single assignee
    pub assignee_id: Uuid,

    /// Optional due date (date only, no time component)
    pub due_date: Option<NaiveDate>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Task projection annotated with its comment count
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskWithCommentCount {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Uuid,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Number of comments on the task, computed at read time
    pub comments_count: i64,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub board_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Uuid,
    pub due_date: Option<NaiveDate>,
}

/// Input for updating a task (None means "leave unchanged")
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    /// `Some(None)` clears the due date, `None` leaves it unchanged
    pub due_date: Option<Option<NaiveDate>>,
}

const TASK_COLUMNS: &str = r#"
    t.id,
    t.board_id,
    t.title,
    t.description,
    t.status,
    t.priority,
    t.assignee_id,
    t.due_date,
    t.created_at,
    t.updated_at,
    (SELECT COUNT(*) FROM comments c WHERE c.task_id = t.id) AS comments_count
"#;

impl Task {
    /// Creates a new task
    ///
    /// Runs inside a caller-provided transaction so the task row and its
    /// reviewer set commit together.
    pub async fn create(conn: &mut PgConnection, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (board_id, title, description, status, priority, assignee_id, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, board_id, title, description, status, priority,
                      assignee_id, due_date, created_at, updated_at
            "#,
        )
        .bind(data.board_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.assignee_id)
        .bind(data.due_date)
        .fetch_one(conn)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, board_id, title, description, status, priority,
                   assignee_id, due_date, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task with its comment count
    pub async fn find_with_comment_count(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<TaskWithCommentCount>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = $1");

        let task = sqlx::query_as::<_, TaskWithCommentCount>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists tasks on a board with comment counts, oldest first
    pub async fn list_by_board(
        pool: &PgPool,
        board_id: Uuid,
    ) -> Result<Vec<TaskWithCommentCount>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.board_id = $1 ORDER BY t.created_at ASC"
        );

        let tasks = sqlx::query_as::<_, TaskWithCommentCount>(&query)
            .bind(board_id)
            .fetch_all(pool)
            .await?;

        Ok(tasks)
    }

    /// Lists tasks assigned to a user, across all boards
    pub async fn list_assigned_to(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<TaskWithCommentCount>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.assignee_id = $1 ORDER BY t.created_at ASC"
        );

        let tasks = sqlx::query_as::<_, TaskWithCommentCount>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(tasks)
    }

    /// Lists tasks where a user is a reviewer, across all boards
    pub async fn list_reviewing(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<TaskWithCommentCount>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks t
            JOIN task_reviewers r ON r.task_id = t.id
            WHERE r.user_id = $1
            ORDER BY t.created_at ASC
            "#
        );

        let tasks = sqlx::query_as::<_, TaskWithCommentCount>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(tasks)
    }

    /// Updates a task, changing only the fields that are set
    ///
    /// Runs inside a caller-provided transaction so field updates and a
    /// reviewer-set replacement commit together.
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                assignee_id = COALESCE($6, assignee_id),
                due_date = CASE WHEN $7 THEN $8 ELSE due_date END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, board_id, title, description, status, priority,
                      assignee_id, due_date, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.assignee_id)
        .bind(data.due_date.is_some())
        .bind(data.due_date.flatten())
        .fetch_optional(conn)
        .await?;

        Ok(task)
    }

    /// Replaces the task's reviewer set
    ///
    /// Duplicates in the input collapse via `ON CONFLICT DO NOTHING`. Runs
    /// inside a caller-provided transaction.
    pub async fn replace_reviewers(
        conn: &mut PgConnection,
        task_id: Uuid,
        reviewer_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_reviewers WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *conn)
            .await?;

        if !reviewer_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO task_reviewers (task_id, user_id)
                SELECT $1, unnest($2::uuid[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(task_id)
            .bind(reviewer_ids)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Lists the task's reviewers as short profiles
    pub async fn reviewers_short(
        pool: &PgPool,
        task_id: Uuid,
    ) -> Result<Vec<UserShort>, sqlx::Error> {
        let reviewers = sqlx::query_as::<_, UserShort>(
            r#"
            SELECT u.id, u.email, u.fullname
            FROM task_reviewers r
            JOIN users u ON u.id = r.user_id
            WHERE r.task_id = $1
            ORDER BY u.fullname ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(reviewers)
    }

    /// Deletes a task by ID
    ///
    /// Cascades reviewer rows and comments.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads the authorization scope for a task
    ///
    /// Bundles the task's assignee, reviewer set, and enclosing board scope
    /// in one query. Returns `None` when the task does not exist.
    pub async fn load_scope(pool: &PgPool, task_id: Uuid) -> Result<Option<TaskScope>, sqlx::Error> {
        let row = sqlx::query_as::<_, ScopeRow>(
            r#"
            SELECT
                t.id AS task_id,
                t.assignee_id,
                b.id AS board_id,
                b.owner_id,
                COALESCE(
                    (SELECT array_agg(m.user_id) FROM board_members m WHERE m.board_id = b.id),
                    ARRAY[]::uuid[]
                ) AS member_ids,
                COALESCE(
                    (SELECT array_agg(r.user_id) FROM task_reviewers r WHERE r.task_id = t.id),
                    ARRAY[]::uuid[]
                ) AS reviewer_ids
            FROM tasks t
            JOIN boards b ON b.id = t.board_id
            WHERE t.id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| TaskScope {
            task_id: r.task_id,
            board: BoardScope {
                board_id: r.board_id,
                owner_id: r.owner_id,
                member_ids: r.member_ids,
            },
            assignee_id: r.assignee_id,
            reviewer_ids: r.reviewer_ids,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct ScopeRow {
    task_id: Uuid,
    assignee_id: Uuid,
    board_id: Uuid,
    owner_id: Uuid,
    member_ids: Vec<Uuid>,
    reviewer_ids: Vec<Uuid>,
}
