/// Task endpoints
///
/// Tasks are created against a board the actor can contribute to, then
/// guarded by task-level policies: retrieve/update for the assignee or a
/// reviewer, delete for the assignee or the board owner.
///
/// # Endpoints
///
/// - `POST   /v1/tasks` - Create a task on a board
/// - `GET    /v1/tasks/:id` - Task detail
/// - `PATCH  /v1/tasks/:id` - Partial update
/// - `DELETE /v1/tasks/:id` - Delete
/// - `GET    /v1/tasks/assigned-to-me` - Tasks where the actor is assignee
/// - `GET    /v1/tasks/reviewing` - Tasks where the actor is a reviewer

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use kanmind_shared::{
    auth::{
        middleware::AuthContext,
        policy::{self, BoardScope},
    },
    models::{
        board::Board,
        task::{CreateTask, Task, TaskPriority, TaskStatus, TaskWithCommentCount, UpdateTask},
        user::UserShort,
    },
};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Reviewer ids, accepting a list, a single UUID string, or a
/// comma-separated string
///
/// Clients historically submitted reviewers as `"id1,id2"`; the structured
/// list form is the preferred encoding.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewerIds(pub Vec<Uuid>);

impl<'de> Deserialize<'de> for ReviewerIds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Many(Vec<Uuid>),
            One(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Many(ids) => Ok(ReviewerIds(ids)),
            Raw::One(s) => {
                let ids = s
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| {
                        Uuid::parse_str(part).map_err(|_| {
                            serde::de::Error::custom(format!("Invalid reviewer id: {}", part))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ReviewerIds(ids))
            }
        }
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// `#[serde(default, deserialize_with = "double_option")]` yields `None` when
/// the field is missing and `Some(None)` when the client sends `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn default_status() -> TaskStatus {
    TaskStatus::ToDo
}

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Target board
    pub board: Uuid,

    /// Task title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Workflow status (defaults to `to-do`)
    #[serde(default = "default_status")]
    pub status: TaskStatus,

    /// Priority (defaults to `medium`)
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,

    /// The single assignee, must be the board owner or a member
    pub assignee_id: Uuid,

    /// Zero or more reviewers, each must be the board owner or a member
    #[serde(default)]
    pub reviewer_ids: ReviewerIds,

    /// Optional due date
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Partial task update (absent fields are left unchanged)
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New workflow status
    pub status: Option<TaskStatus>,

    /// New priority
    pub priority: Option<TaskPriority>,

    /// New assignee, must be the board owner or a member
    pub assignee_id: Option<Uuid>,

    /// Full reviewer-set replacement
    pub reviewer_ids: Option<ReviewerIds>,

    /// New due date; `null` clears it, absence leaves it unchanged
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

/// Task response with resolved profiles and comment count
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    /// Task ID
    pub id: Uuid,

    /// Board the task belongs to
    pub board: Uuid,

    /// Task title
    pub title: String,

    /// Free-form description
    pub description: String,

    /// Workflow status
    pub status: TaskStatus,

    /// Priority
    pub priority: TaskPriority,

    /// The assignee's short profile
    pub assignee: UserShort,

    /// Reviewer short profiles
    pub reviewers: Vec<UserShort>,

    /// Optional due date
    pub due_date: Option<NaiveDate>,

    /// Number of comments on the task
    pub comments_count: i64,
}

/// Resolves a task row into its response shape (assignee + reviewers)
pub(crate) async fn task_response(
    pool: &PgPool,
    task: TaskWithCommentCount,
) -> Result<TaskResponse, ApiError> {
    let assignee = sqlx::query_as::<_, UserShort>(
        "SELECT id, email, fullname FROM users WHERE id = $1",
    )
    .bind(task.assignee_id)
    .fetch_one(pool)
    .await?;

    let reviewers = Task::reviewers_short(pool, task.id).await?;

    Ok(TaskResponse {
        id: task.id,
        board: task.board_id,
        title: task.title,
        description: task.description,
        status: task.status,
        priority: task.priority,
        assignee,
        reviewers,
        due_date: task.due_date,
        comments_count: task.comments_count,
    })
}

/// Checks that the assignee and every reviewer belong to the board
///
/// Violations are field-scoped validation failures so the client can point
/// at the offending form field. Non-membership also covers ids that do not
/// exist at all.
fn validate_task_people(
    board: &BoardScope,
    assignee_id: Option<Uuid>,
    reviewer_ids: Option<&[Uuid]>,
) -> Result<(), ApiError> {
    if let Some(assignee_id) = assignee_id {
        if !board.is_owner_or_member(assignee_id) {
            return Err(ApiError::field_error(
                "assignee_id",
                "Assignee must be the board owner or a member",
            ));
        }
    }

    if let Some(reviewer_ids) = reviewer_ids {
        for reviewer_id in reviewer_ids {
            if !board.is_owner_or_member(*reviewer_id) {
                return Err(ApiError::field_error(
                    "reviewer_ids",
                    format!("Reviewer {} must be the board owner or a member", reviewer_id),
                ));
            }
        }
    }

    Ok(())
}

/// Create task handler
///
/// # Errors
///
/// - `404 Not Found`: Board does not exist
/// - `403 Forbidden`: Actor is neither owner nor member of the board
/// - `422 Unprocessable Entity`: Title invalid, or assignee/reviewers not on
///   the board (fields `assignee_id` / `reviewer_ids`)
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(validation_details(&e)))?;

    let board_scope = Board::load_scope(&state.db, req.board)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    policy::board_contribute().check(auth.user_id, &board_scope.clone().into())?;

    validate_task_people(
        &board_scope,
        Some(req.assignee_id),
        Some(&req.reviewer_ids.0),
    )?;

    let mut tx = state.db.begin().await?;

    let task = Task::create(
        &mut tx,
        CreateTask {
            board_id: req.board,
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            assignee_id: req.assignee_id,
            due_date: req.due_date,
        },
    )
    .await?;

    Task::replace_reviewers(&mut tx, task.id, &req.reviewer_ids.0).await?;

    tx.commit().await?;

    let task = Task::find_with_comment_count(&state.db, task.id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Task vanished after create".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(task_response(&state.db, task).await?),
    ))
}

/// Task detail handler
///
/// # Errors
///
/// - `404 Not Found`: Task does not exist
/// - `403 Forbidden`: Actor is neither assignee nor reviewer
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let scope = Task::load_scope(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    policy::task_access().check(auth.user_id, &scope.into())?;

    let task = Task::find_with_comment_count(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task_response(&state.db, task).await?))
}

/// Task update handler
///
/// Assignee/reviewer changes are validated against the board membership and
/// applied in the same transaction as the field updates. Concurrent updates
/// are last-writer-wins per field.
///
/// # Errors
///
/// - `404 Not Found`: Task does not exist
/// - `403 Forbidden`: Actor is neither assignee nor reviewer
/// - `422 Unprocessable Entity`: Invalid fields or non-member
///   assignee/reviewers
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(validation_details(&e)))?;

    let scope = Task::load_scope(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    policy::task_access().check(auth.user_id, &scope.clone().into())?;

    validate_task_people(
        &scope.board,
        req.assignee_id,
        req.reviewer_ids.as_ref().map(|r| r.0.as_slice()),
    )?;

    let mut tx = state.db.begin().await?;

    let task = Task::update(
        &mut tx,
        id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            assignee_id: req.assignee_id,
            due_date: req.due_date,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if let Some(reviewer_ids) = &req.reviewer_ids {
        Task::replace_reviewers(&mut tx, id, &reviewer_ids.0).await?;
    }

    tx.commit().await?;

    let task = Task::find_with_comment_count(&state.db, task.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task_response(&state.db, task).await?))
}

/// Task delete handler
///
/// # Errors
///
/// - `404 Not Found`: Task does not exist
/// - `403 Forbidden`: Actor is neither the assignee nor the board owner
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let scope = Task::load_scope(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    policy::task_delete().check(auth.user_id, &scope.into())?;

    Task::delete(&state.db, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Tasks assigned to the actor, across all boards
pub async fn assigned_to_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = Task::list_assigned_to(&state.db, auth.user_id).await?;

    let mut responses = Vec::with_capacity(tasks.len());
    for task in tasks {
        responses.push(task_response(&state.db, task).await?);
    }

    Ok(Json(responses))
}

/// Tasks the actor reviews, across all boards
pub async fn reviewing(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = Task::list_reviewing(&state.db, auth.user_id).await?;

    let mut responses = Vec::with_capacity(tasks.len());
    for task in tasks {
        responses.push(task_response(&state.db, task).await?);
    }

    Ok(Json(responses))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reviewer_ids_from_list() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let json = serde_json::json!([a, b]);

        let ids: ReviewerIds = serde_json::from_value(json).unwrap();
        assert_eq!(ids.0, vec![a, b]);
    }

    #[test]
    fn test_reviewer_ids_from_single_string() {
        let a = Uuid::new_v4();
        let json = serde_json::json!(a.to_string());

        let ids: ReviewerIds = serde_json::from_value(json).unwrap();
        assert_eq!(ids.0, vec![a]);
    }

    #[test]
    fn test_reviewer_ids_from_comma_separated() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let json = serde_json::json!(format!("{}, {}", a, b));

        let ids: ReviewerIds = serde_json::from_value(json).unwrap();
        assert_eq!(ids.0, vec![a, b]);
    }

    #[test]
    fn test_reviewer_ids_empty_string() {
        let ids: ReviewerIds = serde_json::from_value(serde_json::json!("")).unwrap();
        assert!(ids.0.is_empty());
    }

    #[test]
    fn test_reviewer_ids_rejects_garbage() {
        let result: Result<ReviewerIds, _> =
            serde_json::from_value(serde_json::json!("not-a-uuid"));
        assert!(result.is_err());
    }

    #[test]
    fn test_due_date_absent_vs_null() {
        let req: UpdateTaskRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.due_date, None);

        let req: UpdateTaskRequest = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        assert_eq!(req.due_date, Some(None));

        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"due_date": "2026-09-01"}"#).unwrap();
        assert_eq!(
            req.due_date,
            Some(Some(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()))
        );
    }

    #[test]
    fn test_validate_task_people_rejects_stranger() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let board = BoardScope {
            board_id: Uuid::new_v4(),
            owner_id: owner,
            member_ids: vec![member],
        };

        assert!(validate_task_people(&board, Some(member), Some(&[owner])).is_ok());
        assert!(validate_task_people(&board, Some(stranger), None).is_err());
        assert!(validate_task_people(&board, None, Some(&[stranger])).is_err());
    }
}
