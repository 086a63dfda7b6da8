/// Comment endpoints
///
/// Comments form a flat thread under a task. Reading and writing require
/// owner-or-member access to the task's board; deletion is restricted to
/// the comment's author (the board owner alone cannot delete it).
///
/// # Endpoints
///
/// - `GET    /v1/tasks/:task_id/comments` - List, newest first
/// - `POST   /v1/tasks/:task_id/comments` - Create (author is the actor)
/// - `DELETE /v1/tasks/:task_id/comments/:id` - Delete (author only)

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use kanmind_shared::{
    auth::{middleware::AuthContext, policy},
    models::{
        comment::{Comment, CommentWithAuthor},
        task::Task,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create comment request
///
/// Content only: the author is always the authenticated actor, never a
/// client-supplied field.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    /// Comment text
    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: String,
}

/// Comment list handler
///
/// # Errors
///
/// - `404 Not Found`: Task does not exist
/// - `403 Forbidden`: Actor is neither owner nor member of the task's board
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentWithAuthor>>> {
    let scope = Task::load_scope(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    policy::board_contribute().check(auth.user_id, &scope.into())?;

    let comments = Comment::list_by_task(&state.db, task_id).await?;

    Ok(Json(comments))
}

/// Comment create handler
///
/// # Errors
///
/// - `404 Not Found`: Task does not exist
/// - `403 Forbidden`: Actor is neither owner nor member of the task's board
/// - `422 Unprocessable Entity`: Empty content
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentWithAuthor>)> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(validation_details(&e)))?;

    let scope = Task::load_scope(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    policy::board_contribute().check(auth.user_id, &scope.into())?;

    let comment = Comment::create(&state.db, task_id, auth.user_id, &req.content).await?;

    let comment = Comment::find_with_author(&state.db, comment.id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Comment vanished after create".to_string()))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Comment delete handler
///
/// The comment must belong to `:task_id`; a valid comment id under the
/// wrong task reads as 404 rather than confirming its existence.
///
/// # Errors
///
/// - `404 Not Found`: Comment does not exist under this task
/// - `403 Forbidden`: Actor is not the comment's author
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((task_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let scope = Comment::load_scope(&state.db, task_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    policy::comment_delete().check(auth.user_id, &scope.into())?;

    Comment::delete(&state.db, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
