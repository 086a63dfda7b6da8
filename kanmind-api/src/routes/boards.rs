/// Board endpoints
///
/// Boards are the access root: visibility is owner-or-member, deletion is
/// owner-only, and the member set is always replaced wholesale (no
/// incremental add/remove). List and create responses carry the same four
/// aggregate counts so clients can render either without a follow-up fetch.
///
/// # Endpoints
///
/// - `GET    /v1/boards` - Boards visible to the actor, with counts
/// - `POST   /v1/boards` - Create a board (actor becomes owner)
/// - `GET    /v1/boards/:id` - Detail with members and tasks
/// - `PATCH  /v1/boards/:id` - Update title and/or replace members
/// - `DELETE /v1/boards/:id` - Delete (owner only)

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
    routes::tasks::{task_response, TaskResponse},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use kanmind_shared::{
    auth::{middleware::AuthContext, policy},
    models::{
        board::{Board, BoardWithCounts},
        task::Task,
        user::{User, UserShort},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create board request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    /// Board title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// Initial member set (replaces membership entirely; the actor does not
    /// auto-join as a member, ownership is tracked separately)
    #[serde(default)]
    pub members: Vec<Uuid>,
}

/// Board update request (absent fields are left unchanged)
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    /// New title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    /// Full membership replacement
    pub members: Option<Vec<Uuid>>,
}

/// Board update response with resolved profiles
#[derive(Debug, Serialize)]
pub struct UpdateBoardResponse {
    /// Board ID
    pub id: Uuid,

    /// Board title
    pub title: String,

    /// Owner's short profile
    pub owner_data: UserShort,

    /// Member short profiles
    pub members_data: Vec<UserShort>,
}

/// Board detail response
#[derive(Debug, Serialize)]
pub struct BoardDetailResponse {
    /// Board ID
    pub id: Uuid,

    /// Board title
    pub title: String,

    /// Owner user ID
    pub owner_id: Uuid,

    /// Member short profiles
    pub members: Vec<UserShort>,

    /// Tasks on the board, with profiles and comment counts
    pub tasks: Vec<TaskResponse>,
}

/// Checks a member id list, mapping unknown ids to a `members` field error
async fn validate_member_ids(state: &AppState, member_ids: &[Uuid]) -> Result<(), ApiError> {
    let missing = User::missing_ids(&state.db, member_ids).await?;
    if !missing.is_empty() {
        let ids: Vec<String> = missing.iter().map(Uuid::to_string).collect();
        return Err(ApiError::field_error(
            "members",
            format!("Unknown user ids: {}", ids.join(", ")),
        ));
    }
    Ok(())
}

/// Board list handler
///
/// Returns every board the actor owns or is a member of, de-duplicated,
/// each annotated with member/ticket/to-do/high-priority counts.
pub async fn list_boards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<BoardWithCounts>>> {
    let boards = Board::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(boards))
}

/// Board create handler
///
/// The actor becomes the owner. The provided member set replaces membership
/// entirely; the board row and its membership commit in one transaction.
/// The response carries the same count annotations as the list.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid title, or unknown member ids
///   (field `members`)
pub async fn create_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<BoardWithCounts>)> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(validation_details(&e)))?;

    validate_member_ids(&state, &req.members).await?;

    let mut tx = state.db.begin().await?;

    let board = Board::create(&mut tx, auth.user_id, &req.title).await?;
    Board::replace_members(&mut tx, board.id, &req.members).await?;

    tx.commit().await?;

    let board = Board::find_with_counts(&state.db, board.id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Board vanished after create".to_string()))?;

    Ok((StatusCode::CREATED, Json(board)))
}

/// Board detail handler
///
/// # Errors
///
/// - `404 Not Found`: Board does not exist
/// - `403 Forbidden`: Actor is neither owner nor member
pub async fn get_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BoardDetailResponse>> {
    let scope = Board::load_scope(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    policy::board_access().check(auth.user_id, &scope.clone().into())?;

    let members = Board::members_short(&state.db, id).await?;

    let tasks = Task::list_by_board(&state.db, id).await?;
    let mut task_responses = Vec::with_capacity(tasks.len());
    for task in tasks {
        task_responses.push(task_response(&state.db, task).await?);
    }

    Ok(Json(BoardDetailResponse {
        id: scope.board_id,
        title: Board::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?
            .title,
        owner_id: scope.owner_id,
        members,
        tasks: task_responses,
    }))
}

/// Board update handler
///
/// Title and/or full membership replacement in one transaction.
///
/// # Errors
///
/// - `404 Not Found`: Board does not exist
/// - `403 Forbidden`: Actor is neither owner nor member
/// - `422 Unprocessable Entity`: Invalid title or unknown member ids
pub async fn update_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBoardRequest>,
) -> ApiResult<Json<UpdateBoardResponse>> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(validation_details(&e)))?;

    let scope = Board::load_scope(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    policy::board_access().check(auth.user_id, &scope.clone().into())?;

    if let Some(members) = &req.members {
        validate_member_ids(&state, members).await?;
    }

    let mut tx = state.db.begin().await?;

    if let Some(title) = &req.title {
        Board::update_title(&mut tx, id, title)
            .await?
            .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;
    }

    if let Some(members) = &req.members {
        Board::replace_members(&mut tx, id, members).await?;
    }

    tx.commit().await?;

    let board = Board::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    let owner_data = sqlx::query_as::<_, UserShort>(
        "SELECT id, email, fullname FROM users WHERE id = $1",
    )
    .bind(board.owner_id)
    .fetch_one(&state.db)
    .await?;

    let members_data = Board::members_short(&state.db, id).await?;

    Ok(Json(UpdateBoardResponse {
        id: board.id,
        title: board.title,
        owner_data,
        members_data,
    }))
}

/// Board delete handler
///
/// Owner only; cascades tasks and their comments.
///
/// # Errors
///
/// - `404 Not Found`: Board does not exist
/// - `403 Forbidden`: Actor is not the owner (members cannot delete)
pub async fn delete_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let scope = Board::load_scope(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    policy::board_delete().check(auth.user_id, &scope.into())?;

    Board::delete(&state.db, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
