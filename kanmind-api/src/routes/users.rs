/// Profile lookup endpoints
///
/// # Endpoints
///
/// - `GET /v1/email-check?email=` - Look up a user's short profile by email

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use kanmind_shared::{auth::middleware::AuthContext, models::user::{User, UserShort}};
use serde::Deserialize;
use validator::Validate;

/// Email check query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct EmailCheckQuery {
    /// Email address to look up
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Email check handler
///
/// Looks up the short profile for an email address, used by board and task
/// forms to resolve invitees. Requires authentication; any signed-in user
/// may query.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Malformed email
/// - `404 Not Found`: No account with that email
pub async fn email_check(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Query(query): Query<EmailCheckQuery>,
) -> ApiResult<Json<UserShort>> {
    query
        .validate()
        .map_err(|e| ApiError::ValidationError(validation_details(&e)))?;

    let user = User::find_short_by_email(&state.db, &query.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No user with this email".to_string()))?;

    Ok(Json(user))
}
