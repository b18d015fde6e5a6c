use crate::{
    crypto::session::SessionIssuer,
    prunto::{
        handlers::bearer_token,
        store::{self, StoredUser},
    },
};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

#[utoipa::path(
    get,
    path= "/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User id"),
    ),
    responses (
        (status = 200, description = "User record", body = [StoredUser], content_type = "application/json"),
        (status = 401, description = "Missing, expired or invalid bearer token"),
        (status = 404, description = "Unknown user id"),
    ),
    tag= "users"
)]
// axum handler for fetching a user record
#[instrument(skip(headers))]
pub async fn get_user(
    pool: Extension<PgPool>,
    sessions: Extension<Arc<SessionIssuer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, "Missing bearer token".to_string()).into_response();
    };

    let principal = match sessions.verify(token) {
        Ok(subject) => subject,
        Err(e) => {
            debug!("Session token rejected: {}", e);

            return (StatusCode::UNAUTHORIZED, "Invalid session token".to_string())
                .into_response();
        }
    };

    debug!("user lookup by {}", principal);

    match store::lookup_user_by_id(&pool, id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),

        Ok(None) => (StatusCode::NOT_FOUND, "User not found".to_string()).into_response(),

        Err(e) => {
            error!("Error getting user from database: {:?}", e);

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error getting user".to_string(),
            )
                .into_response()
        }
    }
}
