use crate::{
    crypto::{keys::KeyRing, password, session::SessionIssuer},
    prunto::{
        handlers::{open_envelope, valid_email, EncryptedEnvelope},
        store::{self, StoredUser},
    },
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct UserLogin {
    #[serde(alias = "username")]
    email: String,
    password: String,
}

impl std::fmt::Debug for UserLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLogin")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct TokenResponse {
    access_token: String,
    token_type: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct EncryptedLoginResponse {
    access_token: String,
    token_type: String,
    email: String,
    name: String,
    role: String,
}

#[utoipa::path(
    post,
    path= "/auth/login",
    request_body = UserLogin,
    responses (
        (status = 200, description = "Login successful", body = [TokenResponse], content_type = "application/json"),
        (status = 401, description = "Unknown user or wrong password"),
    ),
    tag= "auth"
)]
// axum handler for plaintext login
#[instrument(skip(payload))]
pub async fn login(
    pool: Extension<PgPool>,
    sessions: Extension<Arc<SessionIssuer>>,
    payload: Option<Json<UserLogin>>,
) -> Response {
    let Some(Json(credentials)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    debug!("login attempt: {:?}", credentials);

    let user = match authenticate(&pool, &credentials).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match issue_token(&sessions, &user) {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(response) => response,
    }
}

#[utoipa::path(
    post,
    path= "/auth/encrypted-login",
    request_body = EncryptedEnvelope,
    responses (
        (status = 200, description = "Login successful", body = [EncryptedLoginResponse], content_type = "application/json"),
        (status = 400, description = "Envelope could not be decrypted"),
        (status = 401, description = "Unknown user or wrong password"),
    ),
    tag= "auth"
)]
// axum handler for envelope-encrypted login
#[instrument(skip(payload))]
pub async fn encrypted_login(
    pool: Extension<PgPool>,
    keys: Extension<Arc<KeyRing>>,
    sessions: Extension<Arc<SessionIssuer>>,
    payload: Option<Json<EncryptedEnvelope>>,
) -> Response {
    let Some(Json(envelope)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let decrypted = match open_envelope(&keys, &envelope) {
        Ok(value) => value,
        Err(e) => return envelope_rejected(&e),
    };

    let credentials: UserLogin = match serde_json::from_value(decrypted) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Decrypted payload is missing credential fields: {}", e);

            return (
                StatusCode::BAD_REQUEST,
                "Missing credential fields".to_string(),
            )
                .into_response();
        }
    };

    debug!("encrypted login attempt: {:?}", credentials);

    let user = match authenticate(&pool, &credentials).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match sessions.issue(&user.email) {
        Ok(access_token) => (
            StatusCode::OK,
            Json(EncryptedLoginResponse {
                access_token,
                token_type: "bearer".to_string(),
                email: user.email,
                name: user.name,
                role: user.role,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Error issuing session token: {}", e);

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error issuing token".to_string(),
            )
                .into_response()
        }
    }
}

/// Map any envelope-stage failure to a single client-facing class; the
/// stage that failed is only logged server-side.
pub(super) fn envelope_rejected(error: &crate::crypto::hybrid::EnvelopeError) -> Response {
    error!("Failed to decrypt envelope: {}", error);

    (
        StatusCode::BAD_REQUEST,
        "Failed to decrypt request payload".to_string(),
    )
        .into_response()
}

/// Look the user up and check the password. Unknown user and wrong
/// password are deliberately indistinguishable to the caller.
async fn authenticate(pool: &PgPool, credentials: &UserLogin) -> Result<StoredUser, Response> {
    if !valid_email(&credentials.email) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response());
    }

    let user = match store::lookup_user_by_email(pool, &credentials.email).await {
        Ok(Some(user)) => user,

        Ok(None) => {
            debug!("User not found");

            return Err(unauthorized());
        }

        Err(e) => {
            error!("Error getting user from database: {:?}", e);

            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error getting user".to_string(),
            )
                .into_response());
        }
    };

    match password::verify(&credentials.password, &user.password) {
        Ok(true) => {
            debug!("Login successful");

            Ok(user)
        }

        Ok(false) => {
            debug!("Password mismatch");

            Err(unauthorized())
        }

        Err(e) => {
            error!("Stored password hash is unparseable: {}", e);

            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error verifying password".to_string(),
            )
                .into_response())
        }
    }
}

fn issue_token(sessions: &SessionIssuer, user: &StoredUser) -> Result<TokenResponse, Response> {
    match sessions.issue(&user.email) {
        Ok(access_token) => Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        }),

        Err(e) => {
            error!("Error issuing session token: {}", e);

            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error issuing token".to_string(),
            )
                .into_response())
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        "Invalid email or password".to_string(),
    )
        .into_response()
}
