use crate::{
    crypto::{keys::KeyRing, password},
    prunto::{
        handlers::{
            open_envelope, user_login::envelope_rejected, valid_email, valid_password,
            EncryptedEnvelope,
        },
        store::{self, StoredUser},
    },
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct UserRegister {
    email: String,
    name: String,
    password: String,
    role: Option<String>,
}

impl std::fmt::Debug for UserRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRegister")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"***")
            .field("role", &self.role)
            .finish()
    }
}

#[utoipa::path(
    post,
    path= "/auth/register",
    request_body = UserRegister,
    responses (
        (status = 201, description = "Registration successful", body = [StoredUser], content_type = "application/json"),
        (status = 409, description = "User with the specified email already exists"),
    ),
    tag= "auth"
)]
// axum handler for plaintext registration
#[instrument(skip(payload))]
pub async fn register(pool: Extension<PgPool>, payload: Option<Json<UserRegister>>) -> Response {
    let Some(Json(registration)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    debug!("registration: {:?}", registration);

    create_account(&pool, &registration).await
}

#[utoipa::path(
    post,
    path= "/auth/encrypted-register",
    request_body = EncryptedEnvelope,
    responses (
        (status = 201, description = "Registration successful", body = [StoredUser], content_type = "application/json"),
        (status = 400, description = "Envelope could not be decrypted"),
        (status = 409, description = "User with the specified email already exists"),
    ),
    tag= "auth"
)]
// axum handler for envelope-encrypted registration
#[instrument(skip(payload))]
pub async fn encrypted_register(
    pool: Extension<PgPool>,
    keys: Extension<Arc<KeyRing>>,
    payload: Option<Json<EncryptedEnvelope>>,
) -> Response {
    let Some(Json(envelope)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let decrypted = match open_envelope(&keys, &envelope) {
        Ok(value) => value,
        Err(e) => return envelope_rejected(&e),
    };

    let registration: UserRegister = match serde_json::from_value(decrypted) {
        Ok(registration) => registration,
        Err(e) => {
            error!("Decrypted payload is missing credential fields: {}", e);

            return (
                StatusCode::BAD_REQUEST,
                "Missing credential fields".to_string(),
            )
                .into_response();
        }
    };

    debug!("encrypted registration: {:?}", registration);

    create_account(&pool, &registration).await
}

async fn create_account(pool: &PgPool, registration: &UserRegister) -> Response {
    if !valid_email(&registration.email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    if !valid_password(&registration.password) {
        return (StatusCode::BAD_REQUEST, "Invalid password".to_string()).into_response();
    }

    // check if user exists
    match store::lookup_user_by_email(pool, &registration.email).await {
        Ok(Some(_)) => {
            error!("User already exists");

            return (StatusCode::CONFLICT, "User already exists".to_string()).into_response();
        }
        Ok(None) => (),
        Err(e) => {
            error!("Error checking if user exists: {:?}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error checking if user exists".to_string(),
            )
                .into_response();
        }
    }

    let password_hash = match password::hash(&registration.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Error hashing password: {}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error hashing password".to_string(),
            )
                .into_response();
        }
    };

    let role = registration.role.as_deref().unwrap_or(store::DEFAULT_ROLE);

    match store::create_user(
        pool,
        &registration.email,
        &registration.name,
        &password_hash,
        role,
    )
    .await
    {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),

        // A concurrent registration can slip past the existence check
        // above; the unique constraint is the authority.
        Err(e) if store::is_unique_violation(&e) => {
            error!("User already exists: {:?}", e);

            (StatusCode::CONFLICT, "User already exists".to_string()).into_response()
        }

        Err(e) => {
            error!("Error inserting user: {:?}", e);

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error inserting user".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_is_optional() {
        let registration: UserRegister = serde_json::from_value(serde_json::json!({
            "email": "a@b.com", "name": "Ada", "password": "hunter22"
        }))
        .unwrap();
        assert!(registration.role.is_none());

        let registration: UserRegister = serde_json::from_value(serde_json::json!({
            "email": "a@b.com", "name": "Ada", "password": "hunter22", "role": "admin"
        }))
        .unwrap();
        assert_eq!(registration.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_name_is_required() {
        let result: Result<UserRegister, _> = serde_json::from_value(serde_json::json!({
            "email": "a@b.com", "password": "hunter22"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let registration: UserRegister = serde_json::from_value(serde_json::json!({
            "email": "a@b.com", "name": "Ada", "password": "hunter22"
        }))
        .unwrap();

        let debug = format!("{registration:?}");
        assert!(!debug.contains("hunter22"));
    }
}
