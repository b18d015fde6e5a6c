use crate::crypto::keys::KeyRing;
use axum::{extract::Extension, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct PublicKey {
    public_key: String,
}

#[utoipa::path(
    get,
    path= "/auth/public-key",
    responses (
        (status = 200, description = "Server RSA public key in PEM format", body = [PublicKey], content_type = "application/json"),
    ),
    tag= "auth"
)]
// axum handler for public key distribution
#[instrument]
pub async fn public_key(keys: Extension<Arc<KeyRing>>) -> impl IntoResponse {
    Json(PublicKey {
        public_key: keys.public_key_pem().to_string(),
    })
}
