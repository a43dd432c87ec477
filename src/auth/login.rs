use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, AppResult},
    session::USER_ID,
};

use super::random_alias;

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    name: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct IdentityResponse {
    id: Uuid,
    name: String,
}

#[debug_handler]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> AppResult<Response> {
    let name = request
        .name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(random_alias);

    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id,name) VALUES (?,?)")
        .bind(id.to_string())
        .bind(&name)
        .execute(&db_pool)
        .await?;

    session.insert(USER_ID, id.to_string()).await?;
    info!(user = %id, "session opened for {name}");

    Ok(Json(IdentityResponse { id, name }).into_response())
}

#[debug_handler]
pub(crate) async fn logout(session: Session) -> AppResult<Response> {
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[debug_handler]
pub(crate) async fn me(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let Some(identity) = super::resolve_identity(&session, &db_pool).await? else {
        return Err(ApiError::Unauthenticated);
    };

    Ok(Json(IdentityResponse {
        id: identity.id,
        name: identity.name,
    })
    .into_response())
}
