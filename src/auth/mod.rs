//! Identity resolution plus a deliberately narrow login stand-in.
//!
//! Real credential verification lives in a separate service; the core only
//! needs "session cookie -> stable user id + display name". `login` exists
//! so a session can come into being at all: it upserts a user row and writes
//! the session, nothing more.

mod login;

use axum::{
    Router,
    routing::{get, post},
};
use rand::seq::IndexedRandom;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppState, error::AppResult, session::USER_ID};

pub(crate) use login::{login, logout, me};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// The identity bound to a connection at handshake. Immutable for the
/// connection's lifetime.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub id: Uuid,
    pub name: String,
}

/// Resolves the session's credential to a user. `None` means the caller is
/// unauthenticated: expired session, unknown user, or no session at all.
pub async fn resolve_identity(
    session: &Session,
    db_pool: &SqlitePool,
) -> AppResult<Option<UserIdentity>> {
    let Some(user_id) = session.get::<String>(USER_ID).await? else {
        return Ok(None);
    };
    let Ok(user_id) = Uuid::parse_str(&user_id) else {
        return Ok(None);
    };

    let row: Option<(String,)> = sqlx::query_as("SELECT name FROM users WHERE id=?")
        .bind(user_id.to_string())
        .fetch_optional(db_pool)
        .await?;

    Ok(row.map(|(name,)| UserIdentity { id: user_id, name }))
}

pub(crate) fn random_alias() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sad",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];

    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    format!(
        "{} {}",
        adjectives.choose(&mut rand::rng()).unwrap(),
        nouns.choose(&mut rand::rng()).unwrap()
    )
}
