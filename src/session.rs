//! Session keys shared between the auth collaborator and the gateway.

pub const USER_ID: &str = "user_id";
