use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored shape of one user in `user_data.json`, keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String, // Argon2 PHC string
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}
