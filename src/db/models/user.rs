//! User models, DTOs and queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::parse_string_list;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub created_at: String,
}

/// Public view of a user. Review and collection ids are derived by query,
/// never stored on the user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub created_at: String,
    pub reviews: Vec<String>,
    pub favorite_games: Vec<String>,
    pub played_games: Vec<String>,
    pub wanted_games: Vec<String>,
}

#[derive(Debug, FromRow)]
struct UserProfileRow {
    id: String,
    username: String,
    created_at: String,
    reviews: String,
    favorite_games: String,
    played_games: String,
    wanted_games: String,
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            created_at: row.created_at,
            reviews: parse_string_list(&row.reviews),
            favorite_games: parse_string_list(&row.favorite_games),
            played_games: parse_string_list(&row.played_games),
            wanted_games: parse_string_list(&row.wanted_games),
        }
    }
}

/// Returned by register and login; the only place the token is ever exposed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: String,
    pub username: String,
    pub access_token: String,
    pub created_at: String,
    pub reviews: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

const PROFILE_SELECT: &str = r#"
    SELECT u.id, u.username, u.created_at,
        (SELECT json_group_array(r.id) FROM reviews r WHERE r.user_id = u.id) AS reviews,
        (SELECT json_group_array(c.game_id) FROM game_collections c
            WHERE c.user_id = u.id AND c.kind = 'favorite') AS favorite_games,
        (SELECT json_group_array(c.game_id) FROM game_collections c
            WHERE c.user_id = u.id AND c.kind = 'played') AS played_games,
        (SELECT json_group_array(c.game_id) FROM game_collections c
            WHERE c.user_id = u.id AND c.kind = 'wanted') AS wanted_games
    FROM users u
"#;

pub async fn find_user(db: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_user_by_username(
    db: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(db)
        .await
}

pub async fn find_user_by_token(
    db: &SqlitePool,
    token: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE access_token = ?")
        .bind(token)
        .fetch_optional(db)
        .await
}

pub async fn insert_user(
    db: &SqlitePool,
    username: &str,
    password_hash: &str,
    access_token: &str,
) -> Result<User, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, username, password_hash, access_token, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(username)
    .bind(password_hash)
    .bind(access_token)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(User {
        id,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        access_token: access_token.to_string(),
        created_at: now,
    })
}

pub async fn update_user(
    db: &SqlitePool,
    id: &str,
    username: Option<&str>,
    password_hash: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET username = COALESCE(?, username),
            password_hash = COALESCE(?, password_hash)
        WHERE id = ?
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a user. Reviews and collection memberships go with it via cascade.
pub async fn delete_user(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_user_profile(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<UserProfile>, sqlx::Error> {
    let sql = format!("{} WHERE u.id = ?", PROFILE_SELECT);
    let row = sqlx::query_as::<_, UserProfileRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(UserProfile::from))
}

pub async fn list_user_profiles(db: &SqlitePool) -> Result<Vec<UserProfile>, sqlx::Error> {
    let sql = format!("{} ORDER BY u.created_at ASC, u.username ASC", PROFILE_SELECT);
    let rows = sqlx::query_as::<_, UserProfileRow>(&sql).fetch_all(db).await?;
    Ok(rows.into_iter().map(UserProfile::from).collect())
}

/// Review ids owned by a user
pub async fn list_user_review_ids(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let ids: Vec<(String,)> =
        sqlx::query_as("SELECT id FROM reviews WHERE user_id = ? ORDER BY created_at ASC")
            .bind(user_id)
            .fetch_all(db)
            .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}
