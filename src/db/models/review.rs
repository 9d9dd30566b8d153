//! Review models and queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A review joined with its author's username
#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: String,
    pub message: String,
    pub user_id: String,
    pub username: String,
    pub game_id: String,
    pub game_name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAuthor {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: String,
    pub message: String,
    pub user: ReviewAuthor,
    pub game_id: String,
    /// Name of the game when the review was posted
    pub game_name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            message: review.message,
            user: ReviewAuthor {
                id: review.user_id,
                username: review.username,
            },
            game_id: review.game_id,
            game_name: review.game_name,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub message: Option<String>,
}

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.message, r.user_id, u.username, r.game_id, r.game_name,
        r.created_at, r.updated_at
    FROM reviews r
    JOIN users u ON u.id = r.user_id
"#;

pub async fn find_review(db: &SqlitePool, id: &str) -> Result<Option<Review>, sqlx::Error> {
    let sql = format!("{} WHERE r.id = ?", REVIEW_SELECT);
    sqlx::query_as::<_, Review>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn list_reviews(db: &SqlitePool) -> Result<Vec<Review>, sqlx::Error> {
    let sql = format!("{} ORDER BY r.created_at DESC, r.id ASC", REVIEW_SELECT);
    sqlx::query_as::<_, Review>(&sql).fetch_all(db).await
}

pub async fn list_reviews_for_game(
    db: &SqlitePool,
    game_id: &str,
) -> Result<Vec<Review>, sqlx::Error> {
    let sql = format!(
        "{} WHERE r.game_id = ? ORDER BY r.created_at DESC, r.id ASC",
        REVIEW_SELECT
    );
    sqlx::query_as::<_, Review>(&sql)
        .bind(game_id)
        .fetch_all(db)
        .await
}

pub async fn list_reviews_by_user(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Review>, sqlx::Error> {
    let sql = format!(
        "{} WHERE r.user_id = ? ORDER BY r.created_at DESC, r.id ASC",
        REVIEW_SELECT
    );
    sqlx::query_as::<_, Review>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
}

/// Insert a review. The game name is copied at write time and is not kept in
/// sync if the game is later renamed.
pub async fn insert_review(
    db: &SqlitePool,
    user_id: &str,
    game_id: &str,
    game_name: &str,
    message: &str,
) -> Result<String, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO reviews (id, message, user_id, game_id, game_name, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(message)
    .bind(user_id)
    .bind(game_id)
    .bind(game_name)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(id)
}

pub async fn update_review_message(
    db: &SqlitePool,
    id: &str,
    message: &str,
) -> Result<bool, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query("UPDATE reviews SET message = ?, updated_at = ? WHERE id = ?")
        .bind(message)
        .bind(&now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_review(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::game::fixtures::{new_game, seed_game};
    use crate::db::{get_user_profile, insert_user};

    #[tokio::test]
    async fn test_review_links_are_derived_from_one_column() {
        let db = crate::db::init("sqlite::memory:").await.unwrap();
        let user = insert_user(&db, "samus", "hash", "tok").await.unwrap();
        let game_id = seed_game(&db, new_game(1, "Metroid")).await;

        let review_id = insert_review(&db, &user.id, &game_id, "Metroid", "Great")
            .await
            .unwrap();

        let profile = get_user_profile(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(profile.reviews, vec![review_id.clone()]);

        let by_game = list_reviews_for_game(&db, &game_id).await.unwrap();
        assert_eq!(by_game.len(), 1);
        assert_eq!(by_game[0].username, "samus");

        assert!(delete_review(&db, &review_id).await.unwrap());
        let profile = get_user_profile(&db, &user.id).await.unwrap().unwrap();
        assert!(profile.reviews.is_empty());
    }

    #[tokio::test]
    async fn test_deleting_user_removes_their_reviews() {
        let db = crate::db::init("sqlite::memory:").await.unwrap();
        let user = insert_user(&db, "link", "hash", "tok").await.unwrap();
        let game_id = seed_game(&db, new_game(2, "Zelda")).await;
        insert_review(&db, &user.id, &game_id, "Zelda", "Classic").await.unwrap();

        crate::db::delete_user(&db, &user.id).await.unwrap();
        assert!(list_reviews(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_message_touches_updated_at() {
        let db = crate::db::init("sqlite::memory:").await.unwrap();
        let user = insert_user(&db, "kirby", "hash", "tok").await.unwrap();
        let game_id = seed_game(&db, new_game(3, "Dream Land")).await;
        let id = insert_review(&db, &user.id, &game_id, "Dream Land", "Cute").await.unwrap();

        assert!(update_review_message(&db, &id, "Very cute").await.unwrap());
        let review = find_review(&db, &id).await.unwrap().unwrap();
        assert_eq!(review.message, "Very cute");
        assert!(review.updated_at >= review.created_at);

        assert!(!update_review_message(&db, "missing", "x").await.unwrap());
    }
}
