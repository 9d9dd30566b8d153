//! Per-user game collections (favorite, played, wanted).
//!
//! Each kind is an independent set: a game can be favorited and wanted at
//! the same time.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::game::{Game, GameResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Favorite,
    Played,
    Wanted,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Favorite => "favorite",
            CollectionKind::Played => "played",
            CollectionKind::Wanted => "wanted",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "favorite" | "favorites" => Ok(CollectionKind::Favorite),
            "played" => Ok(CollectionKind::Played),
            "wanted" => Ok(CollectionKind::Wanted),
            _ => Err(format!("Unknown collection: {}", s)),
        }
    }
}

/// Flip a game's membership in one of a user's collections.
/// Returns whether the game is in the collection afterwards.
pub async fn toggle_collection(
    db: &SqlitePool,
    user_id: &str,
    game_id: &str,
    kind: CollectionKind,
) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    let removed = sqlx::query(
        "DELETE FROM game_collections WHERE user_id = ? AND game_id = ? AND kind = ?",
    )
    .bind(user_id)
    .bind(game_id)
    .bind(kind.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed == 0 {
        sqlx::query(
            "INSERT OR IGNORE INTO game_collections (user_id, game_id, kind, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(game_id)
        .bind(kind.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(removed == 0)
}

/// Games in one of a user's collections, by name
pub async fn list_collection_games(
    db: &SqlitePool,
    user_id: &str,
    kind: CollectionKind,
) -> Result<Vec<GameResponse>, sqlx::Error> {
    let games = sqlx::query_as::<_, Game>(
        r#"
        SELECT g.id, g.external_id, g.name, g.cover_url, g.first_release_date, g.genres,
            g.platforms, g.summary, g.slug, g.involved_companies, g.rating, g.screenshots,
            g.created_at,
            (SELECT json_group_array(f.user_id) FROM game_collections f
                WHERE f.game_id = g.id AND f.kind = 'favorite') AS saved_favorite_by
        FROM games g
        JOIN game_collections c ON c.game_id = g.id
        WHERE c.user_id = ? AND c.kind = ?
        ORDER BY g.name COLLATE NOCASE ASC, g.id ASC
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .fetch_all(db)
    .await?;

    Ok(games.into_iter().map(GameResponse::from).collect())
}
