//! Game models, catalog queries and ingestion writes.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::{escape_like, parse_string_list, serialize_string_list};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub id: String,
    pub external_id: Option<i64>,
    pub name: String,
    pub cover_url: Option<String>,
    /// Unix timestamp (seconds)
    pub first_release_date: Option<i64>,
    /// JSON array of genre names
    pub genres: String,
    /// JSON array of platform names
    pub platforms: String,
    pub summary: Option<String>,
    pub slug: Option<String>,
    /// JSON array of company names
    pub involved_companies: String,
    pub rating: f64,
    /// JSON array of screenshot URLs
    pub screenshots: String,
    pub created_at: String,
    /// JSON array of user ids, aggregated from the favorite collection
    pub saved_favorite_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResponse {
    pub id: String,
    pub external_id: Option<i64>,
    pub name: String,
    pub cover_url: Option<String>,
    pub first_release_date: Option<i64>,
    pub genres: Vec<String>,
    pub platforms: Vec<String>,
    pub summary: Option<String>,
    pub slug: Option<String>,
    pub involved_companies: Vec<String>,
    pub rating: f64,
    pub screenshots: Vec<String>,
    pub saved_favorite_by: Vec<String>,
    pub created_at: String,
}

impl From<Game> for GameResponse {
    fn from(game: Game) -> Self {
        Self {
            id: game.id,
            external_id: game.external_id,
            name: game.name,
            cover_url: game.cover_url,
            first_release_date: game.first_release_date,
            genres: parse_string_list(&game.genres),
            platforms: parse_string_list(&game.platforms),
            summary: game.summary,
            slug: game.slug,
            involved_companies: parse_string_list(&game.involved_companies),
            rating: game.rating,
            screenshots: parse_string_list(&game.screenshots),
            saved_favorite_by: parse_string_list(&game.saved_favorite_by),
            created_at: game.created_at,
        }
    }
}

/// A game as produced by catalog ingestion, before it has a local id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewGame {
    pub external_id: i64,
    pub name: String,
    pub cover_url: Option<String>,
    pub first_release_date: Option<i64>,
    pub genres: Vec<String>,
    pub platforms: Vec<String>,
    pub summary: Option<String>,
    pub slug: Option<String>,
    pub involved_companies: Vec<String>,
    pub rating: f64,
    pub screenshots: Vec<String>,
}

/// Sort orders accepted by game listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GameSort {
    #[default]
    Name,
    ReleasedAsc,
    ReleasedDesc,
}

impl GameSort {
    fn order_clause(&self) -> &'static str {
        match self {
            GameSort::Name => "ORDER BY g.name COLLATE NOCASE ASC, g.id ASC",
            GameSort::ReleasedAsc => "ORDER BY g.first_release_date ASC, g.name COLLATE NOCASE ASC, g.id ASC",
            GameSort::ReleasedDesc => "ORDER BY g.first_release_date DESC, g.name COLLATE NOCASE ASC, g.id ASC",
        }
    }

    fn by_release(&self) -> bool {
        !matches!(self, GameSort::Name)
    }
}

impl std::str::FromStr for GameSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "name" => Ok(GameSort::Name),
            "releasedAsce" | "releasedAsc" => Ok(GameSort::ReleasedAsc),
            "releasedDesc" => Ok(GameSort::ReleasedDesc),
            _ => Err(format!(
                "Unknown sort: {} (expected name, releasedAsce or releasedDesc)",
                s
            )),
        }
    }
}

/// Filters for game listings. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    pub genre: Option<String>,
    pub platform: Option<String>,
    /// Case-insensitive substring of the game name
    pub search: Option<String>,
    pub sort: GameSort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamePage {
    pub games: Vec<GameResponse>,
    pub total: i64,
}

const GAME_SELECT: &str = r#"
    SELECT g.id, g.external_id, g.name, g.cover_url, g.first_release_date, g.genres,
        g.platforms, g.summary, g.slug, g.involved_companies, g.rating, g.screenshots,
        g.created_at,
        (SELECT json_group_array(c.user_id) FROM game_collections c
            WHERE c.game_id = g.id AND c.kind = 'favorite') AS saved_favorite_by
    FROM games g
"#;

pub async fn find_game(db: &SqlitePool, id: &str) -> Result<Option<GameResponse>, sqlx::Error> {
    let sql = format!("{} WHERE g.id = ?", GAME_SELECT);
    let game = sqlx::query_as::<_, Game>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(game.map(GameResponse::from))
}

/// List games matching a filter, one page at a time. `total` counts every
/// match regardless of the page requested.
pub async fn list_games(
    db: &SqlitePool,
    filter: &GameFilter,
    limit: i64,
    offset: i64,
) -> Result<GamePage, sqlx::Error> {
    // Build dynamic WHERE clause
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(genre) = &filter.genre {
        conditions.push("EXISTS (SELECT 1 FROM json_each(g.genres) WHERE json_each.value = ?)");
        bindings.push(genre.clone());
    }

    if let Some(platform) = &filter.platform {
        conditions.push("EXISTS (SELECT 1 FROM json_each(g.platforms) WHERE json_each.value = ?)");
        bindings.push(platform.clone());
    }

    if let Some(search) = &filter.search {
        // SQLite LIKE only folds ASCII, so match on the pre-lowercased name
        conditions.push("g.name_folded LIKE ? ESCAPE '\\'");
        bindings.push(format!("%{}%", escape_like(&search.to_lowercase())));
    }

    if filter.sort.by_release() {
        conditions.push("g.first_release_date IS NOT NULL");
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM games g {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for binding in &bindings {
        count_query = count_query.bind(binding);
    }
    let total = count_query.fetch_one(db).await?;

    let sql = format!(
        "{} {} {} LIMIT ? OFFSET ?",
        GAME_SELECT,
        where_clause,
        filter.sort.order_clause()
    );
    let mut query = sqlx::query_as::<_, Game>(&sql);
    for binding in &bindings {
        query = query.bind(binding);
    }
    let games = query.bind(limit).bind(offset).fetch_all(db).await?;

    Ok(GamePage {
        games: games.into_iter().map(GameResponse::from).collect(),
        total,
    })
}

/// Every distinct genre name across the catalog
pub async fn distinct_genres(db: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT j.value FROM games g, json_each(g.genres) j ORDER BY j.value",
    )
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|(v,)| v).collect())
}

/// Every distinct platform name across the catalog
pub async fn distinct_platforms(db: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT j.value FROM games g, json_each(g.platforms) j ORDER BY j.value",
    )
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|(v,)| v).collect())
}

pub async fn count_games(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM games").fetch_one(db).await
}

/// Insert or refresh a batch of games in one transaction, keyed on the
/// provider id. Either the whole batch lands or none of it does.
pub async fn upsert_games(db: &SqlitePool, games: &[NewGame]) -> Result<usize, sqlx::Error> {
    let mut tx = db.begin().await?;
    let now = chrono::Utc::now().to_rfc3339();

    for game in games {
        sqlx::query(
            r#"
            INSERT INTO games (id, external_id, name, name_folded, cover_url, first_release_date,
                genres, platforms, summary, slug, involved_companies, rating, screenshots, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO UPDATE SET
                name = excluded.name,
                name_folded = excluded.name_folded,
                cover_url = excluded.cover_url,
                first_release_date = excluded.first_release_date,
                genres = excluded.genres,
                platforms = excluded.platforms,
                summary = excluded.summary,
                slug = excluded.slug,
                involved_companies = excluded.involved_companies,
                rating = excluded.rating,
                screenshots = excluded.screenshots
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(game.external_id)
        .bind(&game.name)
        .bind(game.name.to_lowercase())
        .bind(&game.cover_url)
        .bind(game.first_release_date)
        .bind(serialize_string_list(&game.genres))
        .bind(serialize_string_list(&game.platforms))
        .bind(&game.summary)
        .bind(&game.slug)
        .bind(serialize_string_list(&game.involved_companies))
        .bind(game.rating)
        .bind(serialize_string_list(&game.screenshots))
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(games.len())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn new_game(external_id: i64, name: &str) -> NewGame {
        NewGame {
            external_id,
            name: name.to_string(),
            rating: 50.0,
            ..Default::default()
        }
    }

    /// Insert a game and return its local id
    pub async fn seed_game(db: &SqlitePool, game: NewGame) -> String {
        let external_id = game.external_id;
        upsert_games(db, &[game]).await.unwrap();
        sqlx::query_scalar("SELECT id FROM games WHERE external_id = ?")
            .bind(external_id)
            .fetch_one(db)
            .await
            .unwrap()
    }
}
