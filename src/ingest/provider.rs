//! Game metadata provider seam and the record shape it returns.

use async_trait::async_trait;
use serde::Deserialize;

use crate::db::NewGame;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider is not configured: {0}")]
    NotConfigured(&'static str),
}

/// Source of catalog records. The ingestion loop only talks to this trait so
/// it can run against a simulated provider.
#[async_trait]
pub trait GameProvider: Send + Sync {
    /// One page of game records starting at `offset`
    async fn fetch_games(&self, offset: u64, limit: u32) -> Result<Vec<ProviderGame>, ProviderError>;

    /// Highest rating recorded for a game, if any
    async fn best_rating(&self, game_id: i64) -> Result<Option<f64>, ProviderError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageRef {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvolvedCompany {
    pub company: Option<NamedRef>,
}

/// A game record as the provider returns it, with expanded references
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderGame {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub cover: Option<ImageRef>,
    pub first_release_date: Option<i64>,
    #[serde(default)]
    pub genres: Vec<NamedRef>,
    #[serde(default)]
    pub platforms: Vec<NamedRef>,
    pub summary: Option<String>,
    pub slug: Option<String>,
    #[serde(default)]
    pub involved_companies: Vec<InvolvedCompany>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub screenshots: Vec<ImageRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRecord {
    pub rating: Option<f64>,
}

/// Image URLs come back protocol-relative (`//images.igdb.com/...`)
fn absolute_url(url: String) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url
    }
}

fn names(refs: Vec<NamedRef>) -> Vec<String> {
    refs.into_iter().filter_map(|r| r.name).collect()
}

impl ProviderGame {
    /// Convert to a storable record carrying the looked-up best rating
    pub fn into_new_game(self, rating: f64) -> NewGame {
        NewGame {
            external_id: self.id,
            name: self.name,
            cover_url: self.cover.and_then(|c| c.url).map(absolute_url),
            first_release_date: self.first_release_date,
            genres: names(self.genres),
            platforms: names(self.platforms),
            summary: self.summary,
            slug: self.slug,
            involved_companies: self
                .involved_companies
                .into_iter()
                .filter_map(|ic| ic.company.and_then(|c| c.name))
                .collect(),
            rating,
            screenshots: self
                .screenshots
                .into_iter()
                .filter_map(|s| s.url)
                .map(absolute_url)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_expanded_record() {
        let json = r#"[{
            "id": 1942,
            "name": "The Witcher 3: Wild Hunt",
            "cover": {"id": 89386, "url": "//images.igdb.com/igdb/image/upload/t_thumb/co1wyy.jpg"},
            "first_release_date": 1431993600,
            "genres": [{"id": 12, "name": "Role-playing (RPG)"}, {"id": 31, "name": "Adventure"}],
            "platforms": [{"id": 6, "name": "PC (Microsoft Windows)"}],
            "involved_companies": [{"id": 1, "company": {"id": 908, "name": "CD Projekt RED"}}],
            "screenshots": [{"id": 2, "url": "//images.igdb.com/s1.jpg"}],
            "slug": "the-witcher-3-wild-hunt"
        }]"#;

        let mut games: Vec<ProviderGame> = serde_json::from_str(json).unwrap();
        let game = games.remove(0).into_new_game(93.5);

        assert_eq!(game.external_id, 1942);
        assert_eq!(
            game.cover_url.as_deref(),
            Some("https://images.igdb.com/igdb/image/upload/t_thumb/co1wyy.jpg")
        );
        assert_eq!(game.genres, vec!["Role-playing (RPG)", "Adventure"]);
        assert_eq!(game.platforms, vec!["PC (Microsoft Windows)"]);
        assert_eq!(game.involved_companies, vec!["CD Projekt RED"]);
        assert_eq!(game.screenshots, vec!["https://images.igdb.com/s1.jpg"]);
        assert_eq!(game.summary, None);
        assert_eq!(game.rating, 93.5);
    }

    #[test]
    fn test_sparse_record() {
        let game: ProviderGame = serde_json::from_str(r#"{"id": 7, "name": "Pong"}"#).unwrap();
        let game = game.into_new_game(0.0);
        assert!(game.genres.is_empty());
        assert!(game.cover_url.is_none());
        assert_eq!(game.rating, 0.0);
    }
}
