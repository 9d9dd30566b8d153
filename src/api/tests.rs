//! Router-level tests: requests go through the full axum stack against an
//! in-memory database.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::Config;
use crate::db::{self, game::fixtures::new_game, NewGame};
use crate::imagegen::{ImageError, ImageGenerator};
use crate::ingest::{GameProvider, ProviderError, ProviderGame};
use crate::AppState;

use super::create_router;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_state(|state| state).await
    }

    async fn with_state(build: impl FnOnce(AppState) -> AppState) -> Self {
        let pool = db::init("sqlite::memory:").await.unwrap();
        let state = Arc::new(build(AppState::new(Config::default(), pool)));
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    /// Register a user and return (id, token)
    async fn register(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .send(
                "POST",
                "/users/register",
                None,
                Some(json!({ "username": username, "password": "correct horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["response"]["id"].as_str().unwrap().to_string(),
            body["response"]["access_token"].as_str().unwrap().to_string(),
        )
    }

    async fn seed(&self, games: Vec<NewGame>) -> Vec<String> {
        db::upsert_games(&self.state.db, &games).await.unwrap();
        let mut ids = Vec::new();
        for game in &games {
            let id: String = sqlx::query_scalar("SELECT id FROM games WHERE external_id = ?")
                .bind(game.external_id)
                .fetch_one(&self.state.db)
                .await
                .unwrap();
            ids.push(id);
        }
        ids
    }
}

#[tokio::test]
async fn test_greeting_and_health() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("gamecritic"));

    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new().await;
    let (id, _) = app.register("mario").await;

    let (status, body) = app
        .send(
            "POST",
            "/users/register",
            None,
            Some(json!({ "username": "mario", "password": "another password" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "conflict");

    let (status, body) = app.send("GET", &format!("/users/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["username"], "mario");
    assert!(body["response"].get("access_token").is_none());
    assert!(body["response"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_registration_validates_input() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            "POST",
            "/users/register",
            None,
            Some(json!({ "username": "", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"]["username"].is_array());
    assert!(body["details"]["password"].is_array());
}

#[tokio::test]
async fn test_login_returns_issued_token() {
    let app = TestApp::new().await;
    let (_, token) = app.register("luigi").await;

    let (status, body) = app
        .send(
            "POST",
            "/users/login",
            None,
            Some(json!({ "username": "luigi", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["access_token"], token.as_str());

    let (status, body) = app
        .send(
            "POST",
            "/users/login",
            None,
            Some(json!({ "username": "luigi", "password": "wrong horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Credentials do not match");

    let (status, _) = app
        .send(
            "POST",
            "/users/login",
            None,
            Some(json!({ "username": "nobody", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_user_list_has_message() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], json!([]));
    assert_eq!(body["message"], "There are no users");
}

#[tokio::test]
async fn test_review_requires_login() {
    let app = TestApp::new().await;
    let ids = app.seed(vec![new_game(1, "Tetris")]).await;

    let uri = format!("/games/{}/reviews", ids[0]);
    let (status, body) = app
        .send("POST", &uri, None, Some(json!({ "message": "Great" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Please log in");

    let (status, _) = app
        .send("POST", &uri, Some("not-a-token"), Some(json!({ "message": "Great" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_review_copies_game_name() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register("peach").await;
    let ids = app.seed(vec![new_game(1, "Super Mario Kart")]).await;

    let (status, body) = app
        .send(
            "POST",
            &format!("/games/{}/reviews", ids[0]),
            Some(&token),
            Some(json!({ "message": "Rainbow Road is brutal" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let review = &body["response"];
    assert_eq!(review["game_name"], "Super Mario Kart");
    assert_eq!(review["user"]["id"], user_id.as_str());
    assert_eq!(review["user"]["username"], "peach");

    let review_id = review["id"].as_str().unwrap();
    let (_, profile) = app.send("GET", &format!("/users/{}", user_id), None, None).await;
    assert_eq!(profile["response"]["reviews"], json!([review_id]));

    let (_, listed) = app
        .send("GET", &format!("/games/{}/reviews", ids[0]), None, None)
        .await;
    assert_eq!(listed["response"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_review_for_missing_game() {
    let app = TestApp::new().await;
    let (_, token) = app.register("toad").await;

    let (status, _) = app
        .send(
            "POST",
            "/games/550e8400-e29b-41d4-a716-446655440000/reviews",
            Some(&token),
            Some(json!({ "message": "Where is it?" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(
            "POST",
            "/games/not-an-id/reviews",
            Some(&token),
            Some(json!({ "message": "Where is it?" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_only_the_author_may_edit_a_review() {
    let app = TestApp::new().await;
    let (_, author) = app.register("daisy").await;
    let (_, other) = app.register("wario").await;
    let ids = app.seed(vec![new_game(1, "Mario Tennis")]).await;

    let (_, body) = app
        .send(
            "POST",
            &format!("/games/{}/reviews", ids[0]),
            Some(&author),
            Some(json!({ "message": "Fun" })),
        )
        .await;
    let uri = format!("/reviews/{}", body["response"]["id"].as_str().unwrap());

    let (status, _) = app
        .send("PATCH", &uri, Some(&other), Some(json!({ "message": "Boring" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("DELETE", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send("PATCH", &uri, Some(&author), Some(json!({ "message": "Very fun" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["message"], "Very fun");

    let (status, body) = app.send("DELETE", &uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["message"], "Very fun");

    let (status, _) = app.send("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.send("GET", "/reviews", None, None).await;
    assert_eq!(body["message"], "There are no reviews");
}

#[tokio::test]
async fn test_ownership_can_be_relaxed() {
    let app = TestApp::with_state(|mut state| {
        state.config.auth.enforce_ownership = false;
        state
    })
    .await;
    let (victim, _) = app.register("koopa").await;
    let (_, other) = app.register("bowser").await;

    let (status, body) = app
        .send("DELETE", &format!("/users/{}", victim), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["username"], "koopa");

    let (status, _) = app.send("GET", &format!("/users/{}", victim), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_editing_a_missing_user_is_not_found() {
    let app = TestApp::new().await;
    let (_, token) = app.register("wario").await;
    let uri = "/users/550e8400-e29b-41d4-a716-446655440000";

    let (status, body) = app
        .send("PATCH", uri, Some(&token), Some(json!({ "username": "waluigi" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = app.send("DELETE", uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_username_login_is_rejected() {
    let app = TestApp::new().await;
    app.register("daisy").await;

    let (status, body) = app
        .send(
            "POST",
            "/users/login",
            None,
            Some(json!({ "username": "nobody", "password": "whatever123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Credentials do not match");
}

#[tokio::test]
async fn test_user_can_rename_themselves() {
    let app = TestApp::new().await;
    let (id, token) = app.register("shyguy").await;
    app.register("boo").await;

    let uri = format!("/users/{}", id);
    let (status, _) = app
        .send("PATCH", &uri, Some(&token), Some(json!({ "username": "boo" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send("PATCH", &uri, Some(&token), Some(json!({ "username": "shyguy2" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["username"], "shyguy2");
}

#[tokio::test]
async fn test_favorite_toggle_round_trip() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register("yoshi").await;
    let ids = app.seed(vec![new_game(1, "Yoshi's Island")]).await;
    let uri = format!("/games/{}/addfavorite", ids[0]);

    let (status, body) = app.send("PATCH", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["in_collection"], true);
    assert_eq!(body["response"]["saved_favorite_by"], json!([user_id]));

    let (_, body) = app.send("GET", "/favoritegames", Some(&token), None).await;
    assert_eq!(body["response"][0]["name"], "Yoshi's Island");

    let (status, body) = app.send("PATCH", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["in_collection"], false);
    assert_eq!(body["response"]["saved_favorite_by"], json!([]));

    let (_, body) = app.send("GET", "/favoritegames", Some(&token), None).await;
    assert_eq!(body["response"], json!([]));
}

#[tokio::test]
async fn test_collections_are_independent() {
    let app = TestApp::new().await;
    let (_, token) = app.register("kirby").await;
    let ids = app.seed(vec![new_game(1, "Kirby's Dream Land")]).await;

    let (status, body) = app
        .send(
            "PATCH",
            &format!("/games/{}/collections/wanted", ids[0]),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["collection"], "wanted");

    let (_, wanted) = app.send("GET", "/collections/wanted", Some(&token), None).await;
    assert_eq!(wanted["response"].as_array().unwrap().len(), 1);

    let (_, played) = app.send("GET", "/collections/played", Some(&token), None).await;
    assert_eq!(played["response"], json!([]));

    let (status, _) = app
        .send("GET", "/collections/borrowed", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn numbered_games(count: i64) -> Vec<NewGame> {
    (1..=count)
        .map(|i| new_game(i, &format!("Game {:02}", i)))
        .collect()
}

#[tokio::test]
async fn test_second_page_of_ten() {
    let app = TestApp::new().await;
    app.seed(numbered_games(25)).await;

    let (status, body) = app.send("GET", "/games?page=2&size=10", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body["response"]["games"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    let expected: Vec<String> = (11..=20).map(|i| format!("Game {:02}", i)).collect();
    assert_eq!(names, expected);
    assert_eq!(body["response"]["total"], 25);
    assert_eq!(body["response"]["page"], 2);
    assert_eq!(body["response"]["size"], 10);

    let (_, body) = app.send("GET", "/games?page=3&size=20", None, None).await;
    assert_eq!(body["response"]["total"], 25);
    assert_eq!(body["response"]["games"], json!([]));
    assert_eq!(body["message"], "There are no games");
}

#[tokio::test]
async fn test_rejects_bad_pagination() {
    let app = TestApp::new().await;

    for uri in ["/games?page=abc", "/games?page=0", "/games?size=-1", "/games?size=500"] {
        let (status, body) = app.send("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn test_filters_and_distinct_values() {
    let app = TestApp::new().await;
    app.seed(vec![
        NewGame {
            genres: vec!["Puzzle".into()],
            platforms: vec!["Game Boy".into()],
            first_release_date: Some(612_000_000),
            ..new_game(1, "Tetris")
        },
        NewGame {
            genres: vec!["Platform".into()],
            platforms: vec!["NES".into(), "Game Boy".into()],
            first_release_date: Some(495_000_000),
            ..new_game(2, "Super Mario Bros.")
        },
        NewGame {
            genres: vec!["Platform".into()],
            platforms: vec!["SNES".into()],
            ..new_game(3, "Super Mario World")
        },
    ])
    .await;

    let (_, body) = app.send("GET", "/genres", None, None).await;
    assert_eq!(body["response"], json!(["Platform", "Puzzle"]));
    let (_, body) = app.send("GET", "/games/genres", None, None).await;
    assert_eq!(body["response"], json!(["Platform", "Puzzle"]));

    let (_, body) = app.send("GET", "/games/platforms", None, None).await;
    assert_eq!(body["response"], json!(["Game Boy", "NES", "SNES"]));

    let (_, body) = app.send("GET", "/games/genres/Platform", None, None).await;
    assert_eq!(body["response"]["total"], 2);

    let (_, body) = app.send("GET", "/games/platforms/Game%20Boy", None, None).await;
    assert_eq!(body["response"]["total"], 2);

    let (_, body) = app
        .send("GET", "/games?search=mario&platform=SNES", None, None)
        .await;
    assert_eq!(body["response"]["games"][0]["name"], "Super Mario World");
    assert_eq!(body["response"]["total"], 1);

    let (_, body) = app.send("GET", "/games/sort?order=desc", None, None).await;
    let names: Vec<&str> = body["response"]["games"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Tetris", "Super Mario Bros."]);

    let (status, _) = app.send("GET", "/games/sort?order=sideways", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("GET", "/games?sort=popularity", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_game_lookup() {
    let app = TestApp::new().await;
    let ids = app
        .seed(vec![NewGame {
            genres: vec!["Shooter".into()],
            ..new_game(1, "Doom")
        }])
        .await;

    let (status, body) = app.send("GET", &format!("/games/{}", ids[0]), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["name"], "Doom");

    let (_, body) = app
        .send("GET", &format!("/games/{}/genres", ids[0]), None, None)
        .await;
    assert_eq!(body["response"], json!(["Shooter"]));

    let (status, body) = app
        .send("GET", "/games/550e8400-e29b-41d4-a716-446655440000", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

struct FixedImages(Result<&'static str, ()>);

#[async_trait]
impl ImageGenerator for FixedImages {
    async fn generate(&self, _prompt: &str) -> Result<String, ImageError> {
        self.0.map(String::from).map_err(|_| ImageError::Empty)
    }
}

#[tokio::test]
async fn test_image_generation() {
    let unconfigured = TestApp::new().await;
    let (status, _) = unconfigured
        .send("POST", "/create", None, Some(json!({ "prompt": "a castle" })))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let app = TestApp::with_state(|state| {
        state.with_image_generator(Arc::new(FixedImages(Ok("https://img.example/castle.png"))))
    })
    .await;
    let (status, body) = app
        .send("POST", "/create", None, Some(json!({ "prompt": "a castle" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["url"], "https://img.example/castle.png");

    let (status, _) = app
        .send("POST", "/create", None, Some(json!({ "prompt": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let failing =
        TestApp::with_state(|state| state.with_image_generator(Arc::new(FixedImages(Err(())))))
            .await;
    let (status, body) = failing
        .send("POST", "/create", None, Some(json!({ "prompt": "a castle" })))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "external_service_error");
}

struct SingleGameProvider;

#[async_trait]
impl GameProvider for SingleGameProvider {
    async fn fetch_games(&self, offset: u64, _limit: u32) -> Result<Vec<ProviderGame>, ProviderError> {
        if offset > 0 {
            return Ok(Vec::new());
        }
        Ok(vec![ProviderGame {
            id: 1020,
            name: "Grand Theft Auto V".to_string(),
            ..Default::default()
        }])
    }

    async fn best_rating(&self, _game_id: i64) -> Result<Option<f64>, ProviderError> {
        Ok(Some(96.0))
    }
}

#[tokio::test]
async fn test_fetch_games_runs_once_at_a_time() {
    let app = TestApp::with_state(|mut state| {
        state.config.igdb.delay_ms = 0;
        state.with_provider(Arc::new(SingleGameProvider))
    })
    .await;
    let (_, token) = app.register("samus").await;

    let (status, _) = app.send("GET", "/fetch-games", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let held = app.state.ingestion.try_acquire().unwrap();
    let (status, body) = app.send("GET", "/fetch-games", Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    drop(held);

    let (status, body) = app.send("GET", "/fetch-games", Some(&token), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Game ingestion started");

    for _ in 0..100 {
        if !app.state.ingestion.is_running() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(!app.state.ingestion.is_running());
    assert_eq!(db::count_games(&app.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_fetch_games_honours_admin_token() {
    let app = TestApp::with_state(|mut state| {
        state.config.auth.admin_token = Some("s3cret-admin".to_string());
        state.with_provider(Arc::new(SingleGameProvider))
    })
    .await;
    let (_, token) = app.register("link").await;

    let (status, _) = app.send("GET", "/fetch-games", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Hold the run flag so no background task touches the database
    let _held = app.state.ingestion.try_acquire().unwrap();
    let (status, _) = app
        .send("GET", "/fetch-games", Some("s3cret-admin"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_fetch_games_without_provider() {
    let app = TestApp::new().await;
    let (_, token) = app.register("zelda").await;

    let (status, _) = app.send("GET", "/fetch-games", Some(&token), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
