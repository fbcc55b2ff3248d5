//! HTTP completion API over a [`FuzzyEntityIndex`] built once at startup.
//!
//! The index is immutable after construction and shared into every request
//! handler as an `Arc`; concurrent queries need no locking.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use cinesearch_core::{tokenizer::normalize, FuzzyEntityIndex};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

#[derive(Deserialize)]
pub struct CompletionParams {
    pub q: String,
    /// Edit-distance budget; defaults to |normalized prefix| / 4.
    pub delta: Option<u32>,
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    5
}

#[derive(Serialize)]
pub struct CompletionResponse {
    pub query: String,
    pub took_s: f64,
    pub total_matches: usize,
    pub ped_computations: usize,
    pub results: Vec<EntityHit>,
}

#[derive(Serialize)]
pub struct EntityHit {
    pub name: String,
    pub score: i64,
    pub description: String,
    pub wikipedia_url: String,
    pub wikidata_id: String,
    pub distance: u32,
    pub matched_synonym: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<FuzzyEntityIndex>,
}

pub fn build_app(index: Arc<FuzzyEntityIndex>, web_dir: Option<PathBuf>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let mut app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api", get(completion_handler))
        .with_state(AppState { index });
    if let Some(dir) = web_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(cors)
}

pub async fn completion_handler(
    State(state): State<AppState>,
    Query(params): Query<CompletionParams>,
) -> Json<CompletionResponse> {
    let start = std::time::Instant::now();
    let delta = params
        .delta
        .unwrap_or_else(|| normalize(&params.q).len() as u32 / 4);
    let (matches, ped_computations) = state.index.find_matches(&params.q, delta);

    let k = params.k.clamp(1, 100);
    let results: Vec<EntityHit> = matches
        .iter()
        .take(k)
        .map(|m| {
            let entity = state.index.entity(m.entity_id);
            EntityHit {
                name: entity.name.clone(),
                score: entity.score,
                description: entity.description.clone(),
                wikipedia_url: entity.wikipedia_url.clone(),
                wikidata_id: entity.wikidata_id.clone(),
                distance: m.distance,
                matched_synonym: m.matched_synonym.clone(),
            }
        })
        .collect();

    Json(CompletionResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_matches: matches.len(),
        ped_computations,
        results,
    })
}
