//! API service routes

use auth::middleware::{authenticate, rate_limit, require_admin};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use std::path::Path as FsPath;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{SearchQuery, SongPayload},
};

/// Create the router for the API service
///
/// Unknown paths fall through to the static frontend in `static_dir`, with
/// `index.html` served for client-side routes. Every request counts against
/// the global limiter; song routes also count against the song limiter.
pub fn create_router(state: AppState, static_dir: &FsPath) -> Router {
    let admin_song_routes = Router::new()
        .route("/songs", axum::routing::post(create_song))
        .route(
            "/songs/:id",
            axum::routing::put(update_song).delete(delete_song),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .route_layer(middleware::from_fn_with_state(
            state.song_limiter.clone(),
            rate_limit,
        ));

    let public_song_routes = Router::new()
        .route("/songs", get(get_songs))
        .route("/songs/search", get(search_songs))
        .route("/songs/:id", get(get_song))
        .route_layer(middleware::from_fn_with_state(
            state.song_limiter.clone(),
            rate_limit,
        ));

    let frontend =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let global_limiter = state.global_limiter.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/check", get(check))
        .merge(public_song_routes)
        .merge(admin_song_routes)
        .with_state(state.clone())
        .merge(auth::routes::create_router(state.auth))
        .fallback_service(frontend)
        .layer(middleware::from_fn_with_state(global_limiter, rate_limit))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(
                "default-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https: http:",
            ),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Plain-text liveness probe
pub async fn check() -> &'static str {
    "Server is on..."
}

/// Get all songs
pub async fn get_songs(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let songs = state.songs.get_all().await.map_err(|e| {
        error!("Failed to get songs: {}", e);
        ApiError::Internal("Server error")
    })?;

    Ok(Json(json!({ "success": true, "data": songs })))
}

/// Search songs by title
pub async fn search_songs(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let songs = state
        .songs
        .search_by_title(query.term())
        .await
        .map_err(|e| {
            error!("Failed to search songs: {}", e);
            ApiError::Internal("Error searching songs")
        })?;

    Ok(Json(json!({ "success": true, "data": songs })))
}

/// Get a song by ID; `data` is null when there is no such song
pub async fn get_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let song = match Uuid::parse_str(&id) {
        Ok(id) => state.songs.get_by_id(id).await.map_err(|e| {
            error!("Failed to get song: {}", e);
            ApiError::Internal("Server error")
        })?,
        Err(_) => None,
    };

    Ok(Json(json!({ "success": true, "data": song })))
}

/// Create a new song
pub async fn create_song(
    State(state): State<AppState>,
    payload: Result<Json<SongPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let input = payload.validate().map_err(ApiError::BadRequest)?;

    let song = state.songs.create(&input).await.map_err(|e| {
        error!("Failed to create song: {}", e);
        ApiError::Internal("Error while creating new song")
    })?;

    info!("Created song {} ({})", song.id, song.title);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": song })),
    ))
}

/// Update a song
pub async fn update_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SongPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let input = payload.validate().map_err(ApiError::BadRequest)?;
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound("Song not found"))?;

    let song = state
        .songs
        .update(id, &input)
        .await
        .map_err(|e| {
            error!("Failed to update song: {}", e);
            ApiError::Internal("Error while updating song")
        })?
        .ok_or(ApiError::NotFound("Song not found"))?;

    info!("Updated song {}", song.id);

    Ok(Json(json!({ "success": true, "data": song })))
}

/// Delete a song
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound("Song not found"))?;

    let deleted = state.songs.delete(id).await.map_err(|e| {
        error!("Failed to delete song: {}", e);
        ApiError::Internal("Error while deleting song")
    })?;

    if !deleted {
        return Err(ApiError::NotFound("Song not found"));
    }

    info!("Deleted song {}", id);

    Ok(Json(json!({ "success": true, "message": "Song deleted" })))
}
