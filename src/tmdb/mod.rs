//! Client for The Movie Database (TMDB) season metadata.

mod client;
pub mod handlers;
mod types;

use axum::{routing::get, Router};

use crate::state::AppState;

pub use client::{FetchError, TmdbClient};
pub use types::{EpisodeSummary, Season};

pub fn router() -> Router<AppState> {
    Router::new().route("/shows/:show_id/season", get(handlers::get_season))
}
