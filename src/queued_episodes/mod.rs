mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::{routing::get, Router};

pub use dto::{Pagination, QueuedEpisodeItem};
pub use repo::QueuedEpisodeRow;

pub fn router() -> Router<AppState> {
    Router::new().route("/queued_episodes", get(handlers::list_queued_episodes))
}
