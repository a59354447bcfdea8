use axum::{
    extract::{Query, State},
    Json,
};
use tracing::{debug, instrument};

use super::{
    dto::{Pagination, QueuedEpisodeItem},
    repo,
};
use crate::{auth::extractors::CurrentUser, error::AppResult, state::AppState};

/// GET /queued_episodes
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_queued_episodes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(p): Query<Pagination>,
) -> AppResult<Json<Vec<QueuedEpisodeItem>>> {
    let (limit, offset) = p.clamped();
    let rows = repo::list_by_user(&state.db, user.id, limit, offset).await?;
    debug!(count = rows.len(), "queued episodes listed");
    Ok(Json(rows.into_iter().map(QueuedEpisodeItem::from).collect()))
}
