use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::{instrument, warn};

use super::Season;
use crate::{auth::extractors::CurrentUser, error::AppResult, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SeasonQuery {
    #[serde(default = "default_season")]
    pub season: u32,
}
fn default_season() -> u32 {
    1
}

/// GET /shows/:show_id/season?season=N
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_season(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(show_id): Path<u64>,
    Query(q): Query<SeasonQuery>,
) -> AppResult<Json<Season>> {
    let season = state
        .tmdb
        .fetch_season(show_id, q.season)
        .await
        .map_err(|e| {
            warn!(error = %e, show_id, season = q.season, "season fetch failed");
            e
        })?;
    Ok(Json(season))
}
