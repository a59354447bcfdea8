use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::QueuedEpisodeRow;

pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
pub struct EpisodeInfo {
    pub id: Uuid,
    pub tmdb_show_id: i64,
    pub season_number: i32,
    pub episode_number: i32,
    pub name: String,
    pub air_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueuedEpisodeItem {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub queued_at: OffsetDateTime,
    pub episode: EpisodeInfo,
}

impl From<QueuedEpisodeRow> for QueuedEpisodeItem {
    fn from(r: QueuedEpisodeRow) -> Self {
        Self {
            id: r.id,
            queued_at: r.queued_at,
            episode: EpisodeInfo {
                id: r.episode_id,
                tmdb_show_id: r.tmdb_show_id,
                season_number: r.season_number,
                episode_number: r.episode_number,
                name: r.name,
                air_date: r.air_date,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    20
}

impl Pagination {
    /// Limit in `1..=MAX_LIMIT`, offset never negative.
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_LIMIT), self.offset.max(0))
    }
}
