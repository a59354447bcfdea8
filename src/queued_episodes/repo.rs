use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// A queued episode joined with its episode row.
#[derive(Debug, Clone, FromRow)]
pub struct QueuedEpisodeRow {
    pub id: Uuid,
    pub queued_at: OffsetDateTime,
    pub episode_id: Uuid,
    pub tmdb_show_id: i64,
    pub season_number: i32,
    pub episode_number: i32,
    pub name: String,
    pub air_date: Option<String>,
}

/// The user's queue, newest first.
pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<QueuedEpisodeRow>> {
    let rows = sqlx::query_as::<_, QueuedEpisodeRow>(
        r#"
        SELECT q.id, q.created_at AS queued_at, e.id AS episode_id, e.tmdb_show_id,
               e.season_number, e.episode_number, e.name, e.air_date
          FROM queued_episodes q
          JOIN episodes e ON e.id = q.episode_id
         WHERE q.user_id = $1
         ORDER BY q.created_at DESC, q.id
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
