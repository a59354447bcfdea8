use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

const USER_COLUMNS: &str = "id, email, password_digest, confirmation_digest, confirmed, \
     confirmed_at, last_seen_at, created_at, updated_at";

impl User {
    /// Find a user by email, ignoring case.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Uniqueness probe used inside the registration transaction.
    pub async fn email_taken(conn: &mut PgConnection, email: &str) -> sqlx::Result<bool> {
        let (taken,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))")
                .bind(email)
                .fetch_one(conn)
                .await?;
        Ok(taken)
    }

    pub async fn insert(conn: &mut PgConnection, new: &NewUser<'_>) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_digest, confirmation_digest)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.password_digest)
        .bind(new.confirmation_digest)
        .fetch_one(conn)
        .await
    }

    /// Flips an unconfirmed user to confirmed. `None` when the user was
    /// already confirmed (or no longer exists).
    pub async fn mark_confirmed(
        db: &PgPool,
        id: Uuid,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET confirmed = TRUE, confirmed_at = $2, updated_at = $2
             WHERE id = $1 AND confirmed = FALSE
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Single-column write of `last_seen_at`. Leaves `updated_at` alone and
    /// only fires when the stored value is older than `stale_before`.
    pub async fn touch_last_seen(
        db: &PgPool,
        id: Uuid,
        at: OffsetDateTime,
        stale_before: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET last_seen_at = $2
             WHERE id = $1 AND (last_seen_at IS NULL OR last_seen_at < $3)
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(stale_before)
        .execute(db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    /// Deletes the user; queued episodes go with it via `ON DELETE CASCADE`.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
