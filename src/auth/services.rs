use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::{
    auth::{
        password::CredentialStore,
        repo_types::{NewUser, User},
        token::new_token,
    },
    error::{AppError, FieldError},
    mailer::NotificationDeliveryError,
    state::AppState,
};

pub const EMAIL_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;

/// `last_seen_at` is written at most once per this window.
pub const LAST_SEEN_THROTTLE: Duration = Duration::minutes(15);

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"(?i)\A[a-z0-9_+\-.]+@[a-z0-9\-.]+\.[a-z]+\z").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks every input constraint that doesn't need the database and returns
/// all violations, not just the first.
pub fn validate_registration(email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if email.is_empty() {
        errors.push(FieldError::new("email", "can't be blank"));
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        errors.push(FieldError::new(
            "email",
            format!("is too long (maximum is {EMAIL_MAX_LEN} characters)"),
        ));
    }
    if !is_valid_email(email) {
        errors.push(FieldError::new("email", "is invalid"));
    }

    let password_len = password.chars().count();
    if password.is_empty() {
        errors.push(FieldError::new("password", "can't be blank"));
    } else if password_len < PASSWORD_MIN_LEN {
        errors.push(FieldError::new(
            "password",
            format!("is too short (minimum is {PASSWORD_MIN_LEN} characters)"),
        ));
    } else if password_len > PASSWORD_MAX_LEN {
        errors.push(FieldError::new(
            "password",
            format!("is too long (maximum is {PASSWORD_MAX_LEN} characters)"),
        ));
    }

    errors
}

fn email_taken() -> FieldError {
    FieldError::new("email", "has already been taken")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    Failed(String),
}

#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub notification: NotificationOutcome,
}

/// Creates an unconfirmed user and sends the confirmation email.
///
/// Validation, digest assignment and the insert happen in one transaction.
/// The email goes out only after commit; a delivery failure leaves the user
/// in place and is reported through [`NotificationOutcome::Failed`].
pub async fn register(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Registration, AppError> {
    let email = normalize_email(email);
    let mut errors = validate_registration(&email, password);

    // A malformed email can't collide with a stored one; skip the lookup.
    if errors.iter().any(|e| e.field == "email") {
        warn!(email = %email, violations = errors.len(), "registration rejected");
        return Err(AppError::Validation(errors));
    }

    let mut tx = state.db.begin().await?;
    if User::email_taken(&mut *tx, &email).await? {
        errors.push(email_taken());
    }
    if !errors.is_empty() {
        tx.rollback().await?;
        warn!(email = %email, violations = errors.len(), "registration rejected");
        return Err(AppError::Validation(errors));
    }

    let password_digest = state.credentials.hash(password)?;
    let confirmation_token = new_token();
    let confirmation_digest = state.credentials.hash(&confirmation_token)?;

    let new_user = NewUser {
        email: &email,
        password_digest: &password_digest,
        confirmation_digest: &confirmation_digest,
    };
    let user = match User::insert(&mut *tx, &new_user).await {
        Ok(u) => u,
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            // Lost a race with a concurrent registration of the same email.
            tx.rollback().await?;
            return Err(AppError::Validation(vec![email_taken()]));
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    let notification = match state
        .mailer
        .send_confirmation(&user, &confirmation_token)
        .await
    {
        Ok(()) => NotificationOutcome::Sent,
        Err(e) => {
            let err = NotificationDeliveryError {
                email: user.email.clone(),
                reason: format!("{e:#}"),
            };
            warn!(user_id = %user.id, error = %err, "confirmation email failed");
            NotificationOutcome::Failed(err.to_string())
        }
    };

    Ok(Registration { user, notification })
}

/// True when `candidate` matches the user's confirmation digest.
pub fn authenticate_token(credentials: &CredentialStore, user: &User, candidate: &str) -> bool {
    credentials.verify(candidate, user.confirmation_digest.as_deref())
}

/// Confirms the account. Only the first call stamps `confirmed_at`; later
/// calls return the stored user unchanged.
pub async fn activate(db: &PgPool, user: &User) -> anyhow::Result<User> {
    if let Some(updated) = User::mark_confirmed(db, user.id, OffsetDateTime::now_utc()).await? {
        info!(user_id = %updated.id, "account confirmed");
        return Ok(updated);
    }
    debug!(user_id = %user.id, "account already confirmed");
    User::find_by_id(db, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} disappeared during activation", user.id))
}

/// Whether `last_seen_at` is due for a refresh at `now`.
pub fn last_seen_is_stale(last_seen_at: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    match last_seen_at {
        None => true,
        Some(seen) => seen < now - LAST_SEEN_THROTTLE,
    }
}

/// Refreshes `last_seen_at` on `user` when stale. Best effort: errors are
/// logged and the in-memory user is left as it was.
pub async fn touch_last_seen(db: &PgPool, user: &mut User) {
    let now = OffsetDateTime::now_utc();
    if !last_seen_is_stale(user.last_seen_at, now) {
        return;
    }
    match User::touch_last_seen(db, user.id, now, now - LAST_SEEN_THROTTLE).await {
        Ok(true) => {
            debug!(user_id = %user.id, "last_seen_at refreshed");
            user.last_seen_at = Some(now);
        }
        Ok(false) => {}
        Err(e) => warn!(error = %e, user_id = %user.id, "last_seen_at update failed"),
    }
}
