pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod queued_episodes;
pub mod state;
pub mod tmdb;

pub use app::build_app;
pub use state::AppState;
