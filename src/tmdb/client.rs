use anyhow::Context;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::types::Season;
use crate::config::TmdbConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("metadata request timed out")]
    Timeout,
    #[error("metadata provider returned HTTP {0}")]
    Status(u16),
    #[error("metadata request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("metadata response was not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            // The URL carries the api key.
            FetchError::Transport(e.without_url())
        }
    }
}

#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(cfg: &TmdbConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .context("build tmdb http client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
            language: cfg.language.clone(),
        })
    }

    fn season_url(&self, show_id: u64, season_number: u32) -> String {
        format!(
            "{}/3/tv/{}/season/{}",
            self.base_url, show_id, season_number
        )
    }

    /// One GET, bounded by the client timeout. No retries.
    #[instrument(skip(self))]
    pub async fn fetch_season(
        &self,
        show_id: u64,
        season_number: u32,
    ) -> Result<Season, FetchError> {
        let res = self
            .http
            .get(self.season_url(show_id, season_number))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            warn!(%status, "tmdb returned non-success status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = res.bytes().await?;
        let season: Season = serde_json::from_slice(&body)?;
        debug!(episodes = season.episodes.len(), "tmdb season fetched");
        Ok(season)
    }
}
