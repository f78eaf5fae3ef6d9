//! Steam Web API and store client
//!
//! Thin reqwest wrapper implementing the catalog, achievement and
//! original-price sources. Base URLs come from configuration so the client
//! can be pointed at a mirror or a local stub.

use crate::config::SteamConfig;
use crate::error::LookupError;
use crate::models::{
    AppDetailsEntry, AppId, GameRecord, OwnedGamesEnvelope, PlayerStats, PlayerStatsEnvelope,
};
use crate::sources::{AchievementSource, CatalogSource, OriginalPriceSource};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("game-ledger/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct SteamClient {
    http: reqwest::Client,
    api_key: String,
    steam_id: String,
    country_code: String,
    api_base_url: String,
    store_base_url: String,
}

impl SteamClient {
    /// `request_timeout` bounds every request, including the catalog fetch.
    pub fn new(config: &SteamConfig, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            steam_id: config.steam_id.clone(),
            country_code: config.country_code.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            store_base_url: config.store_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_owned_games(&self) -> Result<Vec<GameRecord>> {
        let url = format!("{}/IPlayerService/GetOwnedGames/v1/", self.api_base_url);
        info!(steam_id = %self.steam_id, "Fetching owned games");

        let envelope: OwnedGamesEnvelope = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("steamid", self.steam_id.as_str()),
                ("include_appinfo", "1"),
                ("include_played_free_games", "1"),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Failed to fetch owned games")?
            .error_for_status()
            .context("Owned games request was rejected")?
            .json()
            .await
            .context("Failed to parse owned games JSON")?;

        let games: Vec<GameRecord> = envelope
            .response
            .games
            .into_iter()
            .map(GameRecord::from)
            .collect();

        info!(
            reported = envelope.response.game_count,
            received = games.len(),
            "Fetched owned games"
        );
        Ok(games)
    }

    async fn fetch_player_stats(&self, app_id: AppId) -> Result<PlayerStats, LookupError> {
        let url = format!(
            "{}/ISteamUserStats/GetPlayerAchievements/v0001/",
            self.api_base_url
        );
        let app = app_id.to_string();

        // Games without stats answer with an error status and a regular
        // payload, so the body is decoded regardless of status
        let body = self
            .http
            .get(&url)
            .query(&[
                ("appid", app.as_str()),
                ("key", self.api_key.as_str()),
                ("steamid", self.steam_id.as_str()),
            ])
            .send()
            .await?
            .text()
            .await?;

        let envelope: PlayerStatsEnvelope =
            serde_json::from_str(&body).map_err(|e| LookupError::Decode(e.to_string()))?;
        debug!(app_id, success = envelope.playerstats.success, "Fetched player achievements");
        Ok(envelope.playerstats)
    }

    async fn fetch_original_price(&self, app_id: AppId) -> Result<f64, LookupError> {
        let url = format!("{}/api/appdetails", self.store_base_url);
        let app = app_id.to_string();

        let details: HashMap<String, AppDetailsEntry> = self
            .http
            .get(&url)
            .query(&[("appids", app.as_str()), ("cc", self.country_code.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(details
            .get(&app)
            .map(AppDetailsEntry::original_price)
            .unwrap_or(0.0))
    }
}

impl CatalogSource for SteamClient {
    async fn owned_games(&self) -> Result<Vec<GameRecord>> {
        self.fetch_owned_games().await
    }
}

impl AchievementSource for SteamClient {
    async fn player_achievements(&self, app_id: AppId) -> Result<PlayerStats, LookupError> {
        self.fetch_player_stats(app_id).await
    }
}

impl OriginalPriceSource for SteamClient {
    async fn original_price(&self, app_id: AppId) -> Result<f64, LookupError> {
        self.fetch_original_price(app_id).await
    }
}
