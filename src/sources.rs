//! Collaborator interfaces
//!
//! The fusion engine only sees these traits. Production implementations live
//! in [`crate::steam`], [`crate::steamcmd`] and [`crate::prices`]; tests plug
//! in in-memory sources.

use crate::error::LookupError;
use crate::models::{AppId, GameRecord, PlayerStats, PriceRecord};
use anyhow::Result;
use std::future::Future;

/// Owned-games catalog for the configured account.
pub trait CatalogSource {
    fn owned_games(&self) -> impl Future<Output = Result<Vec<GameRecord>>> + Send;
}

/// Paid and original prices for the given apps.
pub trait PriceSource {
    fn prices(&self, apps: &[AppId]) -> impl Future<Output = Result<Vec<PriceRecord>>> + Send;
}

/// Per-game achievement lookup.
pub trait AchievementSource {
    fn player_achievements(
        &self,
        app_id: AppId,
    ) -> impl Future<Output = std::result::Result<PlayerStats, LookupError>> + Send;
}

/// Current store list price, used to fill gaps in the price book.
pub trait OriginalPriceSource {
    fn original_price(
        &self,
        app_id: AppId,
    ) -> impl Future<Output = std::result::Result<f64, LookupError>> + Send;
}

/// Raw output lines of the account licensing tool.
pub trait LedgerSource {
    fn ledger_lines(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}
