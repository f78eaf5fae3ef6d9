//! Core Data Models
//!
//! This module defines the record types that flow through the fusion engine,
//! from raw source payloads to the flattened report cells.
//!
//! ## Data Flow
//!
//! 1. **Source payloads**: [`OwnedGamesEnvelope`], [`PlayerStatsEnvelope`],
//!    [`AppDetailsEntry`] - JSON shapes returned by the Web API and store
//! 2. **Source records**: [`GameRecord`], [`PriceRecord`], [`AchievementRecord`],
//!    [`LicenseRecord`] - typed records keyed by a canonical [`AppId`]
//! 3. **Fusion**: [`FusedRecord`] - the per-app union with derived metrics
//! 4. **Output**: [`CellValue`] - one spreadsheet cell of a flattened row
//!
//! Every key is canonicalised to [`AppId`] when a source record is built, so
//! nothing downstream ever compares a textual id with a numeric one.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Canonical identifier of a single product on the store.
pub type AppId = u32;

/// Identifier of a purchasable bundle recorded in a license entry.
pub type PackageId = u32;

/// A game from the owned-games catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub app_id: AppId,
    pub name: String,
    pub playtime_minutes: u64,
    pub icon: Option<String>,
    pub has_community_visible_stats: bool,
}

/// One license parsed from the account ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseRecord {
    pub package_id: PackageId,
    pub acquired: NaiveDateTime,
    pub location: String,
    pub kind: String,
    /// Granted apps in ledger order
    pub app_ids: Vec<AppId>,
}

/// What the account paid for a game and what the store listed it at.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub app_id: AppId,
    pub paid: Option<f64>,
    /// `None` or `0.0` means unknown or free
    pub original: Option<f64>,
}

/// Share of a game's achievements the player has unlocked.
///
/// `NotApplicable` is distinct from `Ratio(0.0)`: a game without trackable
/// stats is not a game with nothing unlocked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Completion {
    Ratio(f64),
    NotApplicable,
}

impl Completion {
    pub fn from_counts(achieved: usize, total: usize) -> Self {
        if total == 0 {
            Completion::NotApplicable
        } else {
            Completion::Ratio(achieved as f64 / total as f64)
        }
    }

    pub fn ratio(&self) -> Option<f64> {
        match self {
            Completion::Ratio(r) => Some(*r),
            Completion::NotApplicable => None,
        }
    }
}

impl Serialize for Completion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Completion::Ratio(r) => serializer.serialize_f64(*r),
            Completion::NotApplicable => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AchievementRecord {
    pub app_id: AppId,
    pub completion: Completion,
}

/// The per-app union of every source record plus derived metrics.
///
/// All fields besides the key are optional: a key present in only some
/// sources survives as a partial record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FusedRecord {
    #[serde(skip)]
    pub app_id: AppId,
    pub name: Option<String>,
    #[serde(rename = "playtimeMinutes")]
    pub playtime_minutes: Option<u64>,
    pub icon: Option<String>,
    #[serde(skip)]
    pub has_community_visible_stats: Option<bool>,
    pub paid: Option<f64>,
    #[serde(rename = "originalPrice")]
    pub original_price: Option<f64>,
    pub completion: Option<Completion>,
    #[serde(rename = "packageId")]
    pub package_id: Option<PackageId>,
    pub acquired: Option<NaiveDateTime>,
    pub location: Option<String>,
    #[serde(rename = "licenseKind")]
    pub license_kind: Option<String>,
    #[serde(rename = "pricePerHour")]
    pub price_per_hour: Option<f64>,
    pub discount: Option<f64>,
}

impl FusedRecord {
    pub fn new(app_id: AppId) -> Self {
        Self {
            app_id,
            ..Self::default()
        }
    }

    pub fn hours_played(&self) -> Option<f64> {
        self.playtime_minutes.map(|m| m as f64 / 60.0)
    }
}

impl From<GameRecord> for FusedRecord {
    fn from(game: GameRecord) -> Self {
        Self {
            name: Some(game.name),
            playtime_minutes: Some(game.playtime_minutes),
            icon: game.icon,
            has_community_visible_stats: Some(game.has_community_visible_stats),
            ..Self::new(game.app_id)
        }
    }
}

impl From<PriceRecord> for FusedRecord {
    fn from(price: PriceRecord) -> Self {
        Self {
            paid: price.paid,
            original_price: price.original,
            ..Self::new(price.app_id)
        }
    }
}

impl From<AchievementRecord> for FusedRecord {
    fn from(record: AchievementRecord) -> Self {
        Self {
            completion: Some(record.completion),
            ..Self::new(record.app_id)
        }
    }
}

impl FusedRecord {
    /// Partial record carrying the license fields for one granted app
    pub fn from_license(app_id: AppId, license: &LicenseRecord) -> Self {
        Self {
            package_id: Some(license.package_id),
            acquired: Some(license.acquired),
            location: Some(license.location.clone()),
            license_kind: Some(license.kind.clone()),
            ..Self::new(app_id)
        }
    }
}

/// A single output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Blank,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn optional_text(value: Option<&str>) -> Self {
        value.map(CellValue::text).unwrap_or(CellValue::Blank)
    }

    pub fn optional_number(value: Option<f64>) -> Self {
        value.map(CellValue::Number).unwrap_or(CellValue::Blank)
    }

    pub fn optional_integer(value: Option<u32>) -> Self {
        value
            .map(|v| CellValue::Integer(i64::from(v)))
            .unwrap_or(CellValue::Blank)
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Blank => Ok(()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Blank => serializer.serialize_none(),
        }
    }
}

// --- Web API payloads ---

#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGamesEnvelope {
    pub response: OwnedGamesResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnedGamesResponse {
    #[serde(default)]
    pub game_count: u32,
    #[serde(default)]
    pub games: Vec<OwnedGame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGame {
    pub appid: AppId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub playtime_forever: u64,
    #[serde(default)]
    pub img_icon_url: Option<String>,
    #[serde(default)]
    pub has_community_visible_stats: bool,
}

impl From<OwnedGame> for GameRecord {
    fn from(game: OwnedGame) -> Self {
        Self {
            app_id: game.appid,
            name: game.name,
            playtime_minutes: game.playtime_forever,
            icon: game.img_icon_url.filter(|s| !s.is_empty()),
            has_community_visible_stats: game.has_community_visible_stats,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerStatsEnvelope {
    pub playerstats: PlayerStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerStats {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "gameName", default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub achievements: Option<Vec<Achievement>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PlayerStats {
    /// Completion ratio, or `NotApplicable` when the game tracks no stats
    pub fn completion(&self) -> Completion {
        match (&self.achievements, self.success) {
            (Some(achievements), true) => {
                let achieved = achievements.iter().filter(|a| a.achieved).count();
                Completion::from_counts(achieved, achievements.len())
            }
            _ => Completion::NotApplicable,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Achievement {
    #[serde(default)]
    pub apiname: Option<String>,
    #[serde(deserialize_with = "flag_from_int_or_bool")]
    pub achieved: bool,
}

/// The Web API reports `achieved` as `0`/`1`; accept booleans too.
fn flag_from_int_or_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

/// One entry of the store's `appdetails` response, keyed by app id text.
#[derive(Debug, Clone, Deserialize)]
pub struct AppDetailsEntry {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<AppDetailsData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppDetailsData {
    #[serde(default)]
    pub price_overview: Option<PriceOverview>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceOverview {
    /// List price in cents
    pub initial: u64,
}

impl AppDetailsEntry {
    pub fn original_price(&self) -> f64 {
        if !self.success {
            return 0.0;
        }
        self.data
            .as_ref()
            .and_then(|d| d.price_overview.as_ref())
            .map(|p| p.initial as f64 / 100.0)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_zero_of_zero_is_not_applicable() {
        assert_eq!(Completion::from_counts(0, 0), Completion::NotApplicable);
        assert_eq!(Completion::from_counts(0, 4), Completion::Ratio(0.0));
    }

    #[test]
    fn test_player_stats_integer_flags() {
        let json = r#"{"playerstats":{"steamID":"1","gameName":"A","achievements":[
            {"apiname":"a","achieved":1,"unlocktime":1},
            {"apiname":"b","achieved":0,"unlocktime":0}],"success":true}}"#;
        let envelope: PlayerStatsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.playerstats.completion(), Completion::Ratio(0.5));
    }

    #[test]
    fn test_player_stats_without_stats() {
        let json = r#"{"playerstats":{"error":"Requested app has no stats","success":false}}"#;
        let envelope: PlayerStatsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.playerstats.completion(), Completion::NotApplicable);
    }

    #[test]
    fn test_owned_game_empty_icon() {
        let game: OwnedGame =
            serde_json::from_str(r#"{"appid":10,"name":"A","playtime_forever":30,"img_icon_url":""}"#)
                .unwrap();
        let record = GameRecord::from(game);
        assert_eq!(record.icon, None);
        assert!(!record.has_community_visible_stats);
    }

    #[test]
    fn test_app_details_price_in_cents() {
        let entry: AppDetailsEntry = serde_json::from_str(
            r#"{"success":true,"data":{"price_overview":{"currency":"EUR","initial":1999,"final":999}}}"#,
        )
        .unwrap();
        assert_eq!(entry.original_price(), 19.99);

        let missing: AppDetailsEntry = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(missing.original_price(), 0.0);
    }

    #[test]
    fn test_cell_serialization() {
        let cells = vec![
            CellValue::text("A"),
            CellValue::Integer(10),
            CellValue::Number(0.5),
            CellValue::Blank,
        ];
        assert_eq!(serde_json::to_string(&cells).unwrap(), r#"["A",10,0.5,null]"#);
    }
}
