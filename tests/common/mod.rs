#![allow(dead_code)]

use anyhow::Result;
use game_ledger::achievements::AchievementAggregator;
use game_ledger::error::LookupError;
use game_ledger::models::{Achievement, AppId, GameRecord, PlayerStats, PriceRecord};
use game_ledger::sources::{AchievementSource, CatalogSource, LedgerSource, PriceSource};
use game_ledger::FusionPipeline;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const STEAM_ID: &str = "76561197960287930";

pub fn game(app_id: AppId, name: &str, minutes: u64, with_stats: bool) -> GameRecord {
    GameRecord {
        app_id,
        name: name.to_string(),
        playtime_minutes: minutes,
        icon: Some(format!("icon{}", app_id)),
        has_community_visible_stats: with_stats,
    }
}

pub fn price(app_id: AppId, paid: Option<f64>, original: Option<f64>) -> PriceRecord {
    PriceRecord {
        app_id,
        paid,
        original,
    }
}

pub struct FakeCatalog(pub Vec<GameRecord>);

impl CatalogSource for FakeCatalog {
    async fn owned_games(&self) -> Result<Vec<GameRecord>> {
        Ok(self.0.clone())
    }
}

pub struct FakePrices(pub Vec<PriceRecord>);

impl PriceSource for FakePrices {
    async fn prices(&self, _apps: &[AppId]) -> Result<Vec<PriceRecord>> {
        Ok(self.0.clone())
    }
}

/// Achievement counts per app; apps without an entry fail their lookup
#[derive(Default)]
pub struct FakeAchievements(pub HashMap<AppId, (usize, usize)>);

impl FakeAchievements {
    pub fn with(mut self, app_id: AppId, achieved: usize, total: usize) -> Self {
        self.0.insert(app_id, (achieved, total));
        self
    }
}

impl AchievementSource for FakeAchievements {
    async fn player_achievements(&self, app_id: AppId) -> Result<PlayerStats, LookupError> {
        let (achieved, total) = self
            .0
            .get(&app_id)
            .copied()
            .ok_or_else(|| LookupError::Decode(format!("no stats scripted for {}", app_id)))?;

        Ok(PlayerStats {
            success: true,
            game_name: None,
            achievements: Some(
                (0..total)
                    .map(|i| Achievement {
                        apiname: Some(format!("ach_{}", i)),
                        achieved: i < achieved,
                    })
                    .collect(),
            ),
            error: None,
        })
    }
}

pub struct FakeLedger(pub Vec<String>);

impl LedgerSource for FakeLedger {
    async fn ledger_lines(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

pub type FakePipeline = FusionPipeline<FakeCatalog, FakePrices, FakeAchievements, FakeLedger>;

pub fn pipeline(
    games: Vec<GameRecord>,
    prices: Vec<PriceRecord>,
    achievements: FakeAchievements,
    ledger: Vec<String>,
) -> FakePipeline {
    FusionPipeline::new(
        FakeCatalog(games),
        FakePrices(prices),
        AchievementAggregator::new(achievements),
        FakeLedger(ledger),
    )
}

/// Tool output: a preamble line carrying the marker, then one block per license
pub fn ledger(blocks: &[(u32, &str, &str, &[AppId])]) -> Vec<String> {
    let mut lines = vec![
        "Steam Console Client (c) Valve Corporation".to_string(),
        "[0] License list (1 entries):".to_string(),
    ];
    for (package, date, location, apps) in blocks {
        let list: Vec<String> = apps.iter().map(|id| format!("{}, ", id)).collect();
        lines.push(format!("License packageID {}:", package));
        lines.push(format!(
            " - State   : Active( flags 0 ) - Purchased : {} in \"{}\", Steam Store",
            date, location
        ));
        lines.push(format!(" - Apps    : {} ({} in total)", list.concat(), apps.len()));
        lines.push(" - Depots  : 1, 2,  (2 in total)".to_string());
    }
    lines
}

pub fn write_config(dir: &Path, ledger_file: &Path) -> Result<PathBuf> {
    let path = dir.join("game-ledger.toml");
    let content = format!(
        r#"
[steam]
api_key = "KEY"
steam_id = "{}"
login = ""

[ledger]
file = "{}"

[paths]
prices_file = "{}"
log_directory = "{}"
"#,
        STEAM_ID,
        ledger_file.display(),
        dir.join("prices.json").display(),
        dir.join("logs").display()
    );
    fs::write(&path, content)?;
    Ok(path)
}
