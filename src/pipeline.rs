//! Fusion pipeline
//!
//! Orchestrates a single report run through five sequential stages:
//!
//! 1. **Fetch**: catalog, then prices, then the license ledger, then
//!    achievements for the games that expose stats
//! 2. **Parse**: ledger text into license records
//! 3. **Merge**: catalog, prices, achievements and first-matching licenses
//!    unioned by app id
//! 4. **Compute**: price-per-hour and discount for every game
//! 5. **Emit**: records sorted by app id, ready to be flattened
//!
//! No stage starts before the previous one has finished; the achievement
//! fan-out is the only concurrency inside a stage. A ledger that fails to
//! parse aborts the run, a failing achievement lookup does not.

use crate::achievements::AchievementAggregator;
use crate::config::Config;
use crate::ledger::{first_license_per_app, parse_ledger};
use crate::merge::merge_keyed;
use crate::metrics::{discount_fraction, price_per_hour, SubHourPolicy};
use crate::models::{
    AchievementRecord, AppId, Completion, FusedRecord, GameRecord, LicenseRecord, PriceRecord,
};
use crate::prices::{PriceBook, DEFAULT_STORE_IN_FLIGHT};
use crate::report::Report;
use crate::sources::{AchievementSource, CatalogSource, LedgerSource, PriceSource};
use crate::steam::SteamClient;
use crate::steamcmd::LedgerReader;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Parse,
    Merge,
    Compute,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Merge => "merge",
            Stage::Compute => "compute",
            Stage::Emit => "emit",
        };
        f.write_str(name)
    }
}

/// Output of the fetch stage
#[derive(Debug)]
pub struct Fetched {
    pub games: Vec<GameRecord>,
    pub prices: Vec<PriceRecord>,
    pub ledger_lines: Vec<String>,
    pub achievements: BTreeMap<AppId, Completion>,
}

/// Output of the parse stage
#[derive(Debug)]
pub struct Parsed {
    pub games: Vec<GameRecord>,
    pub prices: Vec<PriceRecord>,
    pub achievements: BTreeMap<AppId, Completion>,
    pub licenses: Vec<LicenseRecord>,
}

pub struct FusionPipeline<C, P, A, L> {
    catalog: C,
    prices: P,
    achievements: AchievementAggregator<A>,
    ledger: L,
    sub_hour_policy: SubHourPolicy,
}

/// The pipeline wired to the Web API, the price book and the ledger adapter
pub type SteamPipeline = FusionPipeline<SteamClient, PriceBook<SteamClient>, SteamClient, LedgerReader>;

impl SteamPipeline {
    pub fn from_config(config: &Config) -> Result<Self> {
        let lookup_timeout = Duration::from_secs(config.fetch.lookup_timeout_secs);
        let client = SteamClient::new(&config.steam, lookup_timeout)?;
        let aggregator = AchievementAggregator::new(client.clone())
            .with_timeout(lookup_timeout)
            .with_max_in_flight(config.fetch.max_concurrent_lookups);
        let price_book = PriceBook::new(&config.paths.prices_file, client.clone())
            .with_timeout(lookup_timeout)
            .with_max_in_flight(
                config
                    .fetch
                    .max_concurrent_lookups
                    .unwrap_or(DEFAULT_STORE_IN_FLIGHT),
            );

        Ok(FusionPipeline::new(
            client,
            price_book,
            aggregator,
            LedgerReader::from_config(&config.ledger, &config.steam.login),
        )
        .with_sub_hour_policy(config.report.sub_hour_policy))
    }
}

impl<C, P, A, L> FusionPipeline<C, P, A, L>
where
    C: CatalogSource,
    P: PriceSource,
    A: AchievementSource,
    L: LedgerSource,
{
    pub fn new(catalog: C, prices: P, achievements: AchievementAggregator<A>, ledger: L) -> Self {
        Self {
            catalog,
            prices,
            achievements,
            ledger,
            sub_hour_policy: SubHourPolicy::default(),
        }
    }

    pub fn with_sub_hour_policy(mut self, policy: SubHourPolicy) -> Self {
        self.sub_hour_policy = policy;
        self
    }

    /// Run all stages and return the fused report
    pub async fn run(&self) -> Result<Report> {
        let run_id = Uuid::new_v4();
        let span = info_span!("fusion_run", %run_id);

        async {
            info!(stage = %Stage::Fetch, "Starting stage");
            let fetched = self.fetch().await?;

            info!(stage = %Stage::Parse, "Starting stage");
            let parsed = parse(fetched)?;

            info!(stage = %Stage::Merge, "Starting stage");
            let merged = merge(parsed);

            info!(stage = %Stage::Compute, "Starting stage");
            let computed = compute(merged, self.sub_hour_policy);

            info!(stage = %Stage::Emit, "Starting stage");
            let report = emit(computed);

            info!(games = report.len(), "Report assembled");
            Ok::<_, anyhow::Error>(report)
        }
        .instrument(span)
        .await
    }

    async fn fetch(&self) -> Result<Fetched> {
        let games = self
            .catalog
            .owned_games()
            .await
            .context("Failed to fetch owned games")?;
        let app_ids: Vec<AppId> = games.iter().map(|g| g.app_id).collect();

        let prices = self
            .prices
            .prices(&app_ids)
            .await
            .context("Failed to load prices")?;

        let ledger_lines = self
            .ledger
            .ledger_lines()
            .await
            .context("Failed to read license ledger")?;

        let with_stats = games
            .iter()
            .filter(|g| g.has_community_visible_stats)
            .map(|g| g.app_id);
        let achievements = self.achievements.aggregate(with_stats).await;

        debug!(
            games = games.len(),
            prices = prices.len(),
            ledger_lines = ledger_lines.len(),
            achievements = achievements.len(),
            "Fetch stage complete"
        );

        Ok(Fetched {
            games,
            prices,
            ledger_lines,
            achievements,
        })
    }
}

/// Parse the ledger text; a malformed ledger fails the run
pub fn parse(fetched: Fetched) -> Result<Parsed> {
    let licenses = parse_ledger(&fetched.ledger_lines).context("Failed to parse license ledger")?;
    debug!(licenses = licenses.len(), "Parse stage complete");

    Ok(Parsed {
        games: fetched.games,
        prices: fetched.prices,
        achievements: fetched.achievements,
        licenses,
    })
}

/// Union every source by app id, keeping only games from the catalog
pub fn merge(parsed: Parsed) -> BTreeMap<AppId, FusedRecord> {
    let catalog: BTreeSet<AppId> = parsed.games.iter().map(|g| g.app_id).collect();

    let license_records: Vec<FusedRecord> = first_license_per_app(&parsed.licenses)
        .into_iter()
        .map(|(app_id, license)| FusedRecord::from_license(app_id, license))
        .collect();

    let mut merged = merge_keyed(vec![
        parsed.games.into_iter().map(FusedRecord::from).collect::<Vec<_>>(),
        parsed.prices.into_iter().map(FusedRecord::from).collect(),
        parsed
            .achievements
            .into_iter()
            .map(|(app_id, completion)| FusedRecord::from(AchievementRecord { app_id, completion }))
            .collect(),
        license_records,
    ]);

    let before = merged.len();
    merged.retain(|app_id, _| catalog.contains(app_id));
    debug!(
        games = merged.len(),
        outside_catalog = before - merged.len(),
        "Merge stage complete"
    );
    merged
}

/// Fill the derived metrics of every record
pub fn compute(
    mut merged: BTreeMap<AppId, FusedRecord>,
    policy: SubHourPolicy,
) -> BTreeMap<AppId, FusedRecord> {
    for record in merged.values_mut() {
        let Some(paid) = record.paid else {
            record.price_per_hour = None;
            record.discount = None;
            continue;
        };

        record.price_per_hour = record
            .playtime_minutes
            .map(|minutes| price_per_hour(paid, minutes, policy));
        record.discount = Some(discount_fraction(paid, record.original_price));
    }
    merged
}

/// Records in ascending app id order
pub fn emit(computed: BTreeMap<AppId, FusedRecord>) -> Report {
    Report::new(computed.into_values().collect())
}
