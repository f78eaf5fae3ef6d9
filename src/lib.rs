//! Game Ledger Library
//!
//! Fuses what a game account knows about its library into one record per
//! game: the owned-games catalog, a hand-maintained price book, per-game
//! achievement completion and the account's license ledger as printed by the
//! licensing tool. Derived metrics (price per hour played, discount) are
//! computed on the fused records and the result is flattened into
//! spreadsheet-ready rows.
//!
//! ## Core Features
//!
//! - **Ledger parsing**: line-oriented license blocks into typed records, with
//!   precise errors for truncated or malformed blocks
//! - **Keyed merging**: an ordered union of partial records by app id, later
//!   sources overwriting the fields they carry
//! - **Concurrent achievement lookups**: one request per game, each isolated
//!   behind its own timeout
//! - **Flexible output**: flat cell lists, CSV and account-keyed JSON
//!
//! ## Architecture Overview
//!
//! - [`models`] - Source records, fused records and wire payloads
//! - [`ledger`] - License ledger parser
//! - [`merge`] - Keyed record merger
//! - [`achievements`] - Concurrent achievement aggregation
//! - [`metrics`] - Price-per-hour and discount calculation
//! - [`pipeline`] - The fetch, parse, merge, compute, emit sequence
//! - [`report`] - Row layout, CSV and JSON output
//! - [`sources`] - Collaborator traits the pipeline is generic over
//! - [`steam`], [`steamcmd`], [`prices`] - Production collaborators
//! - [`config`] - Configuration with environment variable overrides
//! - [`logging`] - Structured logging with JSON and pretty-print formats
//!
//! ## Main Entry Point
//!
//! ```rust,no_run
//! use game_ledger::{config::Config, pipeline::SteamPipeline};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! let report = SteamPipeline::from_config(&config)?.run().await?;
//! let cells = report.cells();
//! # Ok(())
//! # }
//! ```

pub mod achievements;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod merge;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod prices;
pub mod report;
pub mod sources;
pub mod steam;
pub mod steamcmd;

pub use pipeline::{FusionPipeline, SteamPipeline};
pub use report::Report;
