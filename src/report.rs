//! Report output
//!
//! A [`Report`] holds the fused records in ascending app id order and knows
//! how to present them:
//!
//! - **Flat cells**: twelve [`CellValue`]s per game, concatenated, the shape a
//!   spreadsheet range update expects
//! - **CSV**: the same rows with a header line
//! - **Account document**: `{ "<account id>": { "<app id>": { ... } } }` for
//!   JSON persistence
//! - **Terminal summary**: a short coloured overview

use crate::models::{AppId, CellValue, Completion, FusedRecord};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

pub const COLUMNS: [&str; 12] = [
    "Icon",
    "App ID",
    "Name",
    "Paid",
    "Hours",
    "Price/Hour",
    "Achievements",
    "Discount",
    "Package",
    "Acquired",
    "Location",
    "License",
];

pub const ACQUIRED_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

const ICON_BASE_URL: &str = "http://media.steampowered.com/steamcommunity/public/images/apps";

/// Spreadsheet formula rendering a game's icon inside its cell
pub fn icon_formula(app_id: AppId, icon: &str) -> String {
    format!("=IMAGE(\"{}/{}/{}.jpg\"; 1)", ICON_BASE_URL, app_id, icon)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    records: Vec<FusedRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub games: usize,
    #[serde(rename = "totalPaid")]
    pub total_paid: f64,
    #[serde(rename = "totalHours")]
    pub total_hours: f64,
    #[serde(rename = "averagePricePerHour")]
    pub average_price_per_hour: Option<f64>,
    #[serde(rename = "withoutPrice")]
    pub without_price: usize,
    #[serde(rename = "withoutLicense")]
    pub without_license: usize,
}

impl Report {
    /// Records are sorted by app id here so every output shape agrees
    pub fn new(mut records: Vec<FusedRecord>) -> Self {
        records.sort_by_key(|r| r.app_id);
        Self { records }
    }

    pub fn records(&self) -> &[FusedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One output row per game
    pub fn row(record: &FusedRecord) -> Vec<CellValue> {
        let completion = record
            .completion
            .as_ref()
            .and_then(Completion::ratio);

        vec![
            record
                .icon
                .as_deref()
                .map(|icon| CellValue::Text(icon_formula(record.app_id, icon)))
                .unwrap_or(CellValue::Blank),
            CellValue::Integer(i64::from(record.app_id)),
            CellValue::optional_text(record.name.as_deref()),
            CellValue::optional_number(record.paid),
            CellValue::optional_number(record.hours_played()),
            CellValue::optional_number(record.price_per_hour),
            CellValue::optional_number(completion),
            CellValue::optional_number(record.discount),
            CellValue::optional_integer(record.package_id),
            record
                .acquired
                .map(|at| CellValue::Text(at.format(ACQUIRED_FORMAT).to_string()))
                .unwrap_or(CellValue::Blank),
            CellValue::optional_text(record.location.as_deref()),
            CellValue::optional_text(record.license_kind.as_deref()),
        ]
    }

    pub fn rows(&self) -> Vec<Vec<CellValue>> {
        self.records.iter().map(Self::row).collect()
    }

    /// All rows concatenated, twelve cells per game
    pub fn cells(&self) -> Vec<CellValue> {
        self.records.iter().flat_map(Self::row).collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer
            .write_record(COLUMNS)
            .context("Failed to write CSV header")?;

        for (record, row) in self.records.iter().zip(self.rows()) {
            csv_writer
                .write_record(row.iter().map(|cell| cell.to_string()))
                .with_context(|| format!("Failed to write CSV row for app {}", record.app_id))?;
        }

        csv_writer.flush().context("Failed to flush CSV output")?;
        Ok(())
    }

    /// Fused records keyed by account and app id
    pub fn account_document<'a>(
        &'a self,
        account_id: &str,
    ) -> BTreeMap<String, BTreeMap<AppId, &'a FusedRecord>> {
        let games = self.records.iter().map(|r| (r.app_id, r)).collect();
        BTreeMap::from([(account_id.to_string(), games)])
    }

    pub fn summary(&self) -> ReportSummary {
        let total_paid = self.records.iter().filter_map(|r| r.paid).sum();
        let total_hours = self.records.iter().filter_map(|r| r.hours_played()).sum();

        let ratios: Vec<f64> = self
            .records
            .iter()
            .filter(|r| r.hours_played().is_some_and(|h| h >= 1.0))
            .filter_map(|r| r.price_per_hour)
            .collect();
        let average_price_per_hour = if ratios.is_empty() {
            None
        } else {
            Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
        };

        ReportSummary {
            games: self.records.len(),
            total_paid,
            total_hours,
            average_price_per_hour,
            without_price: self.records.iter().filter(|r| r.paid.is_none()).count(),
            without_license: self
                .records
                .iter()
                .filter(|r| r.package_id.is_none())
                .count(),
        }
    }

    pub fn display_summary(&self, account_id: &str) {
        let summary = self.summary();

        println!("\n{}", "=".repeat(60).bright_cyan());
        println!(
            "{} {}",
            "Game Library Report".bright_white().bold(),
            account_id.bright_white()
        );
        println!("{}", "=".repeat(60).bright_cyan());

        println!(
            "\n{} games • {} paid • {} played",
            summary.games.to_string().bright_white().bold(),
            format!("{:.2}", summary.total_paid).bright_green().bold(),
            format!("{:.1}h", summary.total_hours).bright_yellow().bold()
        );

        if let Some(average) = summary.average_price_per_hour {
            println!(
                "Average price per hour (games played 1h+): {}",
                format!("{:.2}", average).bright_green()
            );
        }

        if summary.without_price > 0 {
            println!(
                "{} games have no paid amount in the price book",
                summary.without_price.to_string().bright_red()
            );
        }
        if summary.without_license > 0 {
            println!(
                "{} games have no matching license",
                summary.without_license.to_string().bright_red()
            );
        }
        println!();
    }
}
