//! Price book
//!
//! The account's purchase prices live in a JSON file keyed by app id text:
//!
//! ```json
//! { "10": { "paid": 4.99, "orig": 9.99 }, "20": { "paid": 0.0, "orig": 0.0 } }
//! ```
//!
//! Keys are canonicalised to [`AppId`] on load. Apps the book does not know
//! yet get an entry with their current store list price and no paid amount;
//! the book is written back so the paid amount can be filled in by hand and
//! the store is not asked again on the next run.
//!
//! A failed or timed-out store lookup leaves `orig` unset, so the app is
//! asked for again on the next run. Only a store answer without a price is
//! recorded as `0.0`.

use crate::models::{AppId, PriceRecord};
use crate::sources::{OriginalPriceSource, PriceSource};
use anyhow::{Context, Result};
use crate::error::LookupError;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_STORE_IN_FLIGHT: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    #[serde(default)]
    pub paid: Option<f64>,
    #[serde(default)]
    pub orig: Option<f64>,
}

/// Canonicalise the textual keys of a raw price book.
///
/// Keys that are not app ids are dropped with a warning. When several keys
/// name the same app (`"10"`, `" 10"`, `"010"`) the canonical spelling wins,
/// otherwise the first key in sorted order.
pub fn canonicalize(raw: BTreeMap<String, PriceEntry>) -> BTreeMap<AppId, PriceEntry> {
    let mut book = BTreeMap::new();
    for (key, entry) in raw {
        let Ok(app_id) = key.trim().parse::<AppId>() else {
            warn!(key = %key, "Ignoring price entry with invalid app id");
            continue;
        };

        if book.contains_key(&app_id) {
            warn!(key = %key, app_id, "Duplicate price entry for app");
            if key != app_id.to_string() {
                continue;
            }
        }
        book.insert(app_id, entry);
    }
    book
}

pub async fn load_book(path: &Path) -> Result<BTreeMap<AppId, PriceEntry>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        info!(file = %path.display(), "No price book yet, starting empty");
        return Ok(BTreeMap::new());
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read price book: {}", path.display()))?;
    let raw: BTreeMap<String, PriceEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse price book: {}", path.display()))?;
    Ok(canonicalize(raw))
}

pub async fn save_book(path: &Path, book: &BTreeMap<AppId, PriceEntry>) -> Result<()> {
    let content = serde_json::to_string_pretty(book).context("Failed to serialize price book")?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write price book: {}", path.display()))?;
    debug!(file = %path.display(), entries = book.len(), "Price book saved");
    Ok(())
}

/// File-backed [`PriceSource`] that fills missing list prices from `L`.
#[derive(Debug, Clone)]
pub struct PriceBook<L> {
    path: PathBuf,
    lookup: Option<L>,
    lookup_timeout: Duration,
    max_in_flight: usize,
}

impl<L: OriginalPriceSource + Sync> PriceBook<L> {
    pub fn new(path: impl Into<PathBuf>, lookup: L) -> Self {
        Self {
            path: path.into(),
            lookup: Some(lookup),
            lookup_timeout: DEFAULT_STORE_TIMEOUT,
            max_in_flight: DEFAULT_STORE_IN_FLIGHT,
        }
    }

    /// A book that never asks the store for missing prices
    pub fn offline(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lookup: None,
            lookup_timeout: DEFAULT_STORE_TIMEOUT,
            max_in_flight: DEFAULT_STORE_IN_FLIGHT,
        }
    }

    pub fn with_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Ask the store for every requested app without a known list price.
    /// Returns the number of entries added or changed.
    async fn fill_missing(&self, book: &mut BTreeMap<AppId, PriceEntry>, apps: &[AppId]) -> usize {
        let Some(lookup) = &self.lookup else {
            return 0;
        };

        let mut missing: Vec<AppId> = apps
            .iter()
            .copied()
            .filter(|app_id| book.get(app_id).map_or(true, |entry| entry.orig.is_none()))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        if missing.is_empty() {
            return 0;
        }

        info!(
            apps = missing.len(),
            in_flight = self.max_in_flight,
            "Looking up list prices"
        );
        let outcomes: Vec<(AppId, Result<f64, LookupError>)> = stream::iter(missing)
            .map(|app_id| async move {
                let price = tokio::time::timeout(self.lookup_timeout, lookup.original_price(app_id))
                    .await
                    .map_err(|_| LookupError::Timeout(self.lookup_timeout))
                    .and_then(|price| price);
                (app_id, price)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut changed = 0usize;
        for (app_id, outcome) in outcomes {
            let orig = match outcome {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!(app_id, error = %e, "List price lookup failed, will retry next run");
                    None
                }
            };

            match book.get_mut(&app_id) {
                Some(entry) => {
                    if orig.is_some() {
                        entry.orig = orig;
                        changed += 1;
                    }
                }
                None => {
                    book.insert(app_id, PriceEntry { paid: None, orig });
                    changed += 1;
                }
            }
        }
        changed
    }
}

impl<L: OriginalPriceSource + Sync> PriceSource for PriceBook<L> {
    async fn prices(&self, apps: &[AppId]) -> Result<Vec<PriceRecord>> {
        let mut book = load_book(&self.path).await?;

        let added = self.fill_missing(&mut book, apps).await;
        if added > 0 {
            save_book(&self.path, &book).await?;
        }

        let unpaid = book.values().filter(|entry| entry.paid.is_none()).count();
        if unpaid > 0 {
            warn!(
                games = unpaid,
                file = %self.path.display(),
                "Price book has games without a paid amount"
            );
        }

        Ok(book
            .into_iter()
            .map(|(app_id, entry)| PriceRecord {
                app_id,
                paid: entry.paid,
                original: entry.orig,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_keys() {
        let mut raw = BTreeMap::new();
        raw.insert("10".to_string(), PriceEntry { paid: Some(5.0), orig: Some(10.0) });
        raw.insert(" 20 ".to_string(), PriceEntry { paid: Some(1.0), orig: None });
        raw.insert("abc".to_string(), PriceEntry::default());

        let book = canonicalize(raw);
        assert_eq!(book.keys().copied().collect::<Vec<_>>(), vec![10, 20]);
        assert_eq!(book[&20].orig, None);
    }

    #[test]
    fn test_canonicalize_prefers_canonical_key() {
        let mut raw = BTreeMap::new();
        raw.insert(" 10".to_string(), PriceEntry { paid: Some(1.0), orig: None });
        raw.insert("010".to_string(), PriceEntry { paid: Some(2.0), orig: None });
        raw.insert("10".to_string(), PriceEntry { paid: Some(3.0), orig: None });
        raw.insert("020".to_string(), PriceEntry { paid: Some(4.0), orig: None });
        raw.insert(" 20".to_string(), PriceEntry { paid: Some(5.0), orig: None });

        let book = canonicalize(raw);
        assert_eq!(book.len(), 2);
        assert_eq!(book[&10].paid, Some(3.0));
        // No canonical spelling: first in sorted order (" 20" < "020")
        assert_eq!(book[&20].paid, Some(5.0));
    }
}
