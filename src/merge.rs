//! Keyed record merger
//!
//! Unions any number of keyed record sets into one map. Sets are applied in
//! order: an unseen key inserts the record, a seen key overlays the new
//! record's present fields onto the existing one. Fields the new record does
//! not carry are left untouched, so a key that only one source knows about
//! survives as a partial record.

use crate::models::{AppId, FusedRecord};
use std::collections::BTreeMap;

/// A record that knows its join key.
pub trait Keyed {
    type Key: Ord + Clone;

    fn key(&self) -> Self::Key;
}

/// Field-wise overlay of one partial record onto another.
pub trait Merge {
    /// Overwrite every field `other` carries; keep the rest.
    fn merge_from(&mut self, other: Self);
}

/// Merge record sets in order into one map keyed by [`Keyed::key`].
pub fn merge_keyed<R, I, S>(sets: I) -> BTreeMap<R::Key, R>
where
    R: Keyed + Merge,
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = R>,
{
    let mut merged = BTreeMap::new();
    for set in sets {
        merge_into(&mut merged, set);
    }
    merged
}

/// Apply one more record set onto an existing merge result.
pub fn merge_into<R, S>(merged: &mut BTreeMap<R::Key, R>, set: S)
where
    R: Keyed + Merge,
    S: IntoIterator<Item = R>,
{
    for record in set {
        let key = record.key();
        match merged.get_mut(&key) {
            Some(existing) => existing.merge_from(record),
            None => {
                merged.insert(key, record);
            }
        }
    }
}

impl Keyed for FusedRecord {
    type Key = AppId;

    fn key(&self) -> AppId {
        self.app_id
    }
}

fn overlay<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl Merge for FusedRecord {
    fn merge_from(&mut self, other: Self) {
        overlay(&mut self.name, other.name);
        overlay(&mut self.playtime_minutes, other.playtime_minutes);
        overlay(&mut self.icon, other.icon);
        overlay(
            &mut self.has_community_visible_stats,
            other.has_community_visible_stats,
        );
        overlay(&mut self.paid, other.paid);
        overlay(&mut self.original_price, other.original_price);
        overlay(&mut self.completion, other.completion);
        overlay(&mut self.package_id, other.package_id);
        overlay(&mut self.acquired, other.acquired);
        overlay(&mut self.location, other.location);
        overlay(&mut self.license_kind, other.license_kind);
        overlay(&mut self.price_per_hour, other.price_per_hour);
        overlay(&mut self.discount, other.discount);
    }
}
