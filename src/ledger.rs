//! License ledger parser
//!
//! Turns the text printed by the account tool's `licenses_print` command into
//! [`LicenseRecord`]s. The tool prints a preamble and then one block per
//! license:
//!
//! ```text
//! License packageID 1234:
//!  - State   : Active( flags 0 ) - Purchased : Tue Jun 10 08:00:00 2014 in "USA", Complimentary
//!  - Apps    : 440, 450, 570,  (3 in total)
//!  - Depots  : ...
//! ```
//!
//! The preamble contains a header line that carries the same marker as a real
//! block, so the first marker is always skipped. Any block that does not have
//! the expected fields is a format change in the tool and fails the parse.
//!
//! This module is pure: it never runs the tool itself (see [`crate::steamcmd`]).

use crate::error::LedgerError;
use crate::models::{AppId, LicenseRecord};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::debug;

pub const LICENSE_MARKER: &str = "License";
const BLOCK_LINES: usize = 3;
const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Parse every license block in ledger order.
pub fn parse_ledger<S: AsRef<str>>(lines: &[S]) -> Result<Vec<LicenseRecord>, LedgerError> {
    let markers: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.as_ref().contains(LICENSE_MARKER))
        .map(|(index, _)| index)
        .collect();

    let licenses = markers
        .into_iter()
        .skip(1)
        .map(|start| parse_block(lines, start))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(licenses = licenses.len(), lines = lines.len(), "Parsed license ledger");
    Ok(licenses)
}

/// Map every granted app to the first license in ledger order that grants it.
pub fn first_license_per_app(licenses: &[LicenseRecord]) -> BTreeMap<AppId, &LicenseRecord> {
    let mut index = BTreeMap::new();
    for license in licenses {
        for app_id in &license.app_ids {
            index.entry(*app_id).or_insert(license);
        }
    }
    index
}

fn parse_block<S: AsRef<str>>(lines: &[S], start: usize) -> Result<LicenseRecord, LedgerError> {
    let available = lines.len() - start;
    if available < BLOCK_LINES {
        return Err(LedgerError::TruncatedBlock {
            line: start + 1,
            expected: BLOCK_LINES,
            found: available,
        });
    }

    let header = Line::new(lines[start].as_ref(), start);
    let detail = Line::new(lines[start + 1].as_ref(), start + 1);
    let grants = Line::new(lines[start + 2].as_ref(), start + 2);

    let package_token = integer_tokens(header.text)
        .next()
        .ok_or_else(|| header.missing("package id"))?;
    let package_id = header.parse_id(package_token, "package id")?;

    let acquired = parse_timestamp(&detail)?;
    let location = quoted(detail.text)
        .ok_or_else(|| detail.missing("acquisition location"))?
        .to_string();
    let kind = detail
        .text
        .rfind(", ")
        .map(|pos| detail.text[pos + 2..].trim())
        .filter(|kind| !kind.is_empty())
        .ok_or_else(|| detail.missing("license kind"))?
        .to_string();

    let mut app_tokens: Vec<&str> = integer_tokens(grants.text).collect();
    // The last integer is the tool's "(N in total)" counter, not an app
    if app_tokens.pop().is_none() {
        return Err(grants.missing("app id list"));
    }
    let app_ids = app_tokens
        .into_iter()
        .map(|token| grants.parse_id(token, "app id"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LicenseRecord {
        package_id,
        acquired,
        location,
        kind,
        app_ids,
    })
}

/// A ledger line together with its 1-based position, for error reporting
struct Line<'a> {
    text: &'a str,
    number: usize,
}

impl<'a> Line<'a> {
    fn new(text: &'a str, index: usize) -> Self {
        Self {
            text: text.trim_end_matches(['\r', '\n']),
            number: index + 1,
        }
    }

    fn missing(&self, field: &'static str) -> LedgerError {
        LedgerError::MissingField {
            line: self.number,
            field,
            content: self.text.to_string(),
        }
    }

    fn parse_id(&self, token: &str, field: &'static str) -> Result<u32, LedgerError> {
        token.parse().map_err(|_| LedgerError::IdOutOfRange {
            line: self.number,
            field,
            value: token.to_string(),
        })
    }
}

/// Timestamp sits between the last ` : ` before the location and the ` in `
fn parse_timestamp(detail: &Line<'_>) -> Result<NaiveDateTime, LedgerError> {
    let before_location = detail.text.split('"').next().unwrap_or_default();
    let raw = before_location
        .rfind(" : ")
        .map(|pos| &before_location[pos + 3..])
        .and_then(|rest| rest.find(" in ").map(|end| &rest[..end]))
        .ok_or_else(|| detail.missing("acquisition timestamp"))?;

    // The tool pads single-digit days with a second space
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT).map_err(|e| {
        LedgerError::InvalidTimestamp {
            line: detail.number,
            value: raw.trim().to_string(),
            reason: e.to_string(),
        }
    })
}

fn quoted(text: &str) -> Option<&str> {
    let open = text.find('"')?;
    let rest = &text[open + 1..];
    let close = rest.find('"')?;
    Some(&rest[..close])
}

/// Maximal runs of ASCII digits, in order of appearance
fn integer_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|token| !token.is_empty())
}
