use csv::ReaderBuilder;
use parley_core::Rule;
use tracing::{debug, warn};

use crate::columns::ColumnMap;

/// Parses comma-separated rule rows. Never fails: unreadable rows (including
/// rows that are not valid UTF-8) are skipped one by one and an empty or
/// header-only source yields no rules.
pub fn parse_rules(raw: impl AsRef<[u8]>) -> Vec<Rule> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_ref());

    let columns = match reader.headers() {
        Ok(headers) => ColumnMap::resolve(headers),
        Err(error) => {
            warn!(%error, "rule source header row is unreadable");
            return Vec::new();
        }
    };

    if !columns.has_intent() {
        debug!("rule source has no intent column");
    }

    let mut rules = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                warn!(row = index + 1, %error, "skipping malformed rule row");
                continue;
            }
        };

        match columns.rule_from(&record) {
            Some(rule) => rules.push(rule),
            None => debug!(row = index + 1, "skipping rule row without intent or patterns"),
        }
    }

    rules
}
