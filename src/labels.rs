use std::collections::HashMap;

use crate::normalize::normalize;
use crate::sheets::{DataRecord, ProvisionRecord};

/// Prefix the classifier prepends to every code it emits.
pub const LABEL_PREFIX: &str = "__label__";

/// One classifier label and the human-readable text it resolves to.
#[derive(Debug, Clone)]
pub struct LabelEntry {
    pub identifier: String,
    pub readable: String,
}

/// Identifier → readable-label mapping, built once at startup and read-only
/// for the life of the process.
#[derive(Debug, Clone)]
pub struct LabelTable {
    entries: HashMap<String, String>,
}

impl LabelTable {
    /// Left-join the data rows against the provision reference and collect
    /// the label mapping. Duplicate identifiers keep the last row seen.
    pub fn build(data: &[DataRecord], provisions: &[ProvisionRecord]) -> Self {
        let mut reference_keys: HashMap<(&str, &str), u32> = HashMap::new();
        for p in provisions {
            // Blank keys never match, mirroring how the source sheets treat
            // missing values in the join.
            if let (Some(name), Some(specialty)) = (&p.provision, &p.provision_specialty) {
                *reference_keys
                    .entry((name.as_str(), specialty.as_str()))
                    .or_default() += 1;
            }
        }

        let mut entries = HashMap::new();
        let mut matched = 0usize;
        let mut unmatched = 0usize;
        let mut skipped = 0usize;
        for record in data {
            let fan_out = match (&record.provision, &record.provision_specialty) {
                (Some(p), Some(s)) => reference_keys
                    .get(&(p.as_str(), s.as_str()))
                    .copied()
                    .unwrap_or(0),
                _ => 0,
            };
            if fan_out > 0 {
                matched += 1;
            } else {
                unmatched += 1;
            }

            let Some(entry) = entry_for(record) else {
                skipped += 1;
                continue;
            };
            // The readable text draws only on the data side of the join, so a
            // duplicated reference key repeats identical rows and last-write-
            // wins keeps the mapping stable.
            entries.insert(entry.identifier, entry.readable);
        }

        tracing::info!(
            "Joined provision reference: {} matched, {} unmatched data rows",
            matched,
            unmatched
        );
        if skipped > 0 {
            tracing::info!("Skipped {} data rows with blank code", skipped);
        }

        Self { entries }
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    /// Identifiers the table has never seen resolve to themselves, so a
    /// prediction is always displayable.
    pub fn resolve<'a>(&'a self, identifier: &'a str) -> &'a str {
        self.get(identifier).unwrap_or(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry_for(record: &DataRecord) -> Option<LabelEntry> {
    let code = record.code.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let provision = normalize(&record.provider_provision);
    let specialty = normalize(&record.provider_provision_specialty);
    Some(LabelEntry {
        identifier: format!("{LABEL_PREFIX}{code}"),
        readable: format!("{provision} {specialty}"),
    })
}
