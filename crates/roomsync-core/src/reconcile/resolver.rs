//! Unit resolver: map feed unit identifiers to stored units.

use std::collections::{BTreeSet, HashMap};

use crate::feed::FeedEntry;
use crate::models::Unit;
use crate::services::StoreService;
use crate::Result;

/// Units of one property keyed by trimmed external identifier
#[derive(Debug, Clone, Default)]
pub struct UnitIndex {
    by_external_id: HashMap<String, Unit>,
}

/// Feed entries grouped per matched unit, in unit order
#[derive(Debug, Clone, Default)]
pub struct ResolvedFeed {
    pub units: Vec<(Unit, Vec<FeedEntry>)>,
    /// Entries whose unit identifier matched no stored unit
    pub unmatched_entries: usize,
}

impl UnitIndex {
    /// Index units; blank or missing external identifiers are left out.
    pub fn new(units: Vec<Unit>) -> Self {
        let by_external_id = units
            .into_iter()
            .filter_map(|unit| {
                let key = unit.external_id.as_deref().map(str::trim)?;
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), unit))
            })
            .collect();
        Self { by_external_id }
    }

    pub fn get(&self, external_id: &str) -> Option<&Unit> {
        self.by_external_id.get(external_id.trim())
    }

    pub fn len(&self) -> usize {
        self.by_external_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_external_id.is_empty()
    }

    /// Group entries by matched unit, counting the ones that match nothing.
    pub fn partition(&self, entries: Vec<FeedEntry>) -> ResolvedFeed {
        let mut grouped: HashMap<String, (Unit, Vec<FeedEntry>)> = HashMap::new();
        let mut unmatched_ids = BTreeSet::new();
        let mut unmatched_entries = 0;

        for entry in entries {
            match self.get(&entry.external_unit_id) {
                Some(unit) => grouped
                    .entry(unit.id.clone())
                    .or_insert_with(|| (unit.clone(), Vec::new()))
                    .1
                    .push(entry),
                None => {
                    unmatched_entries += 1;
                    unmatched_ids.insert(entry.external_unit_id);
                }
            }
        }

        for external_id in &unmatched_ids {
            tracing::warn!(external_id = %external_id, "Feed unit matches no stored unit; skipping");
        }

        let mut units: Vec<_> = grouped.into_values().collect();
        units.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        ResolvedFeed {
            units,
            unmatched_entries,
        }
    }
}

/// Build the unit index of a property from the store.
pub async fn resolve(store: &StoreService, property_id: &str) -> Result<UnitIndex> {
    let index = UnitIndex::new(store.list_units(property_id).await?);
    tracing::debug!(property_id, units = index.len(), "Resolved feed units");
    Ok(index)
}
