//! Diff engine: compare feed state with stored status for one unit.
//!
//! Pure functions over plain data. The feed overrides a manual `blocked`
//! with `booked` when it reports a date as occupied, and clears both
//! `booked` and `blocked` when it reports the date as free.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::feed::FeedEntry;
use crate::models::{AvailabilityRecord, AvailabilityStatus, ChangeEvent, ChangeKind};

/// Writes and change events for one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitDiff {
    /// New records for dates without a stored record
    pub inserts: Vec<AvailabilityRecord>,
    /// Existing records with a new status, keyed by record identity
    pub updates: Vec<AvailabilityRecord>,
    /// Compressed date ranges per direction; empty on a first sync
    pub events: Vec<ChangeEvent>,
}

impl UnitDiff {
    pub fn write_count(&self) -> usize {
        self.inserts.len() + self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.events.is_empty()
    }
}

/// Earliest and latest feed date, the range of stored records to compare.
pub fn feed_window(entries: &[FeedEntry]) -> Option<(NaiveDate, NaiveDate)> {
    let start = entries.iter().map(|entry| entry.date).min()?;
    let end = entries.iter().map(|entry| entry.date).max()?;
    Some((start, end))
}

/// Target status for a date, or `None` when no write is needed.
pub const fn target_status(
    current: AvailabilityStatus,
    feed_available: bool,
) -> Option<AvailabilityStatus> {
    match (feed_available, current) {
        (false, AvailabilityStatus::Available | AvailabilityStatus::Blocked) => {
            Some(AvailabilityStatus::Booked)
        }
        (true, AvailabilityStatus::Booked | AvailabilityStatus::Blocked) => {
            Some(AvailabilityStatus::Available)
        }
        _ => None,
    }
}

/// Diff one unit's feed entries against its stored records.
///
/// Duplicate feed dates collapse to the last occurrence. With `emit_events`
/// the events cover every planned write; when some writes may fail, build
/// them from the applied records with [`change_events`] instead.
pub fn diff_unit(
    unit_id: &str,
    existing: &[AvailabilityRecord],
    feed: &[FeedEntry],
    emit_events: bool,
    now: i64,
) -> UnitDiff {
    let feed_by_date: BTreeMap<NaiveDate, bool> =
        feed.iter().map(|entry| (entry.date, entry.available)).collect();
    let existing_by_date: HashMap<NaiveDate, &AvailabilityRecord> =
        existing.iter().map(|record| (record.date, record)).collect();

    let mut diff = UnitDiff::default();

    for (date, available) in feed_by_date {
        let stored = existing_by_date.get(&date).copied();
        let current = stored.map_or(AvailabilityStatus::Available, |record| record.status);
        let Some(target) = target_status(current, available) else {
            continue;
        };

        match stored {
            Some(record) => {
                let mut updated = record.clone();
                updated.status = target;
                updated.updated_at = now;
                diff.updates.push(updated);
            }
            None => {
                let mut inserted = AvailabilityRecord::new(unit_id, date, target);
                inserted.updated_at = now;
                diff.inserts.push(inserted);
            }
        }
    }

    if emit_events {
        diff.events = change_events(unit_id, diff.inserts.iter().chain(&diff.updates));
    }

    diff
}

/// Change events for written records: dates grouped by the status they moved
/// to, compressed into ranges, ordered by start date.
pub fn change_events<'a>(
    unit_id: &str,
    written: impl IntoIterator<Item = &'a AvailabilityRecord>,
) -> Vec<ChangeEvent> {
    let mut became_blocked = Vec::new();
    let mut became_available = Vec::new();
    for record in written {
        match record.status {
            AvailabilityStatus::Booked => became_blocked.push(record.date),
            AvailabilityStatus::Available => became_available.push(record.date),
            AvailabilityStatus::Blocked => {}
        }
    }
    became_blocked.sort_unstable();
    became_available.sort_unstable();

    let mut events: Vec<ChangeEvent> = [
        (ChangeKind::BecameBlocked, became_blocked),
        (ChangeKind::BecameAvailable, became_available),
    ]
    .into_iter()
    .flat_map(|(kind, dates)| {
        compress_ranges(&dates)
            .into_iter()
            .map(move |(start, end)| ChangeEvent {
                unit_id: unit_id.to_string(),
                start,
                end,
                kind,
            })
    })
    .collect();
    events.sort_by_key(|event| event.start);
    events
}

/// Compress ascending dates into inclusive ranges; a gap of more than one day
/// starts a new range.
pub fn compress_ranges(dates: &[NaiveDate]) -> Vec<(NaiveDate, NaiveDate)> {
    let mut ranges: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    for &date in dates {
        match ranges.last_mut() {
            Some((_, end)) if (date - *end).num_days() <= 1 => *end = date,
            _ => ranges.push((date, date)),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    fn feed(date: &str, available: bool) -> FeedEntry {
        FeedEntry {
            external_unit_id: "5".to_string(),
            date: day(date),
            available,
        }
    }

    fn stored(date: &str, status: AvailabilityStatus) -> AvailabilityRecord {
        AvailabilityRecord::new("u1", day(date), status)
    }

    #[test]
    fn scenario_insert_booked_on_empty_store() {
        let diff = diff_unit("u1", &[], &[feed("2026-03-01", false)], true, 7);

        assert_eq!(diff.inserts.len(), 1);
        assert_eq!(diff.inserts[0].date, day("2026-03-01"));
        assert_eq!(diff.inserts[0].status, AvailabilityStatus::Booked);
        assert_eq!(diff.inserts[0].updated_at, 7);
        assert!(diff.updates.is_empty());
        assert_eq!(
            diff.events,
            vec![ChangeEvent {
                unit_id: "u1".to_string(),
                start: day("2026-03-01"),
                end: day("2026-03-01"),
                kind: ChangeKind::BecameBlocked,
            }]
        );
    }

    #[test]
    fn first_sync_writes_without_events() {
        let diff = diff_unit("u1", &[], &[feed("2026-03-01", false)], false, 7);
        assert_eq!(diff.inserts.len(), 1);
        assert!(diff.events.is_empty());
    }

    #[test]
    fn feed_overrides_manual_block_in_both_directions() {
        let blocked = stored("2026-03-01", AvailabilityStatus::Blocked);

        let diff = diff_unit("u1", std::slice::from_ref(&blocked), &[feed("2026-03-01", false)], true, 7);
        assert_eq!(diff.updates.len(), 1);
        assert_eq!(diff.updates[0].id, blocked.id);
        assert_eq!(diff.updates[0].status, AvailabilityStatus::Booked);

        let diff = diff_unit("u1", std::slice::from_ref(&blocked), &[feed("2026-03-01", true)], true, 7);
        assert_eq!(diff.updates[0].status, AvailabilityStatus::Available);
        assert_eq!(diff.events[0].kind, ChangeKind::BecameAvailable);
    }

    #[test]
    fn updates_preserve_reservation() {
        let booked = stored("2026-03-01", AvailabilityStatus::Booked).with_reservation("res-1");
        let diff = diff_unit("u1", &[booked], &[feed("2026-03-01", true)], true, 7);
        assert_eq!(diff.updates[0].reservation_id.as_deref(), Some("res-1"));
        assert_eq!(diff.updates[0].status, AvailabilityStatus::Available);
    }

    #[test]
    fn unchanged_state_produces_nothing() {
        let existing = vec![
            stored("2026-03-01", AvailabilityStatus::Booked),
            stored("2026-03-03", AvailabilityStatus::Available),
        ];
        let entries = vec![
            feed("2026-03-01", false),
            feed("2026-03-02", true),
            feed("2026-03-03", true),
        ];
        assert!(diff_unit("u1", &existing, &entries, true, 7).is_empty());
    }

    #[test]
    fn range_compression_merges_contiguous_days() {
        let entries = vec![
            feed("2026-01-10", false),
            feed("2026-01-11", false),
            feed("2026-01-12", false),
        ];
        let diff = diff_unit("u1", &[], &entries, true, 7);
        assert_eq!(
            diff.events,
            vec![ChangeEvent {
                unit_id: "u1".to_string(),
                start: day("2026-01-10"),
                end: day("2026-01-12"),
                kind: ChangeKind::BecameBlocked,
            }]
        );
        assert_eq!(diff.events[0].nights(), 3);
    }

    #[test]
    fn compress_ranges_splits_on_gaps() {
        let dates = vec![day("2026-01-10"), day("2026-01-11"), day("2026-01-14")];
        assert_eq!(
            compress_ranges(&dates),
            vec![
                (day("2026-01-10"), day("2026-01-11")),
                (day("2026-01-14"), day("2026-01-14")),
            ]
        );
        assert!(compress_ranges(&[]).is_empty());
    }

    #[test]
    fn events_are_split_per_direction() {
        let existing = vec![stored("2026-03-02", AvailabilityStatus::Booked)];
        let entries = vec![
            feed("2026-03-01", false),
            feed("2026-03-02", true),
            feed("2026-03-03", false),
        ];
        let diff = diff_unit("u1", &existing, &entries, true, 7);
        let kinds: Vec<_> = diff.events.iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::BecameBlocked,
                ChangeKind::BecameAvailable,
                ChangeKind::BecameBlocked,
            ]
        );
        assert_eq!(diff.write_count(), 3);
    }

    #[test]
    fn duplicate_dates_collapse_to_last_occurrence() {
        let entries = vec![feed("2026-03-01", false), feed("2026-03-01", true)];
        assert!(diff_unit("u1", &[], &entries, true, 7).is_empty());
    }

    #[test]
    fn change_events_cover_only_given_records() {
        let entries = vec![
            feed("2026-03-01", false),
            feed("2026-03-02", false),
            feed("2026-03-03", false),
        ];
        let diff = diff_unit("u1", &[], &entries, true, 7);
        assert_eq!(diff.events.len(), 1);

        let landed = [&diff.inserts[0], &diff.inserts[2]];
        let events = change_events("u1", landed);
        assert_eq!(
            events
                .iter()
                .map(|event| (event.start, event.end))
                .collect::<Vec<_>>(),
            vec![
                (day("2026-03-01"), day("2026-03-01")),
                (day("2026-03-03"), day("2026-03-03")),
            ]
        );
        assert!(change_events("u1", Vec::<&AvailabilityRecord>::new()).is_empty());
    }

    #[test]
    fn feed_window_spans_entries() {
        let entries = vec![feed("2026-03-05", true), feed("2026-03-01", false)];
        assert_eq!(
            feed_window(&entries),
            Some((day("2026-03-01"), day("2026-03-05")))
        );
        assert_eq!(feed_window(&[]), None);
    }
}
