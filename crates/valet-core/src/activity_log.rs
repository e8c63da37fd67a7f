// ── Append-only activity log ──
//
// Lifecycle transitions land here in order. Records are never edited or
// removed; ids grow with every append.

use std::sync::Arc;

use crate::model::{ActivityId, ActivityRecord, NewActivity};
use crate::store::EntityCollection;
use crate::stream::{ActivityFilter, EntityStream};

/// The activity log, keyed and ordered by [`ActivityId`].
pub struct ActivityLog {
    records: EntityCollection<ActivityId, ActivityRecord>,
}

impl ActivityLog {
    pub(crate) fn new() -> Self {
        Self {
            records: EntityCollection::new(),
        }
    }

    /// Assign the next id and store the record. Never fails.
    pub(crate) fn append(&self, activity: NewActivity) -> ActivityRecord {
        let id = self.next_id();
        let record = activity.into_record(id);
        self.records.push(id, record.clone());
        record
    }

    /// Replace the whole log with previously stored records.
    pub(crate) fn restore(&self, records: Vec<ActivityRecord>) {
        self.records
            .replace_all(records.into_iter().map(|r| (r.id, r)));
    }

    fn next_id(&self) -> ActivityId {
        ActivityId(self.records.last().map_or(1, |r| r.id.0 + 1))
    }

    /// All records, oldest first.
    pub fn all(&self) -> Arc<Vec<Arc<ActivityRecord>>> {
        self.records.snapshot()
    }

    /// Lazily walk the records matching `filter`, oldest first.
    pub fn query<'a>(
        &self,
        filter: &'a ActivityFilter,
    ) -> impl Iterator<Item = Arc<ActivityRecord>> + use<'a> {
        let snapshot = self.records.snapshot();
        (0..snapshot.len())
            .filter_map(move |i| snapshot.get(i).filter(|r| filter.matches(r)).cloned())
    }

    /// The `limit` most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Arc<ActivityRecord>> {
        if limit == 0 {
            return Vec::new();
        }
        let newest_first = |a: &Arc<ActivityRecord>, b: &Arc<ActivityRecord>| {
            b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id))
        };
        let mut records: Vec<Arc<ActivityRecord>> =
            self.records.snapshot().iter().cloned().collect();
        if limit < records.len() {
            records.select_nth_unstable_by(limit - 1, newest_first);
            records.truncate(limit);
        }
        records.sort_by(newest_first);
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn subscribe(&self) -> EntityStream<ActivityRecord> {
        EntityStream::new(self.records.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ActivityKind, SpotId};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn seeded() -> ActivityLog {
        let log = ActivityLog::new();
        log.append(NewActivity::new(ActivityKind::Entry, "In", "", t(0)).at_spot(SpotId(4)));
        log.append(NewActivity::new(ActivityKind::Exit, "Out", "", t(90)).at_spot(SpotId(4)));
        log.append(
            NewActivity::new(ActivityKind::Payment, "Paid", "R$ 25,00", t(90)).at_spot(SpotId(4)),
        );
        log.append(NewActivity::new(ActivityKind::System, "Rates", "", t(30)));
        log
    }

    #[test]
    fn append_assigns_increasing_ids() {
        let log = seeded();
        let ids: Vec<u64> = log.all().iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn append_never_touches_existing_records() {
        let log = seeded();
        let before: Vec<ActivityRecord> = log.all().iter().map(|r| (**r).clone()).collect();
        log.append(NewActivity::new(ActivityKind::Entry, "Again", "", t(200)));
        let after: Vec<ActivityRecord> = log.all().iter().take(4).map(|r| (**r).clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn query_filters_lazily() {
        let log = seeded();
        let filter = ActivityFilter::Kind(ActivityKind::Payment);
        let payments: Vec<_> = log.query(&filter).collect();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].description, "R$ 25,00");

        let filter = ActivityFilter::Spot(4);
        assert_eq!(log.query(&filter).count(), 3);

        let filter = ActivityFilter::Between(t(0), t(90));
        assert_eq!(log.query(&filter).count(), 2);
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let log = seeded();
        let recent = log.recent(3);
        let ids: Vec<u64> = recent.iter().map(|r| r.id.0).collect();
        // Exit and payment share a timestamp; the later append wins.
        assert_eq!(ids, vec![3, 2, 4]);
        assert!(log.recent(0).is_empty());
        assert_eq!(log.recent(50).len(), 4);
    }

    #[test]
    fn recent_picks_latest_timestamps_from_unordered_appends() {
        let log = ActivityLog::new();
        for minutes in [50, 10, 40, 0, 30, 20] {
            log.append(NewActivity::new(ActivityKind::Entry, "In", "", t(minutes)));
        }
        let times: Vec<DateTime<Utc>> = log.recent(3).iter().map(|r| r.timestamp).collect();
        assert_eq!(times, vec![t(50), t(40), t(30)]);
        assert_eq!(log.all().len(), 6);
    }

    #[test]
    fn restore_continues_numbering() {
        let log = seeded();
        let records: Vec<ActivityRecord> = log.all().iter().map(|r| (**r).clone()).collect();

        let reloaded = ActivityLog::new();
        reloaded.restore(records);
        let next = reloaded.append(NewActivity::new(ActivityKind::System, "Boot", "", t(300)));
        assert_eq!(next.id, ActivityId(5));
    }
}
