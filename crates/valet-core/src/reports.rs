//! Daily, weekly and monthly aggregation over the activity log.
//!
//! Day, week and month boundaries are computed in UTC. Revenue is the sum
//! of the amounts embedded in payment descriptions.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::Serialize;

use crate::activity_log::ActivityLog;
use crate::error::CoreError;
use crate::model::{ActivityKind, ActivityRecord, ParkingSpot};
use crate::money;
use crate::stream::ActivityFilter;

/// Counters shared by every report granularity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodStats {
    pub entries: usize,
    pub exits: usize,
    pub payments: usize,
    pub revenue: f64,
}

impl PeriodStats {
    fn record(&mut self, activity: &ActivityRecord) {
        match activity.kind {
            ActivityKind::Entry => self.entries += 1,
            ActivityKind::Exit => self.exits += 1,
            ActivityKind::Payment => {
                self.payments += 1;
                self.revenue += money::parse_first_amount(&activity.description).unwrap_or(0.0);
            }
            ActivityKind::System => {}
        }
    }

    fn absorb(&mut self, other: &Self) {
        self.entries += other.entries;
        self.exits += other.exits;
        self.payments += other.payments;
        self.revenue += other.revenue;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub stats: PeriodStats,
    /// Hour of day (UTC) with the most entries; earliest hour wins ties.
    pub peak_hour: Option<u32>,
    pub peak_entries: usize,
    /// Spots occupied when the report was produced.
    pub occupied_spots: usize,
    pub activities: Vec<ActivityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayStats {
    pub date: NaiveDate,
    pub weekday: Weekday,
    #[serde(flatten)]
    pub stats: PeriodStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyReport {
    pub iso_year: i32,
    pub week: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Monday through Sunday.
    pub days: Vec<DayStats>,
    pub totals: PeriodStats,
    pub average_daily_revenue: f64,
    pub activities: Vec<ActivityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekStats {
    pub iso_year: i32,
    pub week: u32,
    #[serde(flatten)]
    pub stats: PeriodStats,
}

impl WeekStats {
    /// `2024-W07` style label.
    pub fn label(&self) -> String {
        format!("{}-W{:02}", self.iso_year, self.week)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Every ISO week that has at least one day inside the month.
    pub weeks: Vec<WeekStats>,
    pub totals: PeriodStats,
    pub average_weekly_revenue: f64,
    pub activities: Vec<ActivityRecord>,
}

// ── Builders ────────────────────────────────────────────────────────

pub fn daily_report<'a>(
    log: &ActivityLog,
    spots: impl IntoIterator<Item = &'a ParkingSpot>,
    date: NaiveDate,
) -> DailyReport {
    let (from, to) = day_bounds(date);
    let filter = ActivityFilter::Between(from, to);

    let mut stats = PeriodStats::default();
    let mut entries_by_hour = [0usize; 24];
    let mut activities = Vec::new();
    for activity in log.query(&filter) {
        stats.record(&activity);
        if activity.kind == ActivityKind::Entry {
            if let Some(slot) = usize::try_from(activity.timestamp.hour())
                .ok()
                .and_then(|h| entries_by_hour.get_mut(h))
            {
                *slot += 1;
            }
        }
        activities.push((*activity).clone());
    }

    let (peak_hour, peak_entries) = peak(&entries_by_hour);
    DailyReport {
        date,
        stats,
        peak_hour,
        peak_entries,
        occupied_spots: spots.into_iter().filter(|s| s.is_occupied()).count(),
        activities,
    }
}

pub fn weekly_report(
    log: &ActivityLog,
    iso_year: i32,
    week: u32,
) -> Result<WeeklyReport, CoreError> {
    let start = NaiveDate::from_isoywd_opt(iso_year, week, Weekday::Mon).ok_or_else(|| {
        CoreError::ValidationFailed {
            message: format!("{iso_year}-W{week:02} is not a valid ISO week"),
        }
    })?;

    let mut activities = Vec::new();
    let days: Vec<DayStats> = start
        .iter_days()
        .take(7)
        .map(|date| {
            let (from, to) = day_bounds(date);
            let filter = ActivityFilter::Between(from, to);
            let mut stats = PeriodStats::default();
            for activity in log.query(&filter) {
                stats.record(&activity);
                activities.push((*activity).clone());
            }
            DayStats {
                date,
                weekday: date.weekday(),
                stats,
            }
        })
        .collect();

    let mut totals = PeriodStats::default();
    days.iter().for_each(|d| totals.absorb(&d.stats));
    let end = days.last().map_or(start, |d| d.date);

    Ok(WeeklyReport {
        iso_year,
        week,
        start,
        end,
        average_daily_revenue: totals.revenue / 7.0,
        days,
        totals,
        activities,
    })
}

pub fn monthly_report(
    log: &ActivityLog,
    year: i32,
    month: u32,
) -> Result<MonthlyReport, CoreError> {
    let invalid = || CoreError::ValidationFailed {
        message: format!("{year}-{month:02} is not a valid month"),
    };
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = start.checked_add_months(Months::new(1)).ok_or_else(invalid)?;
    let end = next.pred_opt().ok_or_else(invalid)?;

    let mut weeks: BTreeMap<(i32, u32), PeriodStats> = BTreeMap::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        let iso = date.iso_week();
        weeks.entry((iso.year(), iso.week())).or_default();
    }

    let filter = ActivityFilter::Between(midnight(start), midnight(next));
    let mut totals = PeriodStats::default();
    let mut activities = Vec::new();
    for activity in log.query(&filter) {
        let iso = activity.timestamp.iso_week();
        if let Some(stats) = weeks.get_mut(&(iso.year(), iso.week())) {
            stats.record(&activity);
        }
        totals.record(&activity);
        activities.push((*activity).clone());
    }

    Ok(MonthlyReport {
        year,
        month,
        start,
        end,
        weeks: weeks
            .into_iter()
            .map(|((iso_year, week), stats)| WeekStats {
                iso_year,
                week,
                stats,
            })
            .collect(),
        average_weekly_revenue: totals.revenue / 4.0,
        totals,
        activities,
    })
}

// ── Helpers ─────────────────────────────────────────────────────────

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Half-open `[date 00:00, next day 00:00)` in UTC.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let to = date
        .checked_add_days(Days::new(1))
        .map_or(DateTime::<Utc>::MAX_UTC, midnight);
    (midnight(date), to)
}

fn peak(entries_by_hour: &[usize; 24]) -> (Option<u32>, usize) {
    let mut best: (Option<u32>, usize) = (None, 0);
    for (hour, &count) in (0u32..).zip(entries_by_hour.iter()) {
        if count > best.1 {
            best = (Some(hour), count);
        }
    }
    best
}
