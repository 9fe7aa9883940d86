//! Statistics aggregation over completed sessions.
//!
//! Every projection here is a pure function of the session list, the known
//! categories, the current day, and the time zone used to bucket timestamps
//! into calendar days. Nothing is persisted; reports are recomputed on every
//! load.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::types::{Category, Session, TimerMode};

// ============================================================================
// Constants
// ============================================================================

/// Number of days in the daily rollup, today included.
pub const DAILY_WINDOW_DAYS: u64 = 365;

/// Label used for sessions whose category no longer exists.
pub const UNKNOWN_CATEGORY_NAME: &str = "Unknown";

/// Neutral color used for unknown categories.
pub const UNKNOWN_CATEGORY_COLOR: &str = "#64748b";

// ============================================================================
// Report Types
// ============================================================================

/// One calendar day of activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: NaiveDate,
    /// Sessions of any mode started this day
    pub sessions: u32,
    /// Seconds spent in work-mode sessions
    pub work_time: u64,
    /// Session counts keyed by raw category id
    pub categories: BTreeMap<String, u32>,
}

impl DailyStat {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            sessions: 0,
            work_time: 0,
            categories: BTreeMap::new(),
        }
    }

    /// Heatmap shade for this day, from 0 (no sessions) to 4 (10 or more).
    pub fn intensity(&self) -> u8 {
        match self.sessions {
            0 => 0,
            1..=2 => 1,
            3..=5 => 2,
            6..=9 => 3,
            _ => 4,
        }
    }
}

/// Activity summed over a Sunday-started week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStat {
    /// The Sunday that starts this week
    pub week: NaiveDate,
    pub total_sessions: u32,
    pub total_work_time: u64,
    /// Always `total_sessions / 7`, even for a partial week
    pub average_sessions_per_day: f64,
}

/// Activity attributed to one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    /// The session's raw category id, known or not
    pub category_id: String,
    pub category_name: String,
    pub sessions: u32,
    pub work_time: u64,
    pub color: String,
}

/// Everything the statistics view shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub daily_stats: Vec<DailyStat>,
    pub weekly_stats: Vec<WeeklyStat>,
    pub category_stats: Vec<CategoryStat>,
    /// Completed work-mode sessions, all time
    pub total_sessions: u32,
    /// Seconds in work-mode sessions, all time
    pub total_work_time: u64,
    /// Consecutive days with activity, ending today
    pub current_streak: u32,
}

impl StatisticsReport {
    /// Builds the report using the local time zone and today's local date.
    pub fn compute_local(sessions: &[Session], categories: &[Category]) -> Self {
        let today = Local::now().date_naive();
        Self::compute(sessions, categories, today, &Local)
    }

    /// Builds the report for an explicit day and time zone.
    pub fn compute<Tz: TimeZone>(
        sessions: &[Session],
        categories: &[Category],
        today: NaiveDate,
        tz: &Tz,
    ) -> Self {
        let completed: Vec<&Session> = sessions.iter().filter(|s| s.completed).collect();

        let daily_stats = daily_rollup(&completed, today, tz);
        let weekly_stats = weekly_rollup(&daily_stats);
        let category_stats = category_rollup(&completed, categories);
        let current_streak = current_streak(&daily_stats);

        let work: Vec<&&Session> = completed
            .iter()
            .filter(|s| s.mode == TimerMode::Work)
            .collect();
        let total_sessions = u32::try_from(work.len()).unwrap_or(u32::MAX);
        let total_work_time = work.iter().map(|s| u64::from(s.duration)).sum();

        tracing::debug!(
            sessions = completed.len(),
            total_sessions,
            current_streak,
            "Statistics computed"
        );

        Self {
            daily_stats,
            weekly_stats,
            category_stats,
            total_sessions,
            total_work_time,
            current_streak,
        }
    }

    /// The most recent `days` daily buckets, oldest first.
    pub fn recent_days(&self, days: usize) -> &[DailyStat] {
        let start = self.daily_stats.len().saturating_sub(days);
        &self.daily_stats[start..]
    }
}

// ============================================================================
// Projections
// ============================================================================

/// Returns the Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    date - Days::new(offset)
}

fn daily_rollup<Tz: TimeZone>(sessions: &[&Session], today: NaiveDate, tz: &Tz) -> Vec<DailyStat> {
    let first_day = today - Days::new(DAILY_WINDOW_DAYS - 1);
    let mut days: Vec<DailyStat> = first_day
        .iter_days()
        .take(DAILY_WINDOW_DAYS as usize)
        .map(DailyStat::empty)
        .collect();

    for session in sessions {
        let date = session.started_at.with_timezone(tz).date_naive();
        if date < first_day || date > today {
            continue;
        }
        let index = (date - first_day).num_days() as usize;
        let day = &mut days[index];

        day.sessions += 1;
        if session.mode == TimerMode::Work {
            day.work_time += u64::from(session.duration);
        }
        if let Some(category_id) = &session.category_id {
            *day.categories.entry(category_id.clone()).or_insert(0) += 1;
        }
    }

    days
}

fn weekly_rollup(daily: &[DailyStat]) -> Vec<WeeklyStat> {
    let mut weeks: BTreeMap<NaiveDate, (u32, u64)> = BTreeMap::new();

    for day in daily {
        let entry = weeks.entry(week_start(day.date)).or_insert((0, 0));
        entry.0 += day.sessions;
        entry.1 += day.work_time;
    }

    weeks
        .into_iter()
        .map(|(week, (total_sessions, total_work_time))| WeeklyStat {
            week,
            total_sessions,
            total_work_time,
            average_sessions_per_day: f64::from(total_sessions) / 7.0,
        })
        .collect()
}

fn category_rollup(sessions: &[&Session], categories: &[Category]) -> Vec<CategoryStat> {
    let known: HashMap<&str, &Category> = categories.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut per_category: HashMap<&str, (u32, u64)> = HashMap::new();
    for session in sessions {
        let Some(category_id) = session.category_id.as_deref() else {
            continue;
        };
        let bucket = per_category.entry(category_id).or_insert((0, 0));
        bucket.0 += 1;
        if session.mode == TimerMode::Work {
            bucket.1 += u64::from(session.duration);
        }
    }

    let (mut stats, mut unknown): (Vec<CategoryStat>, Vec<CategoryStat>) = per_category
        .into_iter()
        .map(|(id, (sessions, work_time))| {
            let (name, color) = match known.get(id) {
                Some(category) => (category.name.as_str(), category.color.as_str()),
                None => (UNKNOWN_CATEGORY_NAME, UNKNOWN_CATEGORY_COLOR),
            };
            CategoryStat {
                category_id: id.to_string(),
                category_name: name.to_string(),
                sessions,
                work_time,
                color: color.to_string(),
            }
        })
        .partition(|stat| known.contains_key(stat.category_id.as_str()));

    stats.sort_by(|a, b| {
        b.sessions
            .cmp(&a.sessions)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });
    // Deleted categories go last, one entry per id
    unknown.sort_by(|a, b| {
        b.sessions
            .cmp(&a.sessions)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    stats.extend(unknown);

    stats
}

fn current_streak(daily: &[DailyStat]) -> u32 {
    let streak = daily
        .iter()
        .rev()
        .take_while(|day| day.sessions > 0)
        .count();
    u32::try_from(streak).unwrap_or(u32::MAX)
}

// ============================================================================
// Tests
// ============================================================================
