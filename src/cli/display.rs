//! Display utilities for the Pomodoro Tracker CLI.
//!
//! This module provides formatted output for:
//! - Timer status and command results
//! - Statistics (totals, streak, categories, heatmap)
//! - Settings and category lists
//! - System metrics samples
//!
//! Rendering functions return strings so they can be tested; the `show_*`
//! functions print them.

use chrono::Days;

use crate::metrics::SystemInfo;
use crate::stats::{week_start, DailyStat, StatisticsReport};
use crate::types::{Category, IpcResponse, Settings, TimerSnapshot, TimerStatus};

/// Heatmap shades indexed by [`DailyStat::intensity`].
const HEATMAP_GLYPHS: [char; 5] = ['·', '░', '▒', '▓', '█'];

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the result of a timer command (start/pause/stop/reset).
    pub fn show_timer_result(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }
        if let Some(snapshot) = response.timer() {
            let (minutes, seconds) = Self::format_time(snapshot.remaining_seconds);
            println!("  {}: {}:{:02}", snapshot.mode.label(), minutes, seconds);
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        match response.timer() {
            Some(snapshot) => print!("{}", Self::render_status(snapshot)),
            None => println!("Timer status unavailable"),
        }
    }

    /// Shows a statistics report with a heatmap of the last `weeks` weeks.
    pub fn show_stats(report: &StatisticsReport, weeks: u32) {
        print!("{}", Self::render_stats(report, weeks));
    }

    /// Shows the current settings.
    pub fn show_settings(settings: &Settings) {
        print!("{}", Self::render_settings(settings));
    }

    /// Shows the category list.
    pub fn show_categories(categories: &[Category]) {
        print!("{}", Self::render_categories(categories));
    }

    /// Shows one system metrics sample, or the unavailable state.
    pub fn show_system_info(info: Option<&SystemInfo>) {
        println!("{}", Self::render_system_info(info));
    }

    /// Shows a plain success message.
    pub fn show_success(message: &str) {
        println!("* {}", message);
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    pub fn render_status(snapshot: &TimerSnapshot) -> String {
        let mut out = String::new();
        out.push_str("Pomodoro Tracker Status\n");
        out.push_str("───────────────────────\n");

        let state = match snapshot.state {
            TimerStatus::Idle => "Ready",
            TimerStatus::Running => "Running",
            TimerStatus::Paused => "Paused",
            TimerStatus::Completed => "Completed",
        };
        out.push_str(&format!("Mode:      {}\n", snapshot.mode.label()));
        out.push_str(&format!("State:     {}\n", state));

        let (minutes, seconds) = Self::format_time(snapshot.remaining_seconds);
        out.push_str(&format!(
            "Remaining: {}:{:02} ({:.0}%)\n",
            minutes, seconds, snapshot.progress
        ));
        out.push_str(&format!("Completed: {} pomodoros\n", snapshot.completed_work));

        if let Some(category) = &snapshot.category_id {
            out.push_str(&format!("Category:  {}\n", category));
        }
        if let Some(store) = &snapshot.store {
            out.push_str(&format!("Storage:   {}\n", store));
        }
        if let Some(error) = &snapshot.last_error {
            out.push_str(&format!("Warning:   {}\n", error));
        }
        out
    }

    pub fn render_stats(report: &StatisticsReport, weeks: u32) -> String {
        let mut out = String::new();
        out.push_str("Statistics\n");
        out.push_str("──────────\n");
        out.push_str(&format!("Total pomodoros: {}\n", report.total_sessions));
        out.push_str(&format!(
            "Focus time:      {}\n",
            Self::format_duration(report.total_work_time)
        ));
        let unit = if report.current_streak == 1 { "day" } else { "days" };
        out.push_str(&format!(
            "Current streak:  {} {}\n",
            report.current_streak, unit
        ));

        if let Some(this_week) = report.weekly_stats.last() {
            out.push_str(&format!(
                "This week:       {} sessions ({:.1}/day)\n",
                this_week.total_sessions, this_week.average_sessions_per_day
            ));
        }

        if !report.category_stats.is_empty() {
            out.push_str("\nCategories\n");
            for stat in &report.category_stats {
                out.push_str(&format!(
                    "  {:<12} {:>4} sessions  {}\n",
                    stat.category_name,
                    stat.sessions,
                    Self::format_duration(stat.work_time)
                ));
            }
        }

        out.push('\n');
        // Enough days to fill the first column of the grid
        let shown_days = weeks.max(1) as usize * 7 + 6;
        out.push_str(&Self::render_heatmap(report.recent_days(shown_days), weeks));
        out
    }

    /// Renders a weekday-by-week grid of the last `weeks` weeks, ending
    /// with the week of the most recent day. Days after the last one are
    /// left blank.
    pub fn render_heatmap(days: &[DailyStat], weeks: u32) -> String {
        let (Some(first), Some(last)) = (days.first(), days.last()) else {
            return String::new();
        };

        let weeks = u64::from(weeks.max(1));
        let grid_start = week_start(last.date) - Days::new((weeks - 1) * 7);

        let mut out = String::new();
        for (weekday, label) in WEEKDAY_LABELS.iter().enumerate() {
            out.push_str(label);
            out.push(' ');
            for week in 0..weeks {
                let date = grid_start + Days::new(week * 7 + weekday as u64);
                let glyph = if date < first.date || date > last.date {
                    ' '
                } else {
                    let index = (date - first.date).num_days() as usize;
                    days.get(index)
                        .map_or(' ', |day| HEATMAP_GLYPHS[usize::from(day.intensity())])
                };
                out.push(glyph);
            }
            out.push('\n');
        }

        out.push_str("    Less ");
        out.extend(HEATMAP_GLYPHS.iter());
        out.push_str(" More\n");
        out
    }

    pub fn render_settings(settings: &Settings) -> String {
        let on_off = |value: bool| if value { "on" } else { "off" };
        format!(
            "Work:                 {} min\n\
             Short break:          {} min\n\
             Long break:           {} min\n\
             Auto-start breaks:    {}\n\
             Auto-start pomodoros: {}\n\
             Notifications:        {}\n",
            settings.work_duration / 60,
            settings.short_break_duration / 60,
            settings.long_break_duration / 60,
            on_off(settings.auto_start_breaks),
            on_off(settings.auto_start_pomodoros),
            on_off(settings.notifications_enabled),
        )
    }

    pub fn render_categories(categories: &[Category]) -> String {
        if categories.is_empty() {
            return "No categories\n".to_string();
        }
        categories
            .iter()
            .map(|c| {
                format!(
                    "{} {:<12} {:<20} {}\n",
                    c.icon.as_deref().unwrap_or(" "),
                    c.name,
                    c.id,
                    c.color
                )
            })
            .collect()
    }

    pub fn render_system_info(info: Option<&SystemInfo>) -> String {
        let Some(info) = info else {
            return "System metrics unavailable".to_string();
        };

        let cpu = match info.cpu.temperature {
            Some(temp) => format!("CPU {:.1}% ({:.0}°C)", info.cpu.usage, temp),
            None => format!("CPU {:.1}%", info.cpu.usage),
        };
        format!(
            "{} | Memory {:.1}/{:.1} GB ({:.1}%)",
            cpu,
            info.memory.used as f64 / BYTES_PER_GB,
            info.memory.total as f64 / BYTES_PER_GB,
            info.memory.percentage
        )
    }

    /// Formats remaining seconds as (minutes, seconds).
    fn format_time(total_seconds: u32) -> (u32, u32) {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        (minutes, seconds)
    }

    /// Formats a number of seconds as `1h 05m` or `25m`.
    pub fn format_duration(total_seconds: u64) -> String {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        if hours > 0 {
            format!("{}h {:02}m", hours, minutes)
        } else {
            format!("{}m", minutes)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CpuInfo, MemoryInfo};
    use crate::stats::CategoryStat;
    use crate::types::{ResponseData, TimerMode};
    use chrono::NaiveDate;

    fn snapshot(state: TimerStatus, remaining: u32) -> TimerSnapshot {
        TimerSnapshot {
            state,
            mode: TimerMode::Work,
            remaining_seconds: remaining,
            total_seconds: 1500,
            completed_work: 2,
            category_id: None,
            progress: 20.0,
            store: Some("local".to_string()),
            last_error: None,
        }
    }

    fn days_ending(last: NaiveDate, count: u64, sessions: impl Fn(u64) -> u32) -> Vec<DailyStat> {
        let first = last - Days::new(count - 1);
        (0..count)
            .map(|i| DailyStat {
                date: first + Days::new(i),
                sessions: sessions(i),
                work_time: 0,
                categories: Default::default(),
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Format Tests
    // ------------------------------------------------------------------------

    mod format_tests {
        use super::*;

        #[test]
        fn test_format_time_zero() {
            assert_eq!(Display::format_time(0), (0, 0));
        }

        #[test]
        fn test_format_time_mixed() {
            assert_eq!(Display::format_time(90), (1, 30));
        }

        #[test]
        fn test_format_time_large() {
            assert_eq!(Display::format_time(120 * 60 + 59), (120, 59));
        }

        #[test]
        fn test_format_duration() {
            assert_eq!(Display::format_duration(0), "0m");
            assert_eq!(Display::format_duration(1500), "25m");
            assert_eq!(Display::format_duration(3600), "1h 00m");
            assert_eq!(Display::format_duration(3900), "1h 05m");
            assert_eq!(Display::format_duration(36000 + 59), "10h 00m");
        }
    }

    // ------------------------------------------------------------------------
    // Status Tests
    // ------------------------------------------------------------------------

    mod status_tests {
        use super::*;

        #[test]
        fn test_render_status_running() {
            let out = Display::render_status(&snapshot(TimerStatus::Running, 1200));
            assert!(out.contains("Mode:      Focus"));
            assert!(out.contains("State:     Running"));
            assert!(out.contains("Remaining: 20:00 (20%)"));
            assert!(out.contains("Completed: 2 pomodoros"));
            assert!(out.contains("Storage:   local"));
            assert!(!out.contains("Warning"));
        }

        #[test]
        fn test_render_status_idle_is_ready() {
            let out = Display::render_status(&snapshot(TimerStatus::Idle, 1500));
            assert!(out.contains("State:     Ready"));
        }

        #[test]
        fn test_render_status_with_error_and_category() {
            let mut s = snapshot(TimerStatus::Paused, 61);
            s.last_error = Some("Failed to save session: timeout".to_string());
            s.category_id = Some("coding".to_string());
            let out = Display::render_status(&s);
            assert!(out.contains("Remaining: 1:01"));
            assert!(out.contains("Category:  coding"));
            assert!(out.contains("Warning:   Failed to save session: timeout"));
        }

        #[test]
        fn test_show_functions_do_not_panic() {
            let response = IpcResponse::success(
                "Timer started",
                Some(ResponseData::Timer(snapshot(TimerStatus::Running, 1500))),
            );
            Display::show_timer_result(&response);
            Display::show_status(&response);
            Display::show_status(&IpcResponse::success("", None));
            Display::show_success("done");
            Display::show_error("Test error message");
        }
    }

    // ------------------------------------------------------------------------
    // Statistics Tests
    // ------------------------------------------------------------------------

    mod stats_tests {
        use super::*;

        #[test]
        fn test_render_stats_summary() {
            let report = StatisticsReport {
                daily_stats: days_ending(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(), 365, |_| 0),
                weekly_stats: vec![],
                category_stats: vec![CategoryStat {
                    category_id: "coding".to_string(),
                    category_name: "Coding".to_string(),
                    sessions: 3,
                    work_time: 4500,
                    color: "#10b981".to_string(),
                }],
                total_sessions: 3,
                total_work_time: 4500,
                current_streak: 1,
            };

            let out = Display::render_stats(&report, 4);
            assert!(out.contains("Total pomodoros: 3"));
            assert!(out.contains("Focus time:      1h 15m"));
            assert!(out.contains("Current streak:  1 day\n"));
            assert!(out.contains("Coding"));
            assert!(out.contains("Less ·░▒▓█ More"));
        }

        #[test]
        fn test_heatmap_shape() {
            // 2024-03-14 is a Thursday
            let last = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
            let days = days_ending(last, 365, |_| 0);
            let out = Display::render_heatmap(&days, 3);
            let rows: Vec<&str> = out.lines().collect();

            assert_eq!(rows.len(), 8);
            assert!(rows[0].starts_with("Sun "));
            // Three weeks of cells after the label
            assert_eq!(rows[0].chars().count(), 4 + 3);
            // Friday and Saturday of the current week are in the future
            assert!(rows[5].ends_with("·· "));
            assert!(rows[6].ends_with("·· "));
            assert!(rows[4].ends_with("···"));
        }

        #[test]
        fn test_heatmap_intensity_glyphs() {
            let last = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap(); // Saturday
            let days = days_ending(last, 7, |i| [0, 1, 3, 6, 10, 2, 0][i as usize]);
            let out = Display::render_heatmap(&days, 1);
            let cells: String = out
                .lines()
                .take(7)
                .map(|row| row.chars().last().unwrap())
                .collect();
            assert_eq!(cells, "·░▒▓█░·");
        }

        #[test]
        fn test_heatmap_empty_days() {
            assert_eq!(Display::render_heatmap(&[], 4), "");
        }
    }

    // ------------------------------------------------------------------------
    // Settings / Categories / Metrics Tests
    // ------------------------------------------------------------------------

    mod misc_tests {
        use super::*;

        #[test]
        fn test_render_settings() {
            let out = Display::render_settings(&Settings::default());
            assert!(out.contains("Work:                 25 min"));
            assert!(out.contains("Short break:          5 min"));
            assert!(out.contains("Long break:           15 min"));
            assert!(out.contains("Auto-start breaks:    off"));
            assert!(out.contains("Notifications:        on"));
        }

        #[test]
        fn test_render_categories() {
            let out = Display::render_categories(&crate::types::default_categories());
            assert_eq!(out.lines().count(), 6);
            assert!(out.contains("Coding"));
            assert!(out.contains("#10b981"));
            assert_eq!(Display::render_categories(&[]), "No categories\n");
        }

        #[test]
        fn test_render_system_info() {
            let info = SystemInfo {
                cpu: CpuInfo {
                    usage: 12.34,
                    temperature: Some(48.6),
                },
                memory: MemoryInfo {
                    used: 8 * 1024 * 1024 * 1024,
                    total: 16 * 1024 * 1024 * 1024,
                    percentage: 50.0,
                },
                timestamp: 1_700_000_000_000,
            };
            assert_eq!(
                Display::render_system_info(Some(&info)),
                "CPU 12.3% (49°C) | Memory 8.0/16.0 GB (50.0%)"
            );
        }

        #[test]
        fn test_render_system_info_unavailable() {
            assert_eq!(
                Display::render_system_info(None),
                "System metrics unavailable"
            );
        }
    }
}
