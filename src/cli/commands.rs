//! Command definitions for the Pomodoro Tracker CLI.
//!
//! Uses clap derive macro for argument parsing.

use clap::{Args, Parser, Subcommand};

use crate::types::{NewCategory, SettingsPatch};

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro Tracker - focus timer with session statistics
#[derive(Parser, Debug)]
#[command(
    name = "pomodoro-tracker",
    version,
    about = "Pomodoro timer with session history and statistics",
    long_about = "A Pomodoro timer that runs as a background daemon.\n\
                  Completed intervals are recorded and summarized as a yearly heatmap,\n\
                  weekly totals and per-category breakdowns.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start or resume the countdown
    Start(StartArgs),

    /// Pause the running countdown
    Pause,

    /// Stop and rewind the current interval
    Stop,

    /// Go back to the first work interval
    Reset,

    /// Show current timer status
    Status,

    /// Show session statistics
    Stats(StatsArgs),

    /// Show or change timer settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// List or create categories
    #[command(subcommand)]
    Categories(CategoriesCommand),

    /// Poll the daemon's system metrics
    Monitor(MonitorArgs),

    /// Sign in to the hosted backend
    Login(LoginArgs),

    /// Forget the saved sign-in
    Logout,

    /// Run as daemon (background service)
    Daemon,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments for the start command
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Category to attribute the interval to
    #[arg(short, long)]
    pub category: Option<String>,

    /// Record the following sessions without a category
    #[arg(long, conflicts_with = "category")]
    pub no_category: bool,
}

/// Arguments for the stats command
#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Number of weeks shown in the heatmap (1-53)
    #[arg(
        short,
        long,
        default_value = "12",
        value_parser = clap::value_parser!(u32).range(1..=53)
    )]
    pub weeks: u32,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Show current settings
    Show,

    /// Change one or more settings
    Set(SettingsSetArgs),
}

/// Arguments for `settings set`. Durations are in minutes.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsSetArgs {
    /// Work duration in minutes (1-120)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub work: Option<u32>,

    /// Short break duration in minutes (1-30)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=30))]
    pub short_break: Option<u32>,

    /// Long break duration in minutes (1-60)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub long_break: Option<u32>,

    /// Start breaks automatically
    #[arg(long)]
    pub auto_start_breaks: Option<bool>,

    /// Start work intervals automatically after a break
    #[arg(long)]
    pub auto_start_pomodoros: Option<bool>,

    /// Show a desktop notification when an interval completes
    #[arg(long)]
    pub notifications: Option<bool>,
}

impl SettingsSetArgs {
    /// Converts the arguments into a settings patch in seconds.
    pub fn to_patch(&self) -> SettingsPatch {
        SettingsPatch {
            work_duration: self.work.map(|m| m * 60),
            short_break_duration: self.short_break.map(|m| m * 60),
            long_break_duration: self.long_break.map(|m| m * 60),
            auto_start_breaks: self.auto_start_breaks,
            auto_start_pomodoros: self.auto_start_pomodoros,
            notifications_enabled: self.notifications,
        }
    }
}

/// Category subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CategoriesCommand {
    /// List all categories
    List,

    /// Create a custom category
    Add(CategoryAddArgs),
}

/// Arguments for `categories add`
#[derive(Args, Debug, Clone)]
pub struct CategoryAddArgs {
    /// Category name
    #[arg(value_parser = validate_category_name)]
    pub name: String,

    /// Color as #rrggbb
    #[arg(short, long, default_value = "#6366f1", value_parser = validate_color)]
    pub color: String,

    /// Optional icon, usually an emoji
    #[arg(short, long)]
    pub icon: Option<String>,
}

impl CategoryAddArgs {
    pub fn to_new_category(&self) -> NewCategory {
        NewCategory {
            name: self.name.clone(),
            color: self.color.clone(),
            icon: self.icon.clone(),
        }
    }
}

/// Arguments for the monitor command
#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    /// Base URL of the daemon's HTTP API
    #[arg(short, long, default_value = "http://localhost:3000")]
    pub url: String,

    /// Stop after this many samples (runs until interrupted otherwise)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: Option<u32>,
}

/// Arguments for the login command
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Account email address
    #[arg(short, long)]
    pub email: String,

    /// Account password (read from stdin if omitted)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Create the account first
    #[arg(long)]
    pub sign_up: bool,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates the category name.
///
/// - Must not be empty
/// - Must not exceed 50 characters
fn validate_category_name(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("Category name must not be empty".to_string());
    }
    if s.chars().count() > 50 {
        return Err("Category name must be 50 characters or fewer".to_string());
    }
    Ok(s.to_string())
}

/// Validates a `#rrggbb` color.
fn validate_color(s: &str) -> Result<String, String> {
    let candidate = NewCategory {
        name: "color".to_string(),
        color: s.to_string(),
        icon: None,
    };
    candidate.validate()?;
    Ok(s.to_lowercase())
}

// ============================================================================
// Tests
// ============================================================================
