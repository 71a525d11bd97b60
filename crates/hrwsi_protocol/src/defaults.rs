//! Canonical default values shared across the harvester, triggerer,
//! orchestrator and launcher.

use chrono::NaiveDate;

/// Harvester cycle period (seconds), `T_h` in the spec.
pub const DEFAULT_HARVEST_CYCLE_SECS: u64 = 300;
/// Sleep before clearing archive bookmarks once a run completes, `T_post`.
pub const DEFAULT_ARCHIVE_POST_SLEEP_SECS: u64 = 60;
/// Archive harvest chunk size (days).
pub const ARCHIVE_CHUNK_DAYS: i64 = 1;

/// GRDH periodic triggerer cycle period, `T_grdh`.
pub const DEFAULT_GRDH_CYCLE_SECS: u64 = 120;
/// L1C periodic triggerer cycle period, `T_l1c`.
pub const DEFAULT_L1C_CYCLE_SECS: u64 = 120;
/// WICS1S2 pairing cycle period.
pub const DEFAULT_WICS1S2_CYCLE_SECS: u64 = 600;
/// GFSC daily-rule cycle period.
pub const DEFAULT_GFSC_CYCLE_SECS: u64 = 6 * 3600;

/// Orphan GRDH partial fires alone once unpaired for this long.
pub const GRDH_ORPHAN_TIMEOUT_SECS: i64 = 2 * 3600;

/// Window, in days, used to find a prior S2 L2A for CC "NOMINAL" mode and
/// for WDS/GFSC same-tile partner lookups.
pub const CC_PRIOR_L2A_WINDOW_DAYS: i64 = 90;

/// GFSC lookback window (days) gathered per artificial measurement day.
pub const GFSC_LOOKBACK_DAYS: i64 = 7;
/// GFSC re-check delay (days) once a day is skipped due to unfinished tasks.
pub const GFSC_SKIP_RECHECK_DAYS: i64 = 7;

/// Launcher re-driver / sweeper cycle period, `T_pt`.
pub const DEFAULT_LAUNCHER_CYCLE_SECS: u64 = 60;

/// No-callback relaunch threshold for the lost-job sweeper.
pub const LOST_JOB_NO_CALLBACK_SECS: i64 = 3600;
/// Multiplier applied to `max(7, routine_duration_minutes) * 60` for the
/// past-started relaunch threshold.
pub const LOST_JOB_PAST_STARTED_MULTIPLIER: i64 = 3;
/// Minimum routine duration (minutes) used in the past-started threshold.
pub const LOST_JOB_MIN_DURATION_MINUTES: i64 = 7;
/// Exit code recorded by the sweeper when relaunching a lost job.
pub const LOST_JOB_EXIT_CODE: i32 = 404;

/// Sliding-window width (days) used by the Archive Launcher when scanning
/// for unprocessed archive tasks.
pub const ARCHIVE_LAUNCHER_WINDOW_DAYS: i64 = 7;

/// Hard-coded cutoff below which the undispatched re-driver and Archive
/// Launcher ignore processing tasks; tracked as config rather than a literal
/// per the "Open Questions" resolution in DESIGN.md.
pub const DEFAULT_MEASUREMENT_DAY_CUTOFF: u32 = 20_250_115;

/// Earliest date the Archive Launcher will ever request.
pub fn default_archive_launcher_cap() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 14).expect("valid date literal")
}

/// Earliest accepted measurement day for any job-spec render.
pub fn earliest_measurement_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 8, 1).expect("valid date literal")
}

/// Default timeliness window for publication-age triggering gates, `N_pub`.
pub const DEFAULT_N_PUB_DAYS: i64 = 7;
/// Default measurement-age gate for L1C, `N_meas`.
pub const DEFAULT_N_MEAS_DAYS: i64 = 30;

/// Flavours accepted by the `--flavour` CLI flag.
pub const FLAVOURS: &[&str] = &["hma.large", "eo1.large"];

pub const CHANNEL_INPUT_INSERTION: &str = "input_insertion";
pub const CHANNEL_RAW2VALID_INSERTION: &str = "raw2valid_insertion";
pub const CHANNEL_PROCESSING_TASK_INSERTION: &str = "processing_task_insertion";
pub const CHANNEL_PRODUCT_INSERTION: &str = "product_insertion";
