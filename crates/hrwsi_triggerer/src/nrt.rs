//! NRT-flag classification (spec.md §4.E: "computed by one of two
//! formulas").

use chrono::{DateTime, Duration, Utc};

const NRT_HARVESTING_WINDOW_HOURS: i64 = 3;

/// `is_nrt` for a raw input, given the product type's harvest bookmark (if
/// any) and the input's own measurement day / publishing / harvesting
/// timestamps.
pub fn classify(
    bookmark: Option<DateTime<Utc>>,
    measurement_day: i32,
    publishing_date: DateTime<Utc>,
    harvesting_date: DateTime<Utc>,
) -> bool {
    match bookmark {
        Some(bookmark) => {
            let bookmark_day: i32 = bookmark.format("%Y%m%d").to_string().parse().unwrap_or(0);
            measurement_day >= bookmark_day
        }
        None => {
            harvesting_date >= publishing_date
                && harvesting_date <= publishing_date + Duration::hours(NRT_HARVESTING_WINDOW_HOURS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bookmark_present_compares_measurement_day() {
        let bookmark = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        assert!(classify(Some(bookmark), 20_250_116, Utc::now(), Utc::now()));
        assert!(!classify(Some(bookmark), 20_250_114, Utc::now(), Utc::now()));
    }

    #[test]
    fn no_bookmark_uses_harvesting_window() {
        let publishing = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let within = publishing + Duration::hours(2);
        let outside = publishing + Duration::hours(4);
        assert!(classify(None, 20_240_101, publishing, within));
        assert!(!classify(None, 20_240_101, publishing, outside));
    }
}
