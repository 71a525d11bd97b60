//! Renderer-level input validation (spec.md §4.H: "(1) validates inputs
//! (tile format, measurement-day range, product-name structure)").

use chrono::{NaiveDate, Utc};
use hrwsi_protocol::defaults::earliest_measurement_day;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::RenderError;

fn tile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{2}[A-Z]{3}$").expect("valid regex"))
}

pub fn validate_tile(tile: &str) -> Result<(), RenderError> {
    if tile_pattern().is_match(tile) {
        Ok(())
    } else {
        Err(RenderError::InvalidTile(tile.to_string()))
    }
}

pub fn validate_measurement_day(measurement_day: i32) -> Result<NaiveDate, RenderError> {
    let date = NaiveDate::parse_from_str(&measurement_day.to_string(), "%Y%m%d")
        .map_err(|_| RenderError::InvalidMeasurementDay(measurement_day))?;
    let earliest = earliest_measurement_day();
    let today = Utc::now().date_naive();
    if date < earliest || date > today {
        return Err(RenderError::InvalidMeasurementDay(measurement_day));
    }
    Ok(date)
}

/// Minimal structural check on a product name: non-empty, no path
/// separators or whitespace (it is used to build S3 keys downstream).
pub fn validate_product_name(name: &str) -> Result<(), RenderError> {
    if name.is_empty() {
        return Err(RenderError::InvalidProductName(
            name.to_string(),
            "must not be empty".to_string(),
        ));
    }
    if name.contains(['/', '\\']) || name.chars().any(char::is_whitespace) {
        return Err(RenderError::InvalidProductName(
            name.to_string(),
            "must not contain path separators or whitespace".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_tile() {
        assert!(validate_tile("31TCH").is_ok());
    }

    #[test]
    fn rejects_malformed_tile() {
        assert!(validate_tile("TCH31").is_err());
        assert!(validate_tile("").is_err());
    }

    #[test]
    fn rejects_measurement_day_before_floor() {
        assert!(validate_measurement_day(20_160_101).is_err());
    }

    #[test]
    fn rejects_measurement_day_in_the_future() {
        assert!(validate_measurement_day(29_991_231).is_err());
    }

    #[test]
    fn accepts_recent_measurement_day() {
        assert!(validate_measurement_day(20_240_115).is_ok());
    }

    #[test]
    fn rejects_product_name_with_path_separator() {
        assert!(validate_product_name("CLMS/WSI").is_err());
    }
}
