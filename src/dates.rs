use chrono::NaiveDate;

use crate::error::DataError;

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses `YYYY-MM-DD`.
///
/// Only the shape is checked here: three dash-separated integers. Whether the
/// components form a real calendar date is left to `NaiveDate::from_ymd_opt`,
/// and a rejection there surfaces as the same `InvalidDate` error.
pub fn parse_date(value: &str) -> Result<NaiveDate, DataError> {
    let invalid = || DataError::InvalidDate(value.to_string());
    let parts: Vec<&str> = value.trim().split('-').collect();

    if parts.len() != 3 {
        return Err(invalid());
    }

    let year: i32 = parts[0].parse().map_err(|_| invalid())?;
    let month: u32 = parts[1].parse().map_err(|_| invalid())?;
    let day: u32 = parts[2].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// `numerator / denominator` as a percentage with one decimal.
///
/// Computed in tenths of a percent with integer arithmetic and rounded half
/// away from zero, so `1/8` renders as `"12.5"` and `1/16` as `"6.3"`.
pub fn format_percent(numerator: u64, denominator: u64) -> String {
    if denominator == 0 {
        return "0.0".to_string();
    }

    let numerator = u128::from(numerator);
    let denominator = u128::from(denominator);
    let tenths = (numerator * 2000 + denominator) / (denominator * 2);

    format!("{}.{}", tenths / 10, tenths % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padding() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 8).unwrap();
        assert_eq!(format_date(date), "2026-02-08");
    }

    #[test]
    fn parse_round_trips_formatted_dates() {
        let mut date = NaiveDate::from_ymd_opt(2023, 12, 25).unwrap();
        for _ in 0..800 {
            assert_eq!(parse_date(&format_date(date)).unwrap(), date);
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn parse_accepts_unpadded_components() {
        let date = parse_date("2026-2-8").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 2, 8).unwrap());
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        for input in ["", "2026-02", "2026-02-08-01", "2026/02/08", "2026-aa-08", "20260208"] {
            assert_eq!(
                parse_date(input),
                Err(DataError::InvalidDate(input.to_string())),
                "{input}"
            );
        }
    }

    #[test]
    fn parse_defers_calendar_checks_to_chrono() {
        assert!(matches!(parse_date("2026-13-01"), Err(DataError::InvalidDate(_))));
        assert!(matches!(parse_date("2025-02-29"), Err(DataError::InvalidDate(_))));
        assert!(parse_date("2024-02-29").is_ok());
    }

    #[test]
    fn percent_of_zero_denominator_is_zero() {
        assert_eq!(format_percent(0, 0), "0.0");
        assert_eq!(format_percent(7, 0), "0.0");
        assert_eq!(format_percent(u64::MAX, 0), "0.0");
    }

    #[test]
    fn percent_matches_known_values() {
        assert_eq!(format_percent(1, 4), "25.0");
        assert_eq!(format_percent(3, 4), "75.0");
        assert_eq!(format_percent(0, 10), "0.0");
        assert_eq!(format_percent(10, 10), "100.0");
        assert_eq!(format_percent(1, 3), "33.3");
        assert_eq!(format_percent(2, 3), "66.7");
    }

    #[test]
    fn percent_rounds_half_away_from_zero() {
        assert_eq!(format_percent(1, 8), "12.5");
        assert_eq!(format_percent(1, 16), "6.3");
        assert_eq!(format_percent(1, 80), "1.3");
        assert_eq!(format_percent(3, 80), "3.8");
    }
}
