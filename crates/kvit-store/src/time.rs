//! Short-date conversions for extracted receipt dates.

use chrono::NaiveDate;

use crate::error::StoreError;

/// Parse a short date in the form `DD/MM/YYYY` or `DD/MM/YY`.
pub fn short_date_to_time(s: &str) -> Result<NaiveDate, StoreError> {
    for layout in ["%d/%m/%y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, layout) {
            return Ok(date);
        }
    }
    Err(StoreError::DateFormat(s.to_string()))
}

/// Format a date as `DD/MM/YYYY`.
pub fn time_to_short_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_both_year_widths() {
        let expected = NaiveDate::from_ymd_opt(2023, 12, 9).unwrap();
        assert_eq!(short_date_to_time("09/12/23").unwrap(), expected);
        assert_eq!(short_date_to_time("09/12/2023").unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_layouts() {
        let err = short_date_to_time("2023-12-09").unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to parse time string 2023-12-09: unknown format"
        );
    }

    #[test]
    fn formats_full_year() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 9).unwrap();
        assert_eq!(time_to_short_date(date), "09/12/2023");
    }

    #[test]
    fn round_trips_extracted_dates() {
        assert_eq!(
            time_to_short_date(short_date_to_time("01/02/2021").unwrap()),
            "01/02/2021"
        );
    }
}
