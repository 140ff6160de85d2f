use crate::jlpt::results::error::{Result, ToolError};
use crate::jlpt::results::model::Period;

/// Marker appended to the stem of every normalized workbook.
pub const NORMALIZED_SUFFIX: &str = "_Normalizado";

/// Strips the normalized marker so re-staged outputs keep their base name.
pub fn base_name(stem: &str) -> String {
    stem.replace(NORMALIZED_SUFFIX, "")
}

/// File stem of the normalized workbook produced from `stem`.
pub fn normalized_stem(stem: &str) -> String {
    format!("{}{NORMALIZED_SUFFIX}", base_name(stem))
}

/// Parses the `{year}_{period}` prefix of a file stem.
pub fn parse_period(stem: &str) -> Result<Period> {
    let base = base_name(stem);
    let mut parts = base.split('_');
    let invalid = || ToolError::InvalidFileName(stem.to_string());

    let year = parts
        .next()
        .and_then(|part| part.trim().parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let code = parts
        .next()
        .and_then(|part| part.trim().parse::<u32>().ok())
        .ok_or_else(invalid)?;

    Ok(Period::new(year, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_plain_and_normalized_stems() {
        let period = parse_period("2023_1").expect("period parsed");
        assert_eq!(period, Period::new(2023, 1));
        assert_eq!(period.date(), NaiveDate::from_ymd_opt(2023, 7, 1));
        assert_eq!(period.month_name(), "July");

        let period = parse_period("2023_1_Normalizado").expect("period parsed");
        assert_eq!(period.date(), NaiveDate::from_ymd_opt(2023, 7, 1));

        let period = parse_period("2019_2_results").expect("period parsed");
        assert_eq!(period.month_name(), "December");
    }

    #[test]
    fn rejects_stems_without_period() {
        assert!(matches!(
            parse_period("results"),
            Err(ToolError::InvalidFileName(_))
        ));
        assert!(parse_period("2023").is_err());
        assert!(parse_period("2023_first").is_err());
    }

    #[test]
    fn normalized_stem_is_stable() {
        assert_eq!(normalized_stem("2023_1"), "2023_1_Normalizado");
        assert_eq!(normalized_stem("2023_1_Normalizado"), "2023_1_Normalizado");
    }
}
