// SQL literal helpers shared by every output format.

use crate::error::{ConvertError, Result};

pub const NULL_TOKEN: &str = "NULL";

/// Double every single quote so the text is safe inside a `'...'` literal.
pub fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

/// Lowercased product name, used for the `name_normalized` column.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

/// `'<text>'` with quotes escaped.
pub fn quote(text: &str) -> String {
    format!("'{}'", escape_literal(text))
}

/// Parse a decimal column value. A literal `NULL` becomes 0.0.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<f64> {
    let value = raw.trim();
    if value == NULL_TOKEN {
        return Ok(0.0);
    }
    parse_finite(field, value)
}

/// Parse an integer calorie value. The source may carry a decimal
/// (`250.9`), which is truncated toward zero. A literal `NULL` becomes 0.
pub fn parse_calories(field: &'static str, raw: &str) -> Result<i64> {
    let value = raw.trim();
    if value == NULL_TOKEN {
        return Ok(0);
    }
    calories_to_int(field, parse_finite(field, value)?.trunc(), value)
}

// 2^63, the first whole number past i64::MAX.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Whole calorie count as `i64`. Values outside the `i64` range are
/// rejected instead of saturating.
pub fn calories_to_int(field: &'static str, whole: f64, raw: &str) -> Result<i64> {
    if whole.is_finite() && (-I64_BOUND..I64_BOUND).contains(&whole) {
        Ok(whole as i64)
    } else {
        Err(ConvertError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
    }
}

fn parse_finite(field: &'static str, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ConvertError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

/// Shortest round-trip form that always keeps a fractional digit:
/// `7.5`, `7.0`, `0.0`.
pub fn format_decimal(value: f64) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_every_quote() {
        assert_eq!(escape_literal("O'Reilly's"), "O''Reilly''s");
        assert_eq!(escape_literal("Хлеб"), "Хлеб");
    }

    #[test]
    fn normalizes_cyrillic_names() {
        assert_eq!(normalize_name("Хлеб Бородинский"), "хлеб бородинский");
        assert_eq!(quote(&normalize_name("Д'Артаньян")), "'д''артаньян'");
    }

    #[test]
    fn null_numeric_becomes_zero() {
        assert_eq!(parse_decimal("carbohydrates", "NULL").unwrap(), 0.0);
        assert_eq!(parse_decimal("fats", " NULL ").unwrap(), 0.0);
        assert_eq!(parse_calories("calories", "NULL").unwrap(), 0);
    }

    #[test]
    fn calories_truncate_toward_zero() {
        assert_eq!(parse_calories("calories", "250").unwrap(), 250);
        assert_eq!(parse_calories("calories", "250.9").unwrap(), 250);
        assert_eq!(parse_calories("calories", " 12.0").unwrap(), 12);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = parse_decimal("proteins", "7,5").unwrap_err();
        assert!(matches!(
            err,
            ConvertError::InvalidNumber { field: "proteins", ref value } if value == "7,5"
        ));
        assert!(parse_decimal("fats", "inf").is_err());
        assert!(parse_calories("calories", "NaN").is_err());
        assert!(parse_calories("calories", "").is_err());
    }

    #[test]
    fn calories_beyond_i64_are_rejected() {
        let err = parse_calories("calories", "1e30").unwrap_err();
        assert!(matches!(
            err,
            ConvertError::InvalidNumber { field: "calories", ref value } if value == "1e30"
        ));
        assert!(parse_calories("calories", "-1e19").is_err());
        assert!(parse_calories("calories", "9223372036854775808").is_err());
        assert_eq!(parse_calories("calories", "1e18").unwrap(), 1_000_000_000_000_000_000);
    }

    #[test]
    fn decimals_keep_a_fractional_digit() {
        assert_eq!(format_decimal(7.5), "7.5");
        assert_eq!(format_decimal(7.0), "7.0");
        assert_eq!(format_decimal(0.0), "0.0");
        assert_eq!(format_decimal(0.1), "0.1");
        assert_eq!(format_decimal(parse_decimal("fats", "1.20").unwrap()), "1.2");
    }
}
