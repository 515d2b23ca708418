//! Coordinate text normalization.
//!
//! # Responsibility
//! - Turn field-entered coordinate text into canonical `f64` values.
//! - Detect the input format from structural cues (degree sign, separator
//!   count and position); callers never pass a format flag.
//!
//! # Invariants
//! - Parsers never panic on arbitrary input.
//! - Missing input is reported distinctly from zero.
//! - Non-finite results (`NaN`, `inf`) are rejected as invalid numbers.

use std::error::Error;
use std::fmt::{Display, Formatter};

const DEGREE_SIGNS: [char; 2] = ['°', 'º'];
const HEMISPHERE_LETTERS: [char; 5] = ['N', 'S', 'E', 'W', 'O'];
const UTM_FRACTION_DIGITS: usize = 3;

/// Failure to interpret one coordinate or number token.
///
/// Scoped to a single field; batch callers record it and continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordParseError {
    /// Input was empty or whitespace only.
    Empty,
    /// A DMS string is missing one of its segment delimiters.
    MissingDelimiter { input: String, delimiter: char },
    /// A segment or plain number could not be read as a finite float.
    InvalidNumber { input: String },
}

impl Display for CoordParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty coordinate value"),
            Self::MissingDelimiter { input, delimiter } => {
                write!(f, "coordinate `{input}` is missing delimiter `{delimiter}`")
            }
            Self::InvalidNumber { input } => write!(f, "invalid numeric value `{input}`"),
        }
    }
}

impl Error for CoordParseError {}

/// Converts `D°M'S"H` text into signed decimal degrees.
///
/// Whitespace is ignored and a decimal comma is accepted anywhere a decimal
/// point is. `S`, `O` (Oeste) and `W` negate the value; `N`, `E` or no
/// hemisphere letter keep it positive. Text without a degree sign is read as
/// an already-decimal number.
///
/// # Errors
/// - `Empty` for blank input.
/// - `MissingDelimiter` when the minutes delimiter `'` is absent.
/// - `InvalidNumber` when a segment is not a finite number.
pub fn parse_dms_to_decimal(text: &str) -> Result<f64, CoordParseError> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if compact.is_empty() {
        return Err(CoordParseError::Empty);
    }

    if !compact.contains(|c: char| DEGREE_SIGNS.contains(&c)) {
        return parse_finite(&compact).ok_or_else(|| CoordParseError::InvalidNumber {
            input: text.trim().to_string(),
        });
    }

    let hemisphere = compact.chars().last().map(|c| c.to_ascii_uppercase());
    let southern_or_western = matches!(hemisphere, Some('S' | 'O' | 'W'));

    let body: String = compact
        .chars()
        .filter(|c| !HEMISPHERE_LETTERS.contains(&c.to_ascii_uppercase()))
        .collect();

    let (degrees_text, rest) = body
        .split_once(|c: char| DEGREE_SIGNS.contains(&c))
        .ok_or_else(|| CoordParseError::MissingDelimiter {
            input: text.trim().to_string(),
            delimiter: '°',
        })?;
    let (minutes_text, seconds_text) =
        rest.split_once('\'')
            .ok_or_else(|| CoordParseError::MissingDelimiter {
                input: text.trim().to_string(),
                delimiter: '\'',
            })?;
    // Seconds may be closed by `"`, `''` or the typographic double prime.
    let seconds_text = seconds_text.trim_end_matches(|c: char| matches!(c, '"' | '\'' | '″'));

    let degrees = parse_segment(degrees_text, text)?;
    let minutes = parse_segment(minutes_text, text)?;
    let seconds = parse_segment(seconds_text, text)?;

    let magnitude = degrees.abs() + minutes / 60.0 + seconds / 3600.0;
    if southern_or_western || degrees_text.starts_with('-') {
        Ok(-magnitude)
    } else {
        Ok(magnitude)
    }
}

/// Parses Brazilian-formatted (`1.234,56`) or plain (`1234.56`) numbers.
///
/// The separator roles are decided by which separators appear and which
/// one comes last:
/// - both present, comma last: dots are thousands, comma is decimal
/// - both present, dot last: commas are thousands, dot is decimal
/// - only one comma: decimal comma
/// - several dots and no comma: dots are thousands separators
///
/// # Errors
/// - `Empty` for blank input; blank input never reads as `0`.
/// - `InvalidNumber` for anything else that does not normalize to a finite
///   float.
pub fn parse_locale_decimal(text: &str) -> Result<f64, CoordParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoordParseError::Empty);
    }

    let invalid = || CoordParseError::InvalidNumber {
        input: trimmed.to_string(),
    };
    let commas = trimmed.matches(',').count();
    let dots = trimmed.matches('.').count();

    let normalized = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => {
            if commas > 1 {
                return Err(invalid());
            }
            trimmed.replace('.', "").replace(',', ".")
        }
        (Some(_), Some(_)) => {
            if dots > 1 {
                return Err(invalid());
            }
            trimmed.replace(',', "")
        }
        (Some(_), None) => {
            if commas > 1 {
                return Err(invalid());
            }
            trimmed.replace(',', ".")
        }
        (None, Some(_)) if dots > 1 => trimmed.replace('.', ""),
        _ => trimmed.to_string(),
    };

    parse_finite(&normalized).ok_or_else(invalid)
}

/// Parses one UTM easting/northing as exported by survey instruments.
///
/// Comma-decimal input is normalized to exactly three fractional digits,
/// padding with zeros or truncating extra digits (`6956938,0134` reads as
/// `6956938.013`). Plain point-decimal input is parsed as is. Input without a
/// usable decimal separator has its dots dropped as thousands separators.
///
/// Returns `None` for blank or unparseable input.
pub fn parse_utm_value(text: &str) -> Option<f64> {
    let value = text.trim();
    if value.is_empty() {
        return None;
    }

    if value.contains('.') && !value.contains(',') {
        if let Some(parsed) = parse_finite(value) {
            return Some(parsed);
        }
    }

    if value.contains(',') {
        let mut parts = value.split(',');
        return match (parts.next(), parts.next(), parts.next()) {
            (Some(integer), Some(fraction), None) => {
                let integer = integer.replace('.', "");
                let fraction = fixed_fraction(fraction, UTM_FRACTION_DIGITS);
                parse_finite(&format!("{integer}.{fraction}"))
            }
            _ => None,
        };
    }

    parse_finite(&value.replace('.', ""))
}

fn fixed_fraction(fraction: &str, digits: usize) -> String {
    let mut fixed: String = fraction.chars().take(digits).collect();
    while fixed.chars().count() < digits {
        fixed.push('0');
    }
    fixed
}

fn parse_segment(segment: &str, original: &str) -> Result<f64, CoordParseError> {
    parse_finite(segment).ok_or_else(|| CoordParseError::InvalidNumber {
        input: original.trim().to_string(),
    })
}

fn parse_finite(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}

#[cfg(test)]
mod tests {
    use super::{parse_dms_to_decimal, parse_locale_decimal, parse_utm_value, CoordParseError};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn dms_southern_and_western_hemispheres_are_negative() {
        let lat = parse_dms_to_decimal("27°27'16.418\" S").expect("latitude should parse");
        assert_close(lat, -(27.0 + 27.0 / 60.0 + 16.418 / 3600.0));

        let lon = parse_dms_to_decimal("48°29'05.593\" O").expect("longitude should parse");
        assert!(lon < 0.0);

        let west = parse_dms_to_decimal("48°29'05.593\"W").expect("W should parse");
        assert_close(west, lon);
    }

    #[test]
    fn dms_north_east_and_missing_hemisphere_are_positive() {
        let north = parse_dms_to_decimal("10°30'00\"N").expect("N should parse");
        let east = parse_dms_to_decimal("10°30'00\"E").expect("E should parse");
        let bare = parse_dms_to_decimal("10°30'00\"").expect("bare should parse");
        assert_close(north, 10.5);
        assert_close(east, 10.5);
        assert_close(bare, 10.5);
    }

    #[test]
    fn dms_accepts_decimal_comma_ordinal_sign_and_double_single_quote() {
        let value = parse_dms_to_decimal("27º 27' 16,5'' S").expect("variant should parse");
        assert_close(value, -(27.0 + 27.0 / 60.0 + 16.5 / 3600.0));
    }

    #[test]
    fn dms_without_degree_sign_reads_decimal() {
        assert_close(
            parse_dms_to_decimal("-27,4545").expect("decimal should parse"),
            -27.4545,
        );
    }

    #[test]
    fn dms_missing_minutes_delimiter_is_an_error_not_a_panic() {
        let err = parse_dms_to_decimal("27°2716\"S").expect_err("missing ' must fail");
        assert!(matches!(
            err,
            CoordParseError::MissingDelimiter { delimiter: '\'', .. }
        ));
        assert_eq!(parse_dms_to_decimal("   "), Err(CoordParseError::Empty));
        assert!(matches!(
            parse_dms_to_decimal("ab°cd'ef\""),
            Err(CoordParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn locale_decimal_disambiguates_separators() {
        assert_close(parse_locale_decimal("1.234,56").expect("br"), 1234.56);
        assert_close(parse_locale_decimal("1234.56").expect("plain"), 1234.56);
        assert_close(parse_locale_decimal("1234,5").expect("comma"), 1234.5);
        assert_close(parse_locale_decimal("1.234.567").expect("thousands"), 1_234_567.0);
        assert_close(parse_locale_decimal("1,234.5").expect("us"), 1234.5);
        assert_close(parse_locale_decimal(" 42 ").expect("int"), 42.0);
    }

    #[test]
    fn locale_decimal_blank_is_failure_not_zero() {
        assert_eq!(parse_locale_decimal(""), Err(CoordParseError::Empty));
        assert!(parse_locale_decimal("1,2,3").is_err());
        assert!(parse_locale_decimal("abc").is_err());
        assert!(parse_locale_decimal("NaN").is_err());
    }

    #[test]
    fn utm_value_normalizes_comma_fraction_to_three_digits() {
        assert_eq!(parse_utm_value("6956938,0134"), Some(6_956_938.013));
        assert_eq!(parse_utm_value("755.924,6"), Some(755_924.6));
        assert_eq!(parse_utm_value("6936302.27"), Some(6_936_302.27));
        assert_eq!(parse_utm_value("755924"), Some(755_924.0));
        assert_eq!(parse_utm_value("6.936.302"), Some(6_936_302.0));
    }

    #[test]
    fn utm_value_blank_or_garbage_is_none() {
        assert_eq!(parse_utm_value(""), None);
        assert_eq!(parse_utm_value("  "), None);
        assert_eq!(parse_utm_value("1,2,3"), None);
        assert_eq!(parse_utm_value("north"), None);
    }
}
