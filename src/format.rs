use std::fmt::{Display, Formatter};
use std::str::FromStr;

use log::debug;

use crate::error::{DocumentError, Result};

/// Widest integer or decimal part the format allows.
pub const MAX_DIGITS: u8 = 7;

const MILLIMETERS_PER_INCH: f64 = 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZeroSuppression {
    /// Leading zeros are omitted, digit strings are right-aligned.
    Leading,
    /// Trailing zeros are omitted, digit strings are left-aligned.
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoordinateMode {
    Absolute,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    Inch,
    Millimeter,
}

impl Unit {
    /// Re-express a length given in `self` units in `target` units.
    pub fn convert(self, value: f64, target: Unit) -> f64 {
        match (self, target) {
            (Unit::Inch, Unit::Millimeter) => value * MILLIMETERS_PER_INCH,
            (Unit::Millimeter, Unit::Inch) => value / MILLIMETERS_PER_INCH,
            _ => value,
        }
    }
}

/// Case-insensitive prefix match, "L", "lead" and "Leading" all select `Leading`.
fn match_prefix<T: Copy>(value: &str, kind: &str, candidates: &[(&str, T)]) -> Result<T> {
    let lowered = value.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return Err(DocumentError::validation(format!("empty {} value", kind)));
    }

    candidates
        .iter()
        .find(|(name, _)| name.starts_with(&lowered))
        .map(|(_, candidate)| *candidate)
        .ok_or_else(|| DocumentError::validation(format!("unrecognized {}: '{}'", kind, value)))
}

impl FromStr for ZeroSuppression {
    type Err = DocumentError;

    fn from_str(value: &str) -> Result<Self> {
        match_prefix(value, "zero suppression", &[
            ("leading", ZeroSuppression::Leading),
            ("trailing", ZeroSuppression::Trailing),
        ])
    }
}

impl FromStr for CoordinateMode {
    type Err = DocumentError;

    fn from_str(value: &str) -> Result<Self> {
        match_prefix(value, "coordinate mode", &[
            ("absolute", CoordinateMode::Absolute),
            ("incremental", CoordinateMode::Incremental),
        ])
    }
}

impl FromStr for Unit {
    type Err = DocumentError;

    fn from_str(value: &str) -> Result<Self> {
        match_prefix(value, "unit", &[
            ("inch", Unit::Inch),
            ("millimeter", Unit::Millimeter),
            ("mm", Unit::Millimeter),
        ])
    }
}

impl Display for ZeroSuppression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ZeroSuppression::Leading => f.write_str("Leading"),
            ZeroSuppression::Trailing => f.write_str("Trailing"),
        }
    }
}

impl Display for CoordinateMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateMode::Absolute => f.write_str("Absolute"),
            CoordinateMode::Incremental => f.write_str("Incremental"),
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::Inch => f.write_str("Inch"),
            Unit::Millimeter => f.write_str("Millimeter"),
        }
    }
}

/// Integer and decimal digit widths of encoded coordinates, e.g. 2.4 => `X012345` is 1.2345
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DigitFormat {
    pub integer: u8,
    pub decimal: u8,
}

impl DigitFormat {
    pub fn new(integer: u8, decimal: u8) -> Self {
        Self {
            integer,
            decimal,
        }
    }

    pub fn total(&self) -> usize {
        (self.integer + self.decimal) as usize
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("integer", self.integer), ("decimal", self.decimal)] {
            if value > MAX_DIGITS {
                return Err(DocumentError::validation(format!(
                    "{} digits out of range [0,{}]: {}",
                    name, MAX_DIGITS, value
                )));
            }
        }
        Ok(())
    }
}

/// A partial format update. Zero suppression, coordinate mode and unit are given as text and matched by
/// case-insensitive prefix when applied; typed values can be passed directly since they display as their full name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatOptions {
    pub zero: Option<String>,
    pub coordinates: Option<String>,
    pub digits: Option<DigitFormat>,
    pub unit: Option<String>,
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zero(mut self, value: impl ToString) -> Self {
        self.zero = Some(value.to_string());
        self
    }

    pub fn coordinates(mut self, value: impl ToString) -> Self {
        self.coordinates = Some(value.to_string());
        self
    }

    pub fn digits(mut self, integer: u8, decimal: u8) -> Self {
        self.digits = Some(DigitFormat::new(integer, decimal));
        self
    }

    pub fn unit(mut self, value: impl ToString) -> Self {
        self.unit = Some(value.to_string());
        self
    }
}

/// The numeric and unit configuration governing coordinate encoding.
///
/// Fields are `None` until set. Recorded coordinates are only meaningful under the format that was active when they
/// were appended; changing the digit widths or zero suppression afterwards re-interprets them, use conversion into a
/// fresh document instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatSpec {
    pub zero_suppression: Option<ZeroSuppression>,
    pub coordinate_mode: Option<CoordinateMode>,
    pub digits: Option<DigitFormat>,
    pub unit: Option<Unit>,
}

impl FormatSpec {
    pub fn new(
        zero_suppression: ZeroSuppression,
        coordinate_mode: CoordinateMode,
        digits: DigitFormat,
        unit: Unit,
    ) -> Self {
        Self {
            zero_suppression: Some(zero_suppression),
            coordinate_mode: Some(coordinate_mode),
            digits: Some(digits),
            unit: Some(unit),
        }
    }

    /// Apply a partial update. Every supplied field is validated before any of them is stored.
    pub fn apply(&mut self, options: &FormatOptions) -> Result<()> {
        let zero_suppression = options
            .zero
            .as_deref()
            .map(ZeroSuppression::from_str)
            .transpose()?;
        let coordinate_mode = options
            .coordinates
            .as_deref()
            .map(CoordinateMode::from_str)
            .transpose()?;
        let unit = options
            .unit
            .as_deref()
            .map(Unit::from_str)
            .transpose()?;
        if let Some(digits) = &options.digits {
            digits.validate()?;
        }

        if let Some(zero_suppression) = zero_suppression {
            self.zero_suppression = Some(zero_suppression);
        }
        if let Some(coordinate_mode) = coordinate_mode {
            self.coordinate_mode = Some(coordinate_mode);
        }
        if let Some(digits) = options.digits {
            self.digits = Some(digits);
        }
        if let Some(unit) = unit {
            self.unit = Some(unit);
        }

        debug!("format updated: {:?}", self);
        Ok(())
    }

    /// Absolute unless configured otherwise.
    pub fn effective_coordinate_mode(&self) -> CoordinateMode {
        self.coordinate_mode
            .unwrap_or(CoordinateMode::Absolute)
    }

    /// Inch unless configured otherwise.
    pub fn effective_unit(&self) -> Unit {
        self.unit.unwrap_or(Unit::Inch)
    }

    fn effective_zero_suppression(&self) -> ZeroSuppression {
        self.zero_suppression
            .unwrap_or(ZeroSuppression::Leading)
    }

    pub(crate) fn require_digits(&self) -> Result<DigitFormat> {
        self.digits
            .ok_or_else(|| DocumentError::validation("coordinate digit format is not configured"))
    }

    pub(crate) fn check_digit_count(&self, digits: &str) -> Result<()> {
        let format = self.require_digits()?;
        if digits.is_empty() || digits.len() > format.total() {
            return Err(DocumentError::validation(format!(
                "coordinate '{}' does not fit format {}.{}",
                digits, format.integer, format.decimal
            )));
        }
        Ok(())
    }

    /// Decode an unsigned digit string, applying zero suppression and decimal placement.
    pub(crate) fn decode(&self, negative: bool, digits: &str) -> Result<f64> {
        self.check_digit_count(digits)?;
        let format = self.require_digits()?;

        let padded;
        let aligned = match self.effective_zero_suppression() {
            ZeroSuppression::Leading => digits,
            ZeroSuppression::Trailing => {
                padded = format!("{:0<width$}", digits, width = format.total());
                padded.as_str()
            }
        };

        let integer = aligned
            .parse::<i64>()
            .map_err(|error| DocumentError::validation(format!("invalid coordinate digits '{}': {}", digits, error)))?;
        let value = integer as f64 / 10_f64.powi(format.decimal as i32);

        Ok(if negative { -value } else { value })
    }

    /// Encode a value, rounding half away from zero to the configured decimal digits.
    pub(crate) fn encode(&self, value: f64) -> Result<String> {
        let format = self.require_digits()?;

        let scaled = (value * 10_f64.powi(format.decimal as i32)).round();
        let magnitude = format!("{:0width$}", scaled.abs() as u64, width = format.total());
        if magnitude.len() > format.total() || !scaled.is_finite() {
            return Err(DocumentError::validation(format!(
                "value {} does not fit format {}.{}",
                value, format.integer, format.decimal
            )));
        }

        let suppressed = match self.effective_zero_suppression() {
            ZeroSuppression::Leading => magnitude.trim_start_matches('0'),
            ZeroSuppression::Trailing => magnitude.trim_end_matches('0'),
        };
        let suppressed = if suppressed.is_empty() { "0" } else { suppressed };

        let sign = if scaled < 0.0 { "-" } else { "" };
        Ok(format!("{}{}", sign, suppressed))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn spec(zero_suppression: ZeroSuppression, integer: u8, decimal: u8) -> FormatSpec {
        FormatSpec::new(
            zero_suppression,
            CoordinateMode::Absolute,
            DigitFormat::new(integer, decimal),
            Unit::Inch,
        )
    }

    #[rstest]
    #[case("L", ZeroSuppression::Leading)]
    #[case("Lead", ZeroSuppression::Leading)]
    #[case("leading", ZeroSuppression::Leading)]
    #[case("T", ZeroSuppression::Trailing)]
    #[case("TRAIL", ZeroSuppression::Trailing)]
    fn test_zero_suppression_prefix(#[case] input: &str, #[case] expected: ZeroSuppression) {
        assert_eq!(input.parse::<ZeroSuppression>(), Ok(expected));
    }

    #[rstest]
    #[case("A", CoordinateMode::Absolute)]
    #[case("abs", CoordinateMode::Absolute)]
    #[case("I", CoordinateMode::Incremental)]
    #[case("Incremental", CoordinateMode::Incremental)]
    fn test_coordinate_mode_prefix(#[case] input: &str, #[case] expected: CoordinateMode) {
        assert_eq!(input.parse::<CoordinateMode>(), Ok(expected));
    }

    #[rstest]
    #[case("IN", Unit::Inch)]
    #[case("inch", Unit::Inch)]
    #[case("MM", Unit::Millimeter)]
    #[case("Millimeter", Unit::Millimeter)]
    fn test_unit_prefix(#[case] input: &str, #[case] expected: Unit) {
        assert_eq!(input.parse::<Unit>(), Ok(expected));
    }

    #[rstest]
    #[case("X")]
    #[case("")]
    #[case("Leadingx")]
    fn test_zero_suppression_rejected(#[case] input: &str) {
        assert!(matches!(input.parse::<ZeroSuppression>(), Err(DocumentError::Validation(_))));
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        // given
        let mut format = FormatSpec::default();

        // when
        let result = format.apply(
            &FormatOptions::new()
                .zero("L")
                .digits(2, 8),
        );

        // then
        assert!(matches!(result, Err(DocumentError::Validation(_))));
        assert_eq!(format, FormatSpec::default());
    }

    #[test]
    fn test_apply_merges_partial_updates() {
        // given
        let mut format = FormatSpec::default();

        // when
        format
            .apply(&FormatOptions::new().digits(3, 5))
            .unwrap();
        format
            .apply(&FormatOptions::new().unit("mm"))
            .unwrap();

        // then
        assert_eq!(format.digits, Some(DigitFormat::new(3, 5)));
        assert_eq!(format.unit, Some(Unit::Millimeter));
        assert_eq!(format.zero_suppression, None);
        assert_eq!(format.effective_coordinate_mode(), CoordinateMode::Absolute);
    }

    #[rstest]
    #[case(ZeroSuppression::Leading, false, "010000", 1.0)]
    #[case(ZeroSuppression::Leading, false, "10000", 1.0)]
    #[case(ZeroSuppression::Leading, true, "15", -0.0015)]
    #[case(ZeroSuppression::Trailing, false, "01", 1.0)]
    #[case(ZeroSuppression::Trailing, false, "100000", 10.0)]
    #[case(ZeroSuppression::Trailing, true, "0015", -0.15)]
    fn test_decode(
        #[case] zero_suppression: ZeroSuppression,
        #[case] negative: bool,
        #[case] digits: &str,
        #[case] expected: f64,
    ) {
        let format = spec(zero_suppression, 2, 4);
        let value = format.decode(negative, digits).unwrap();
        assert!((value - expected).abs() < 1e-12, "expected {}, got {}", expected, value);
    }

    #[rstest]
    #[case("")]
    #[case("1234567")]
    fn test_decode_rejects_digit_count(#[case] digits: &str) {
        let format = spec(ZeroSuppression::Leading, 2, 4);
        assert!(matches!(format.decode(false, digits), Err(DocumentError::Validation(_))));
    }

    #[test]
    fn test_decode_requires_digits() {
        let format = FormatSpec::default();
        assert!(matches!(format.decode(false, "1"), Err(DocumentError::Validation(_))));
    }

    #[rstest]
    #[case(ZeroSuppression::Leading, 1.0, "10000")]
    #[case(ZeroSuppression::Leading, -0.0015, "-15")]
    #[case(ZeroSuppression::Leading, 0.0, "0")]
    #[case(ZeroSuppression::Trailing, 1.0, "01")]
    #[case(ZeroSuppression::Trailing, 12.345, "12345")]
    // half away from zero
    #[case(ZeroSuppression::Leading, 0.00005, "1")]
    #[case(ZeroSuppression::Leading, -0.00005, "-1")]
    fn test_encode(#[case] zero_suppression: ZeroSuppression, #[case] value: f64, #[case] expected: &str) {
        let format = spec(zero_suppression, 2, 4);
        assert_eq!(format.encode(value).unwrap(), expected);
    }

    #[test]
    fn test_encode_overflow() {
        let format = spec(ZeroSuppression::Leading, 2, 4);
        assert!(matches!(format.encode(100.0), Err(DocumentError::Validation(_))));
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(Unit::Inch.convert(1.0, Unit::Millimeter), 25.4);
        assert_eq!(Unit::Millimeter.convert(25.4, Unit::Inch), 1.0);
        assert_eq!(Unit::Inch.convert(3.0, Unit::Inch), 3.0);
    }
}
