use std::fmt::Write;

use lazy_regex::{lazy_regex, Lazy};
use regex::Regex;

use crate::error::{DocumentError, Result};
use crate::format::FormatSpec;

/// e.g. 'X2000Y-40000I300J50000', every axis optional but in X, Y, I, J order.
static RE_COORDINATES: Lazy<Regex> = lazy_regex!(
    r"^(?:X(?P<x>[+-]?[0-9]+))?(?:Y(?P<y>[+-]?[0-9]+))?(?:I(?P<i>[+-]?[0-9]+))?(?:J(?P<j>[+-]?[0-9]+))?$"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    I,
    J,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::I, Axis::J];

    fn letter(&self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::I => 'I',
            Axis::J => 'J',
        }
    }

    fn capture_name(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::I => "i",
            Axis::J => "j",
        }
    }
}

/// One axis component as written, sign and digits kept apart so the format can be applied later.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoordinateNumber {
    pub negative: bool,
    pub digits: String,
}

impl CoordinateNumber {
    fn parse(value: &str) -> Self {
        let (negative, digits) = match value.as_bytes().first() {
            Some(b'-') => (true, &value[1..]),
            Some(b'+') => (false, &value[1..]),
            _ => (false, value),
        };
        Self {
            negative,
            digits: digits.to_string(),
        }
    }
}

/// Axis values decoded under a format, in format units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecodedCoordinates {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub i: Option<f64>,
    pub j: Option<f64>,
}

impl DecodedCoordinates {
    pub fn get(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::I => self.i,
            Axis::J => self.j,
        }
    }

    pub fn has_offset(&self) -> bool {
        self.i.is_some() || self.j.is_some()
    }
}

/// A raw axis-offset string, e.g. `X010000Y-5`, with its components tokenized.
///
/// Tokenizing is format-independent; digit counts are checked against the format when the owning function is
/// appended, and values are only produced by [`Coordinates::decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinates {
    raw: String,
    x: Option<CoordinateNumber>,
    y: Option<CoordinateNumber>,
    i: Option<CoordinateNumber>,
    j: Option<CoordinateNumber>,
}

impl Coordinates {
    pub fn parse(raw: &str) -> Result<Self> {
        let captures = RE_COORDINATES
            .captures(raw)
            .ok_or_else(|| DocumentError::validation(format!("malformed coordinate: '{}'", raw)))?;

        let component = |axis: Axis| {
            captures
                .name(axis.capture_name())
                .map(|value| CoordinateNumber::parse(value.as_str()))
        };

        Ok(Self {
            raw: raw.to_string(),
            x: component(Axis::X),
            y: component(Axis::Y),
            i: component(Axis::I),
            j: component(Axis::J),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        Axis::ALL
            .iter()
            .all(|axis| self.get(*axis).is_none())
    }

    pub fn get(&self, axis: Axis) -> Option<&CoordinateNumber> {
        match axis {
            Axis::X => self.x.as_ref(),
            Axis::Y => self.y.as_ref(),
            Axis::I => self.i.as_ref(),
            Axis::J => self.j.as_ref(),
        }
    }

    pub fn has_offset(&self) -> bool {
        self.i.is_some() || self.j.is_some()
    }

    /// Every component must fit the digit widths of `format`.
    pub(crate) fn check(&self, format: &FormatSpec) -> Result<()> {
        for axis in Axis::ALL {
            if let Some(number) = self.get(axis) {
                format.check_digit_count(&number.digits)?;
            }
        }
        Ok(())
    }

    pub fn decode(&self, format: &FormatSpec) -> Result<DecodedCoordinates> {
        let decode = |axis: Axis| {
            self.get(axis)
                .map(|number| format.decode(number.negative, &number.digits))
                .transpose()
        };

        Ok(DecodedCoordinates {
            x: decode(Axis::X)?,
            y: decode(Axis::Y)?,
            i: decode(Axis::I)?,
            j: decode(Axis::J)?,
        })
    }

    /// Build the coordinate string for `values` under `format`; absent axes are omitted.
    pub fn encode(values: &DecodedCoordinates, format: &FormatSpec) -> Result<Self> {
        let mut raw = String::new();
        for axis in Axis::ALL {
            if let Some(value) = values.get(axis) {
                // writing to a String cannot fail
                let _ = write!(raw, "{}{}", axis.letter(), format.encode(value)?);
            }
        }
        Self::parse(&raw)
    }
}
