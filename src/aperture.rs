use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use lazy_regex::{lazy_regex, Lazy};
use log::debug;
use regex::Regex;

use crate::error::{DocumentError, Result};

static RE_APERTURE_CODE: Lazy<Regex> = lazy_regex!(r"^D(?P<number>[0-9]{1,9})$");

/// Aperture macro names, also used for macro-referencing aperture shapes.
pub(crate) static RE_MACRO_NAME: Lazy<Regex> = lazy_regex!(r"^[._$a-zA-Z][._$a-zA-Z0-9]{0,126}$");

/// D00 to D09 are reserved for operations.
const FIRST_APERTURE_NUMBER: u32 = 10;

/// An aperture code, `D10` and upwards. Leading zeros are not significant, `D010` is `D10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApertureCode(u32);

impl ApertureCode {
    pub fn number(&self) -> u32 {
        self.0
    }
}

impl FromStr for ApertureCode {
    type Err = DocumentError;

    fn from_str(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(DocumentError::validation("empty aperture code"));
        }

        let number = RE_APERTURE_CODE
            .captures(value)
            .and_then(|captures| captures.name("number"))
            .and_then(|number| number.as_str().parse::<u32>().ok())
            .ok_or_else(|| DocumentError::validation(format!("malformed aperture code: '{}'", value)))?;

        if number < FIRST_APERTURE_NUMBER {
            return Err(DocumentError::validation(format!(
                "aperture code '{}' is reserved, apertures start at D{}",
                value, FIRST_APERTURE_NUMBER
            )));
        }

        Ok(Self(number))
    }
}

impl Display for ApertureCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "D{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ApertureShape {
    Circle,
    Rectangle,
    Obround,
    Polygon,
    /// Reference by name to an aperture macro, which need not be defined yet.
    Macro(String),
}

impl ApertureShape {
    pub fn is_macro(&self) -> bool {
        matches!(self, ApertureShape::Macro(_))
    }

    /// The (min, max) modifier count accepted for the shape.
    fn arity(&self) -> (usize, usize) {
        match self {
            ApertureShape::Circle => (1, 2),
            ApertureShape::Rectangle | ApertureShape::Obround => (2, 3),
            ApertureShape::Polygon => (2, 4),
            ApertureShape::Macro(_) => (0, usize::MAX),
        }
    }
}

impl FromStr for ApertureShape {
    type Err = DocumentError;

    /// `C`, `R`, `O` and `P` or the exact spelled-out names (`Circle`, `Rectangle`, `Obround`, `Polygon`) select the
    /// standard shapes, anything else that is a valid macro name references a macro, `CIRCLE` included.
    fn from_str(value: &str) -> Result<Self> {
        let shape = match value {
            "C" | "Circle" => ApertureShape::Circle,
            "R" | "Rectangle" => ApertureShape::Rectangle,
            "O" | "Obround" => ApertureShape::Obround,
            "P" | "Polygon" => ApertureShape::Polygon,
            _ if RE_MACRO_NAME.is_match(value) => ApertureShape::Macro(value.to_string()),
            _ => {
                return Err(DocumentError::validation(format!("malformed aperture shape: '{}'", value)));
            }
        };
        Ok(shape)
    }
}

impl Display for ApertureShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ApertureShape::Circle => f.write_str("C"),
            ApertureShape::Rectangle => f.write_str("R"),
            ApertureShape::Obround => f.write_str("O"),
            ApertureShape::Polygon => f.write_str("P"),
            ApertureShape::Macro(name) => f.write_str(name),
        }
    }
}

/// A numeric modifier, the text it was given as is preserved.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifier {
    pub raw: String,
    pub value: f64,
}

impl FromStr for Modifier {
    type Err = DocumentError;

    fn from_str(raw: &str) -> Result<Self> {
        let value = raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| DocumentError::validation(format!("modifier is not numeric: '{}'", raw)))?;

        Ok(Self {
            raw: raw.to_string(),
            value,
        })
    }
}

/// Parse a modifier list, e.g. `0.02X0.01` or `0.02,0.01`.
pub(crate) fn parse_modifiers(modifiers: &str) -> Result<Vec<Modifier>> {
    if modifiers.trim().is_empty() {
        return Ok(vec![]);
    }
    modifiers
        .split(['X', ','])
        .map(|modifier| modifier.trim().parse::<Modifier>())
        .collect()
}

/// Input for [`crate::GerberDocument::define_aperture`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApertureOptions {
    pub code: String,
    pub shape: String,
    pub modifiers: Option<String>,
    pub non_drawing: bool,
}

impl ApertureOptions {
    pub fn new(code: impl Into<String>, shape: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            shape: shape.into(),
            ..Self::default()
        }
    }

    pub fn modifiers(mut self, modifiers: impl Into<String>) -> Self {
        self.modifiers = Some(modifiers.into());
        self
    }

    /// Mark the aperture as not producing artwork, e.g. apertures used for outlines or annotations.
    /// Such apertures are left out of the bounding box while `ignore_blank` is set.
    pub fn non_drawing(mut self, non_drawing: bool) -> Self {
        self.non_drawing = non_drawing;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aperture {
    pub code: ApertureCode,
    pub shape: ApertureShape,
    pub modifiers: Vec<Modifier>,
    /// Circles only, the first modifier.
    pub diameter: Option<f64>,
    pub non_drawing: bool,
}

impl Aperture {
    pub fn new(code: ApertureCode, shape: ApertureShape, modifiers: Vec<Modifier>, non_drawing: bool) -> Result<Self> {
        let (min, max) = shape.arity();
        if modifiers.len() < min || modifiers.len() > max {
            return Err(DocumentError::validation(format!(
                "aperture {} shape {} expects {} to {} modifiers, got {}",
                code,
                shape,
                min,
                max,
                modifiers.len()
            )));
        }

        if !shape.is_macro() {
            Self::validate_standard_modifiers(code, &shape, &modifiers)?;
        }

        let diameter = match shape {
            ApertureShape::Circle => modifiers
                .first()
                .map(|modifier| modifier.value),
            _ => None,
        };

        Ok(Self {
            code,
            shape,
            modifiers,
            diameter,
            non_drawing,
        })
    }

    pub fn from_options(options: &ApertureOptions) -> Result<Self> {
        let code = options.code.parse::<ApertureCode>()?;
        let shape = options
            .shape
            .parse::<ApertureShape>()?;
        let modifiers = options
            .modifiers
            .as_deref()
            .map(parse_modifiers)
            .transpose()?
            .unwrap_or_default();

        Self::new(code, shape, modifiers, options.non_drawing)
    }

    fn validate_standard_modifiers(code: ApertureCode, shape: &ApertureShape, modifiers: &[Modifier]) -> Result<()> {
        if let Some(negative) = modifiers
            .iter()
            .find(|modifier| modifier.value < 0.0 && !matches!(shape, ApertureShape::Polygon))
        {
            return Err(DocumentError::validation(format!(
                "aperture {} has a negative size: {}",
                code, negative.raw
            )));
        }

        if let ApertureShape::Polygon = shape {
            let vertices = modifiers[1].value;
            if vertices.fract() != 0.0 || !(3.0..=12.0).contains(&vertices) {
                return Err(DocumentError::validation(format!(
                    "aperture {} polygon vertex count must be 3 to 12, got {}",
                    code, modifiers[1].raw
                )));
            }
            if modifiers[0].value < 0.0 {
                return Err(DocumentError::validation(format!(
                    "aperture {} has a negative diameter: {}",
                    code, modifiers[0].raw
                )));
            }
        }
        Ok(())
    }

    /// `false` for macro references, whose geometry is not evaluated.
    pub fn geometry_resolved(&self) -> bool {
        !self.shape.is_macro()
    }

    pub fn modifier_values(&self) -> Vec<f64> {
        self.modifiers
            .iter()
            .map(|modifier| modifier.value)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApertureTable {
    apertures: HashMap<ApertureCode, Aperture>,
}

impl ApertureTable {
    /// Replaces any previous definition with the same code.
    pub fn define(&mut self, aperture: Aperture) {
        debug!("defining aperture: {:?}", aperture);
        self.apertures
            .insert(aperture.code, aperture);
    }

    pub fn get(&self, code: &ApertureCode) -> Option<&Aperture> {
        self.apertures.get(code)
    }

    pub fn contains(&self, code: &ApertureCode) -> bool {
        self.apertures.contains_key(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Aperture> {
        self.apertures.values()
    }

    pub fn len(&self) -> usize {
        self.apertures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apertures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("D10", 10)]
    #[case("D010", 10)]
    #[case("D999", 999)]
    fn test_aperture_code(#[case] input: &str, #[case] expected: u32) {
        assert_eq!(
            input
                .parse::<ApertureCode>()
                .map(|code| code.number()),
            Ok(expected)
        );
    }

    #[rstest]
    #[case("")]
    #[case("D")]
    #[case("D03")]
    #[case("10")]
    #[case("G10")]
    #[case("D1O")]
    fn test_aperture_code_rejected(#[case] input: &str) {
        assert!(matches!(input.parse::<ApertureCode>(), Err(DocumentError::Validation(_))));
    }

    #[rstest]
    #[case("C", ApertureShape::Circle)]
    #[case("Circle", ApertureShape::Circle)]
    #[case("CIRCLE", ApertureShape::Macro("CIRCLE".to_string()))]
    #[case("polygon", ApertureShape::Macro("polygon".to_string()))]
    #[case("R", ApertureShape::Rectangle)]
    #[case("Obround", ApertureShape::Obround)]
    #[case("P", ApertureShape::Polygon)]
    #[case("THERMAL80", ApertureShape::Macro("THERMAL80".to_string()))]
    fn test_aperture_shape(#[case] input: &str, #[case] expected: ApertureShape) {
        assert_eq!(input.parse::<ApertureShape>(), Ok(expected));
    }

    #[test]
    fn test_aperture_shape_rejected() {
        assert!(matches!("1ABC".parse::<ApertureShape>(), Err(DocumentError::Validation(_))));
    }

    #[test]
    fn test_circle_diameter() {
        // when
        let aperture = Aperture::from_options(&ApertureOptions::new("D10", "C").modifiers("0.01X0.005")).unwrap();

        // then
        assert_eq!(aperture.diameter, Some(0.01));
        assert_eq!(aperture.modifiers[0].raw, "0.01");
        assert_eq!(aperture.modifiers[1].raw, "0.005");
        assert!(aperture.geometry_resolved());
        assert!(!aperture.non_drawing);
    }

    #[test]
    fn test_circle_requires_modifier() {
        let result = Aperture::from_options(&ApertureOptions::new("D10", "C"));
        assert!(matches!(result, Err(DocumentError::Validation(_))));
    }

    #[rstest]
    #[case("R", "0.02")]
    #[case("R", "0.02,abc")]
    #[case("C", "-1")]
    #[case("O", "1X2X3X4")]
    #[case("P", "1X2")]
    #[case("P", "1X3.5")]
    #[case("P", "1X13")]
    fn test_invalid_modifiers(#[case] shape: &str, #[case] modifiers: &str) {
        let result = Aperture::from_options(&ApertureOptions::new("D10", shape).modifiers(modifiers));
        assert!(matches!(result, Err(DocumentError::Validation(_))));
    }

    #[test]
    fn test_macro_reference() {
        // when
        let aperture =
            Aperture::from_options(&ApertureOptions::new("D20", "DONUT").modifiers("0.1,0.05,0.02,0.01")).unwrap();

        // then
        assert!(!aperture.geometry_resolved());
        assert_eq!(aperture.diameter, None);
        assert_eq!(aperture.modifier_values(), vec![0.1, 0.05, 0.02, 0.01]);
    }

    #[test]
    fn test_table_redefinition_replaces() {
        // given
        let mut table = ApertureTable::default();
        let code = "D11".parse::<ApertureCode>().unwrap();

        // when
        table.define(Aperture::from_options(&ApertureOptions::new("D11", "C").modifiers("0.01")).unwrap());
        table.define(Aperture::from_options(&ApertureOptions::new("D11", "R").modifiers("0.02,0.01")).unwrap());

        // then
        assert_eq!(table.len(), 1);
        assert_eq!(
            table
                .get(&code)
                .map(|aperture| aperture.shape.clone()),
            Some(ApertureShape::Rectangle)
        );
    }
}
