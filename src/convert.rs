use log::{debug, trace};
use nalgebra::Point2;

use crate::aperture::{Aperture, ApertureShape, Modifier};
use crate::coordinates::{Coordinates, DecodedCoordinates};
use crate::document::GerberDocument;
use crate::error::{DocumentError, Result};
use crate::format::{CoordinateMode, Unit};
use crate::function::{Function, ValidationContext};

/// Copies `source` into `target`, re-encoding every coordinate and aperture size under the target's format.
///
/// Nothing is rolled back on failure, the target is left partially populated.
#[profiling::function]
pub(crate) fn convert(source: &GerberDocument, target: &mut GerberDocument) -> Result<()> {
    let decimal = target
        .format
        .require_digits()?
        .decimal;

    // converted positions are relative to a cursor at the origin
    if !target.functions.is_empty() {
        return Err(DocumentError::validation(format!(
            "conversion target already holds {} functions",
            target.functions.len()
        )));
    }

    if let Some(aperture) = source
        .apertures
        .iter()
        .filter(|aperture| aperture.shape.is_macro())
        .min_by_key(|aperture| aperture.code)
    {
        return Err(DocumentError::UnsupportedConversion {
            code: aperture.code.to_string(),
            macro_name: aperture.shape.to_string(),
        });
    }

    let (source_unit, target_unit) = (source.format.effective_unit(), target.format.effective_unit());

    let mut apertures = source
        .apertures
        .iter()
        .collect::<Vec<_>>();
    apertures.sort_by_key(|aperture| aperture.code);
    for aperture in apertures {
        let converted = convert_aperture(aperture, source_unit, target_unit)?;
        target.apertures.define(converted);
    }

    for definition in source.macros.iter() {
        target
            .macros
            .define(definition.clone());
    }

    let mut coordinates = CoordinateConverter {
        source_mode: source.format.effective_coordinate_mode(),
        target_mode: target.format.effective_coordinate_mode(),
        source_unit,
        target_unit,
        decimal,
        source_position: Point2::origin(),
        emitted_position: Point2::origin(),
    };

    for function in source.functions.iter() {
        let converted = match function {
            Function::Move {
                code,
                coordinates: source_coordinates,
                operation,
            } => {
                let decoded = source_coordinates.decode(&source.format)?;
                let values = coordinates.convert(&decoded);
                Function::Move {
                    code: code.clone(),
                    coordinates: Coordinates::encode(&values, &target.format)?,
                    operation: *operation,
                }
            }
            _ => function.clone(),
        };
        trace!("converted function: {:?}", converted);

        // codes were validated when they entered the source
        let context = ValidationContext {
            format: &target.format,
            apertures: &target.apertures,
            ignore_invalid: true,
        };
        target
            .functions
            .append_function(converted, &context)?;
    }

    debug!(
        "converted {} apertures, {} macros, {} functions, {} -> {}",
        source.apertures.len(),
        source.macros.len(),
        source.functions.len(),
        source_unit,
        target_unit
    );
    Ok(())
}

fn convert_aperture(aperture: &Aperture, source_unit: Unit, target_unit: Unit) -> Result<Aperture> {
    let modifiers = if source_unit == target_unit {
        aperture.modifiers.clone()
    } else {
        aperture
            .modifiers
            .iter()
            .enumerate()
            .map(|(index, modifier)| match is_length(&aperture.shape, index) {
                true => {
                    let value = source_unit.convert(modifier.value, target_unit);
                    Modifier {
                        raw: format_modifier(value),
                        value,
                    }
                }
                false => modifier.clone(),
            })
            .collect::<Vec<_>>()
    };

    Aperture::new(aperture.code, aperture.shape.clone(), modifiers, aperture.non_drawing)
}

/// Polygon vertex count and rotation are the only standard modifiers that are not lengths.
fn is_length(shape: &ApertureShape, index: usize) -> bool {
    match shape {
        ApertureShape::Polygon => index == 0 || index == 3,
        _ => true,
    }
}

/// Six decimals, trailing zeros dropped, e.g. `25.4`. Only the text is rounded, the value keeps full precision.
fn format_modifier(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text
        .trim_end_matches('0')
        .trim_end_matches('.');
    match text {
        "-0" => "0".to_string(),
        _ => text.to_string(),
    }
}

fn quantize(value: f64, decimal: u8) -> f64 {
    let factor = 10_f64.powi(decimal as i32);
    (value * factor).round() / factor
}

/// Tracks positions across a sequence so absolute and incremental coordinates can be converted in both directions.
#[derive(Debug)]
struct CoordinateConverter {
    source_mode: CoordinateMode,
    target_mode: CoordinateMode,
    source_unit: Unit,
    target_unit: Unit,
    decimal: u8,
    /// Where the source sequence is, in source units.
    source_position: Point2<f64>,
    /// Where the target sequence is, as its rounded coordinates decode.
    emitted_position: Point2<f64>,
}

impl CoordinateConverter {
    /// Target values for the axes present in `decoded`, in target units and the target's coordinate mode.
    fn convert(&mut self, decoded: &DecodedCoordinates) -> DecodedCoordinates {
        let (source_unit, target_unit) = (self.source_unit, self.target_unit);
        let scale = move |value: f64| source_unit.convert(value, target_unit);

        let (x, y) = match self.source_mode {
            CoordinateMode::Absolute => (
                decoded.x.unwrap_or(self.source_position.x),
                decoded.y.unwrap_or(self.source_position.y),
            ),
            CoordinateMode::Incremental => (
                self.source_position.x + decoded.x.unwrap_or(0.0),
                self.source_position.y + decoded.y.unwrap_or(0.0),
            ),
        };
        let target = Point2::new(scale(x), scale(y));

        let emit_x = decoded
            .x
            .map(|_| self.emit(target.x, self.emitted_position.x));
        let emit_y = decoded
            .y
            .map(|_| self.emit(target.y, self.emitted_position.y));

        if let Some((value, _)) = emit_x {
            self.emitted_position.x = value;
        }
        if let Some((value, _)) = emit_y {
            self.emitted_position.y = value;
        }
        self.source_position = Point2::new(x, y);

        DecodedCoordinates {
            x: emit_x.map(|(_, written)| written),
            y: emit_y.map(|(_, written)| written),
            i: decoded.i.map(scale),
            j: decoded.j.map(scale),
        }
    }

    /// The (emitted position, written value) for one axis moving to `target`.
    fn emit(&self, target: f64, emitted: f64) -> (f64, f64) {
        match self.target_mode {
            CoordinateMode::Absolute => (quantize(target, self.decimal), target),
            CoordinateMode::Incremental => {
                let delta = quantize(target - emitted, self.decimal);
                (emitted + delta, delta)
            }
        }
    }
}
