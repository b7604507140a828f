use log::{debug, info, trace, warn};
use nalgebra::{Point2, Vector2};

use crate::aperture::{Aperture, ApertureCode, ApertureTable};
use crate::coordinates::{Coordinates, DecodedCoordinates};
use crate::error::{DocumentError, Result};
use crate::format::{CoordinateMode, FormatSpec};
use crate::function::{Code, CodeKind, Function, Operation};
use crate::geometry::{ArcGeometry, BoundingBox, WithFootprint};
use crate::types::{InterpolationMode, QuadrantMode};

/// Replays a function sequence to find the extent of the material it exposes.
///
/// Holds no state between calls, every query replays the whole sequence from the origin.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GeometryEngine<'a> {
    format: &'a FormatSpec,
    apertures: &'a ApertureTable,
    ignore_blank: bool,
}

#[derive(Debug)]
struct ReplayState {
    position: Point2<f64>,
    aperture: Option<ApertureCode>,
    interpolation_mode: InterpolationMode,
    quadrant_mode: QuadrantMode,
    in_region: bool,
    bbox: BoundingBox,
}

impl Default for ReplayState {
    fn default() -> Self {
        Self {
            position: Point2::origin(),
            aperture: None,
            interpolation_mode: InterpolationMode::default(),
            quadrant_mode: QuadrantMode::default(),
            in_region: false,
            bbox: BoundingBox::default(),
        }
    }
}

impl<'a> GeometryEngine<'a> {
    pub fn new(format: &'a FormatSpec, apertures: &'a ApertureTable, ignore_blank: bool) -> Self {
        Self {
            format,
            apertures,
            ignore_blank,
        }
    }

    /// The bounds of everything drawn or flashed, `(0,0,0,0)` when nothing is.
    #[profiling::function]
    pub fn bounding_box(&self, functions: &[Function]) -> Result<BoundingBox> {
        let mut state = ReplayState::default();

        for (index, function) in functions.iter().enumerate() {
            trace!("replaying function {}: {:?}", index, function);

            match function {
                Function::ApertureSelect(code) => state.aperture = Some(*code),
                Function::Code(code) => Self::apply_code(&mut state, code),
                Function::Move {
                    code,
                    coordinates,
                    operation,
                } => {
                    if let Some(code) = code {
                        Self::apply_code(&mut state, code);
                    }
                    self.replay_operation(&mut state, coordinates, *operation)?;
                }
                Function::Parameter(_)
                | Function::Comment {
                    ..
                } => {}
            }
        }

        if state.bbox.is_empty() {
            info!("replayed {} functions, nothing drawn", functions.len());
            return Ok(BoundingBox::new(0.0, 0.0, 0.0, 0.0));
        }

        info!("replayed {} functions, bbox: {:?}", functions.len(), state.bbox);
        Ok(state.bbox)
    }

    fn apply_code(state: &mut ReplayState, code: &Code) {
        match code.kind() {
            Some(CodeKind::Interpolation(mode)) => state.interpolation_mode = mode,
            Some(CodeKind::Quadrant(mode)) => state.quadrant_mode = mode,
            Some(CodeKind::RegionBegin) => state.in_region = true,
            Some(CodeKind::RegionEnd) => state.in_region = false,
            Some(CodeKind::Comment | CodeKind::EndOfProgram) => {}
            None => debug!("code {} has no effect on geometry", code),
        }
    }

    fn replay_operation(&self, state: &mut ReplayState, coordinates: &Coordinates, operation: Operation) -> Result<()> {
        let decoded = coordinates.decode(self.format)?;
        let start = state.position;
        let end = self.next_position(start, &decoded);

        match operation {
            Operation::Move => {}
            Operation::Draw => self.draw(state, start, end, &decoded)?,
            Operation::Flash => self.flash(state, end)?,
        }

        state.position = end;
        Ok(())
    }

    fn next_position(&self, position: Point2<f64>, decoded: &DecodedCoordinates) -> Point2<f64> {
        match self.format.effective_coordinate_mode() {
            CoordinateMode::Absolute => {
                Point2::new(decoded.x.unwrap_or(position.x), decoded.y.unwrap_or(position.y))
            }
            CoordinateMode::Incremental => Point2::new(
                position.x + decoded.x.unwrap_or(0.0),
                position.y + decoded.y.unwrap_or(0.0),
            ),
        }
    }

    /// The selected aperture, `None` when it is non-drawing and blank apertures are ignored.
    fn selected_aperture(&self, state: &ReplayState, operation: Operation) -> Result<Option<&'a Aperture>> {
        let code = state
            .aperture
            .ok_or_else(|| DocumentError::UndefinedAperture(format!("{} without a selected aperture", operation)))?;
        let aperture = self
            .apertures
            .get(&code)
            .ok_or_else(|| DocumentError::UndefinedAperture(code.to_string()))?;

        if self.ignore_blank && aperture.non_drawing {
            trace!("skipping non-drawing aperture {}", code);
            return Ok(None);
        }
        if !aperture.geometry_resolved() {
            warn!(
                "Aperture {} references macro {}, only its {} position contributes",
                code, aperture.shape, operation
            );
        }
        Ok(Some(aperture))
    }

    #[cfg_attr(feature = "profile-functions", profiling::function)]
    fn draw(
        &self,
        state: &mut ReplayState,
        start: Point2<f64>,
        end: Point2<f64>,
        decoded: &DecodedCoordinates,
    ) -> Result<()> {
        // region contours have no stroke
        let footprint = if state.in_region {
            BoundingBox::at_point(Point2::origin())
        } else {
            match self.selected_aperture(state, Operation::Draw)? {
                Some(aperture) => aperture.footprint(),
                None => return Ok(()),
            }
        };

        let path = match state.interpolation_mode {
            InterpolationMode::Circular(winding) if decoded.has_offset() => {
                let offset = Vector2::new(decoded.i.unwrap_or(0.0), decoded.j.unwrap_or(0.0));
                ArcGeometry::from_interpolation(start, end, offset, winding, state.quadrant_mode).bounding_box()
            }
            InterpolationMode::Circular(_) => {
                warn!(
                    "Circular draw without I/J offset, using a straight segment. start: {:?}, end: {:?}",
                    start, end
                );
                BoundingBox::from_points(&[start, end])
            }
            InterpolationMode::Linear => BoundingBox::from_points(&[start, end]),
        };

        state.bbox.expand(&path.sweep(&footprint));
        Ok(())
    }

    #[cfg_attr(feature = "profile-functions", profiling::function)]
    fn flash(&self, state: &mut ReplayState, position: Point2<f64>) -> Result<()> {
        if state.in_region {
            warn!("Flash operation found within region - ignoring");
            return Ok(());
        }

        if let Some(aperture) = self.selected_aperture(state, Operation::Flash)? {
            state.bbox.expand(
                &aperture
                    .footprint()
                    .translate(position.coords),
            );
        }
        Ok(())
    }
}
