use std::f64::consts::{FRAC_PI_2, PI, TAU};

use log::warn;
use nalgebra::{Point2, Vector2};

use crate::geometry::BoundingBox;
use crate::types::{QuadrantMode, Winding};

const EPSILON: f64 = 1e-9;

/// Largest relative disagreement between start and end radius for a single-quadrant center candidate.
const RADIUS_TOLERANCE: f64 = 1e-3;

/// A circular arc, angles in radians, positive sweep is counter-clockwise.
///
/// `start` and `end` are the interpolation's own end points, which the sweep only approximates when the offset
/// does not describe a circle through both.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArcGeometry {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    pub center: Point2<f64>,
    pub radius: f64,
    pub start_angle: f64,
    pub sweep_angle: f64,
}

fn length(vector: Vector2<f64>) -> f64 {
    vector.x.hypot(vector.y)
}

fn angle_of(vector: Vector2<f64>) -> f64 {
    vector.y.atan2(vector.x)
}

/// Sweep from `start_angle` to `end_angle` in the given direction, in (-2π, 2π).
fn directed_sweep(start_angle: f64, end_angle: f64, winding: Winding) -> f64 {
    match winding {
        Winding::Clockwise => {
            if end_angle > start_angle {
                end_angle - start_angle - TAU
            } else {
                end_angle - start_angle
            }
        }
        Winding::CounterClockwise => {
            if end_angle < start_angle {
                end_angle - start_angle + TAU
            } else {
                end_angle - start_angle
            }
        }
    }
}

/// The candidate whose end point lies closest to the circle through its start point.
fn closest<'a>(candidates: impl Iterator<Item = &'a (ArcGeometry, f64)>) -> Option<ArcGeometry> {
    candidates
        .min_by(|(_, left), (_, right)| left.total_cmp(right))
        .map(|(arc, _)| arc.clone())
}

impl ArcGeometry {
    /// The arc from `start` to `end` whose center is given by the I/J `offset` from `start`.
    ///
    /// In multi-quadrant mode the offset is signed and coinciding end points make a full circle. In single-quadrant
    /// mode the offset is unsigned; the center is the sign combination whose arc spans at most 90° in the requested
    /// direction, and coinciding end points make a zero-length arc.
    pub fn from_interpolation(
        start: Point2<f64>,
        end: Point2<f64>,
        offset: Vector2<f64>,
        winding: Winding,
        quadrant_mode: QuadrantMode,
    ) -> Self {
        let coincident = length(end - start) < EPSILON;

        match quadrant_mode {
            QuadrantMode::Multi => {
                let center = start + offset;
                let start_angle = angle_of(start - center);
                let sweep_angle = if coincident {
                    match winding {
                        Winding::Clockwise => -TAU,
                        Winding::CounterClockwise => TAU,
                    }
                } else {
                    directed_sweep(start_angle, angle_of(end - center), winding)
                };

                Self {
                    start,
                    end,
                    center,
                    radius: length(offset),
                    start_angle,
                    sweep_angle,
                }
            }
            QuadrantMode::Single => {
                let (i, j) = (offset.x.abs(), offset.y.abs());
                let radius = i.hypot(j);
                let tolerance = (radius * RADIUS_TOLERANCE).max(EPSILON);

                let mut candidates = vec![];
                for sign_x in [1.0, -1.0] {
                    for sign_y in [1.0, -1.0] {
                        let center = start + Vector2::new(sign_x * i, sign_y * j);
                        let start_angle = angle_of(start - center);
                        let sweep_angle = if coincident {
                            0.0
                        } else {
                            directed_sweep(start_angle, angle_of(end - center), winding)
                        };
                        let radius_error = (length(end - center) - radius).abs();
                        candidates.push((
                            Self {
                                start,
                                end,
                                center,
                                radius,
                                start_angle,
                                sweep_angle,
                            },
                            radius_error,
                        ));
                    }
                }

                let quarter = closest(
                    candidates
                        .iter()
                        .filter(|(_, radius_error)| *radius_error <= tolerance)
                        .filter(|(arc, _)| arc.sweep_angle.abs() <= FRAC_PI_2 + EPSILON),
                );

                match quarter {
                    Some(arc) => arc,
                    None => {
                        warn!(
                            "No single-quadrant arc center spans at most 90°, using closest radius. start: {:?}, end: {:?}, offset: {:?}",
                            start, end, offset
                        );
                        // the loop above always pushes four candidates
                        closest(candidates.iter()).unwrap_or(Self {
                            start,
                            end,
                            center: start,
                            radius: 0.0,
                            start_angle: 0.0,
                            sweep_angle: 0.0,
                        })
                    }
                }
            }
        }
    }

    pub fn is_full_circle(&self) -> bool {
        (self.sweep_angle.abs() - TAU).abs() < EPSILON
    }

    fn contains_angle(&self, angle: f64) -> bool {
        if self.is_full_circle() {
            return true;
        }
        if self.sweep_angle >= 0.0 {
            (angle - self.start_angle).rem_euclid(TAU) <= self.sweep_angle + EPSILON
        } else {
            (self.start_angle - angle).rem_euclid(TAU) <= -self.sweep_angle + EPSILON
        }
    }

    /// The extent of the arc line itself: its end points plus each axis extreme the sweep passes through.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut points = vec![self.start, self.end];

        let extremes = [
            (0.0, Vector2::new(self.radius, 0.0)),
            (FRAC_PI_2, Vector2::new(0.0, self.radius)),
            (PI, Vector2::new(-self.radius, 0.0)),
            (-FRAC_PI_2, Vector2::new(0.0, -self.radius)),
        ];
        for (angle, offset) in extremes {
            if self.contains_angle(angle) {
                points.push(self.center + offset);
            }
        }

        BoundingBox::from_points(&points)
    }
}

#[cfg(test)]
mod bounding_box_arc_tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    use rstest::rstest;

    use super::*;

    fn assert_bbox_eq(actual: &BoundingBox, expected: &BoundingBox) {
        let epsilon = 1e-9;
        assert!(
            (actual.min.x - expected.min.x).abs() < epsilon
                && (actual.min.y - expected.min.y).abs() < epsilon
                && (actual.max.x - expected.max.x).abs() < epsilon
                && (actual.max.y - expected.max.y).abs() < epsilon,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(10.0, 5.0)]
    fn test_full_circle_bounds(#[case] center_x: f64, #[case] center_y: f64) {
        // given
        let start = Point2::new(center_x + 100.0, center_y);

        // when
        let arc = ArcGeometry::from_interpolation(
            start,
            start,
            Vector2::new(-100.0, 0.0),
            Winding::CounterClockwise,
            QuadrantMode::Multi,
        );

        // then
        assert!(arc.is_full_circle());
        assert_bbox_eq(
            &arc.bounding_box(),
            &BoundingBox::new(center_x - 100.0, center_y - 100.0, center_x + 100.0, center_y + 100.0),
        );
    }

    #[test]
    fn test_coincident_single_quadrant_is_a_point() {
        let start = Point2::new(1.0, 1.0);

        let arc = ArcGeometry::from_interpolation(
            start,
            start,
            Vector2::new(1.0, 0.0),
            Winding::Clockwise,
            QuadrantMode::Single,
        );

        assert!(!arc.is_full_circle());
        assert_bbox_eq(&arc.bounding_box(), &BoundingBox::at_point(start));
    }

    /// An arc of radius 10 around the origin.
    fn around_origin(start_angle: f64, sweep_angle: f64) -> ArcGeometry {
        let point_at = |angle: f64| Point2::new(10.0 * angle.cos(), 10.0 * angle.sin());
        ArcGeometry {
            start: point_at(start_angle),
            end: point_at(start_angle + sweep_angle),
            center: Point2::origin(),
            radius: 10.0,
            start_angle,
            sweep_angle,
        }
    }

    // quarter arcs around the origin with radius 10, expected bounds are the quadrant's square
    #[rstest]
    #[case(0.0, FRAC_PI_2, BoundingBox::new(0.0, 0.0, 10.0, 10.0))]
    #[case(FRAC_PI_2, FRAC_PI_2, BoundingBox::new(-10.0, 0.0, 0.0, 10.0))]
    #[case(PI, FRAC_PI_2, BoundingBox::new(-10.0, -10.0, 0.0, 0.0))]
    #[case(PI + FRAC_PI_2, FRAC_PI_2, BoundingBox::new(0.0, -10.0, 10.0, 0.0))]
    fn test_quarter_arc_bounds(#[case] start_angle: f64, #[case] sweep_angle: f64, #[case] expected: BoundingBox) {
        let arc = around_origin(start_angle, sweep_angle);

        assert_bbox_eq(&arc.bounding_box(), &expected);
    }

    #[rstest]
    // 45° to 0°, clockwise: only the end points matter
    #[case(FRAC_PI_4, -FRAC_PI_4, BoundingBox::new(10.0 * FRAC_PI_4.cos(), 0.0, 10.0, 10.0 * FRAC_PI_4.sin()))]
    // 90° to -90° clockwise passes through 0°
    #[case(FRAC_PI_2, -PI, BoundingBox::new(0.0, -10.0, 10.0, 10.0))]
    fn test_negative_sweep_arc_bounds(
        #[case] start_angle: f64,
        #[case] sweep_angle: f64,
        #[case] expected: BoundingBox,
    ) {
        let arc = around_origin(start_angle, sweep_angle);

        assert_bbox_eq(&arc.bounding_box(), &expected);
    }

    #[rstest]
    // from (10,0) to (0,10) around the origin
    #[case(Winding::CounterClockwise, BoundingBox::new(0.0, 0.0, 10.0, 10.0))]
    // the long way round
    #[case(Winding::Clockwise, BoundingBox::new(-10.0, -10.0, 10.0, 10.0))]
    fn test_multi_quadrant_direction(#[case] winding: Winding, #[case] expected: BoundingBox) {
        let arc = ArcGeometry::from_interpolation(
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
            Vector2::new(-10.0, 0.0),
            winding,
            QuadrantMode::Multi,
        );

        assert_eq!(arc.center, Point2::origin());
        assert_bbox_eq(&arc.bounding_box(), &expected);
    }

    #[rstest]
    // from (10,0) to (0,10) counter-clockwise, unsigned offset (10,0): the center is the origin
    #[case(Winding::CounterClockwise, Vector2::new(10.0, 0.0), Point2::new(0.0, 0.0))]
    // clockwise, unsigned offset (0,10): the center is (10,10)
    #[case(Winding::Clockwise, Vector2::new(0.0, 10.0), Point2::new(10.0, 10.0))]
    // signs are ignored
    #[case(Winding::Clockwise, Vector2::new(0.0, -10.0), Point2::new(10.0, 10.0))]
    fn test_single_quadrant_center(
        #[case] winding: Winding,
        #[case] offset: Vector2<f64>,
        #[case] expected_center: Point2<f64>,
    ) {
        let arc = ArcGeometry::from_interpolation(
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
            offset,
            winding,
            QuadrantMode::Single,
        );

        assert!(
            (arc.center.x - expected_center.x).abs() < 1e-9 && (arc.center.y - expected_center.y).abs() < 1e-9,
            "center: {:?}",
            arc.center
        );
        assert!(arc.sweep_angle.abs() <= FRAC_PI_2 + 1e-9);
    }

    #[test]
    fn test_single_quadrant_rejects_centers_off_the_circle() {
        // given
        // from (10,0) to (-10,0) counter-clockwise with a signed offset, as written for multi-quadrant mode
        let start = Point2::new(10.0, 0.0);
        let end = Point2::new(-10.0, 0.0);

        // when
        let arc = ArcGeometry::from_interpolation(
            start,
            end,
            Vector2::new(-10.0, 0.0),
            Winding::CounterClockwise,
            QuadrantMode::Single,
        );

        // then
        // the only center both end points agree on is the origin, even though the arc spans 180°
        assert_eq!(arc.center, Point2::origin());
        assert_bbox_eq(&arc.bounding_box(), &BoundingBox::new(-10.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_extent_includes_the_end_points() {
        // given
        // the end point lies off the circle the offset describes
        let start = Point2::new(10.0, 0.0);
        let end = Point2::new(0.0, 12.0);

        // when
        let arc = ArcGeometry::from_interpolation(
            start,
            end,
            Vector2::new(-10.0, 0.0),
            Winding::CounterClockwise,
            QuadrantMode::Multi,
        );

        // then
        assert_bbox_eq(&arc.bounding_box(), &BoundingBox::new(0.0, 0.0, 10.0, 12.0));
    }
}
