use nalgebra::{Point2, Vector2};

/// An axis-aligned extent in document units.
///
/// The default value is the empty accumulator: expanding it by any box yields that box.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: Point2::new(min_x, min_y),
            max: Point2::new(max_x, max_y),
        }
    }

    pub fn at_point(point: Point2<f64>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// The smallest box holding every point, empty for no points.
    pub fn from_points(points: &[Point2<f64>]) -> Self {
        points
            .iter()
            .fold(Self::default(), |mut bbox, point| {
                bbox.include(*point);
                bbox
            })
    }

    /// `true` only for an accumulator nothing was added to; a zero-size box around a point is not empty.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn include(&mut self, point: Point2<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    pub fn expand(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.include(other.min);
        self.include(other.max);
    }

    pub fn translate(&self, offset: Vector2<f64>) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// The extent covered when a shape whose own extent is `footprint` travels across this box.
    ///
    /// For axis-aligned extents this Minkowski sum is exact: per axis the lowest reachable value is the path's
    /// minimum plus the footprint's minimum, likewise for the maximum.
    pub fn sweep(&self, footprint: &BoundingBox) -> Self {
        Self {
            min: self.min + footprint.min.coords,
            max: self.max + footprint.max.coords,
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

#[cfg(test)]
mod bbox_tests {
    use nalgebra::{Point2, Vector2};
    use rstest::rstest;

    use crate::geometry::bounding_box::BoundingBox;

    #[rstest]
    #[case(BoundingBox::default(), true)]
    #[case(BoundingBox::from_points(&[]), true)]
    #[case(BoundingBox::at_point(Point2::origin()), false)]
    #[case(BoundingBox::new(-2.0, -1.0, 2.0, 1.0), false)]
    fn test_is_empty(#[case] bbox: BoundingBox, #[case] expected: bool) {
        assert_eq!(bbox.is_empty(), expected);
    }

    #[test]
    fn test_expand_accumulates() {
        // given
        let mut bbox = BoundingBox::default();

        // when
        bbox.expand(&BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        bbox.expand(&BoundingBox::default());
        bbox.expand(&BoundingBox::at_point(Point2::new(-1.0, 5.0)));

        // then
        assert_eq!(bbox, BoundingBox::new(-1.0, 2.0, 3.0, 5.0));
    }

    #[test]
    fn test_from_points() {
        let bbox = BoundingBox::from_points(&[Point2::new(3.0, -1.0), Point2::new(-2.0, 4.0), Point2::new(0.0, 0.0)]);

        assert_eq!(bbox, BoundingBox::new(-2.0, -1.0, 3.0, 4.0));
        assert_eq!(bbox.width(), 5.0);
        assert_eq!(bbox.height(), 5.0);
    }

    #[rstest]
    // horizontal segment, 2 x 1 footprint
    #[case(
        BoundingBox::new(0.0, 0.0, 10.0, 0.0),
        BoundingBox::new(-1.0, -0.5, 1.0, 0.5),
        BoundingBox::new(-1.0, -0.5, 11.0, 0.5)
    )]
    // a point footprint leaves the path as it is
    #[case(
        BoundingBox::new(1.0, 2.0, 3.0, 4.0),
        BoundingBox::at_point(Point2::origin()),
        BoundingBox::new(1.0, 2.0, 3.0, 4.0)
    )]
    fn test_sweep(#[case] path: BoundingBox, #[case] footprint: BoundingBox, #[case] expected: BoundingBox) {
        assert_eq!(path.sweep(&footprint), expected);
    }

    #[test]
    fn test_translate() {
        let bbox = BoundingBox::new(-1.0, -1.0, 1.0, 1.0).translate(Vector2::new(1.0, 1.0));

        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 2.0, 2.0));
    }
}
