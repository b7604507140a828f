use std::f64::consts::TAU;

use nalgebra::Point2;

use crate::aperture::{Aperture, ApertureShape};
use crate::geometry::BoundingBox;

/// The extent of the material a shape exposes, relative to its own origin.
pub(crate) trait WithFootprint {
    fn footprint(&self) -> BoundingBox;
}

impl WithFootprint for Aperture {
    /// Macro references have no evaluated geometry, their footprint is the origin itself.
    fn footprint(&self) -> BoundingBox {
        let value = |index: usize| {
            self.modifiers
                .get(index)
                .map(|modifier| modifier.value)
                .unwrap_or(0.0)
        };

        match &self.shape {
            ApertureShape::Circle => {
                let radius = value(0) / 2.0;
                BoundingBox::new(-radius, -radius, radius, radius)
            }
            ApertureShape::Rectangle | ApertureShape::Obround => {
                let (half_x, half_y) = (value(0) / 2.0, value(1) / 2.0);
                BoundingBox::new(-half_x, -half_y, half_x, half_y)
            }
            ApertureShape::Polygon => {
                let radius = value(0) / 2.0;
                let vertices = value(1) as usize;
                let rotation = value(2).to_radians();

                let points = (0..vertices)
                    .map(|index| {
                        let angle = rotation + TAU * index as f64 / vertices as f64;
                        Point2::new(radius * angle.cos(), radius * angle.sin())
                    })
                    .collect::<Vec<_>>();

                if points.is_empty() {
                    BoundingBox::at_point(Point2::origin())
                } else {
                    BoundingBox::from_points(&points)
                }
            }
            ApertureShape::Macro(_) => BoundingBox::at_point(Point2::origin()),
        }
    }
}
