mod arc;
mod bounding_box;
mod footprint;

pub(crate) use arc::ArcGeometry;
pub use bounding_box::BoundingBox;
pub(crate) use footprint::WithFootprint;
