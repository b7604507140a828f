mod aperture;
mod aperture_macro;
mod convert;
mod coordinates;
mod document;
mod error;
mod format;
mod function;
mod geometry;
mod replay;
mod types;

pub use aperture::*;
pub use aperture_macro::*;
pub use coordinates::*;
pub use document::*;
pub use error::*;
pub use format::*;
pub use function::*;
pub use geometry::BoundingBox;
pub use types::*;

#[cfg(feature = "testing")]
pub mod testing;
