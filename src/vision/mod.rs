//! Frame primitives: geometry, crops, sharpness and the light gate.

mod frame;
mod geometry;
mod jpeg;
mod light;
mod sharpness;

pub use frame::Frame;
pub use geometry::{BBox, PixelRect};
pub use jpeg::{encode_jpeg, save_jpeg};
pub use light::LightGate;
pub use sharpness::laplacian_variance;
