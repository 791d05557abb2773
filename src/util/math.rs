//! Math type re-exports.
//!
//! Vector and quaternion types come from `glam`. Double precision is used
//! for mesh and curve positions, single precision for transforms, colors
//! and per-vertex attributes.

pub use glam::{
    // Single precision
    Vec2, Vec3, Vec4, Quat,
    // Double precision
    DVec2, DVec3,
    // Integer
    IVec2, IVec3,
};
