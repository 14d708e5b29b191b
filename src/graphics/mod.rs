//! Graphics command layer consumed by restorable images.
//!
//! [`GraphicsBackend`](backend::GraphicsBackend) is the seam to the native device. [`cpu`]
//! provides a deterministic software implementation used for testing and simulation.

/// Backend contract.
pub mod backend;
/// Software reference backend.
pub mod cpu;
/// Draw parameters: geometry, blending and sampling.
pub mod draw;
/// Compiled fragment programs.
pub mod program;
pub(crate) mod raster;
/// Pooled texture storage for the CPU backend.
pub mod texture_pool;
