//! Restorable GPU images.
//!
//! GPU textures can vanish when the graphics context is lost. This crate keeps enough state on
//! the CPU side to rebuild them exactly:
//!
//! - Create a [`RestorableContext`] over a [`GraphicsBackend`]
//! - Create images and draw into them; draws are recorded per image
//! - Call [`RestorableContext::resolve_stale_images`] at frame boundaries to fold histories into
//!   CPU baselines
//! - After a context loss, call [`RestorableContext::restore_if_needed`] to rebuild every texture
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Backend contract and the CPU reference backend.
pub mod graphics;
/// Restorable images, resolution and restoration.
pub mod restorable;

pub use crate::foundation::core::{ImageId, Pixels, Region, Rgba8Premul, ShaderId, TextureId};
pub use crate::foundation::error::{RestoreError, RestoreResult};

pub use crate::graphics::backend::{DrawSubmission, GraphicsBackend};
pub use crate::graphics::cpu::{BackendOp, CpuBackend, CpuBackendOpts, CpuBackendStats};
pub use crate::graphics::draw::{Address, CompositeMode, Filter, Geometry, MAX_SOURCES, Vertex};
pub use crate::graphics::program::{
    CompiledProgram, Fragment, FragmentKernel, UniformKind, programs,
};
pub use crate::graphics::texture_pool::{TexturePoolOpts, TexturePoolStats};
pub use crate::restorable::command::{CommandKind, DrawCommand, DrawTriangles};
pub use crate::restorable::config::{ContextOpts, ResolvePolicy};
pub use crate::restorable::context::RestorableContext;
pub use crate::restorable::image::ImageInfo;
pub use crate::restorable::shader::{Shader, UniformValue, Uniforms};
pub use crate::restorable::tracker::DependencyTracker;
