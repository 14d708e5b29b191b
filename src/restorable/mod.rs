//! Images that survive graphics context loss.
//!
//! Every image keeps a CPU baseline plus the commands drawn since. [`RestorableContext`]
//! owns the image arena, collapses histories on resolve and rebuilds textures on restore.
//!
//! [`RestorableContext`]: context::RestorableContext

/// Recorded draw commands.
pub mod command;
/// Context options and resolve policies.
pub mod config;
/// The image registry and its mutation API.
pub mod context;
pub(crate) mod image;
mod resolver;
mod restore;
/// Shaders and uniform binding.
pub mod shader;
/// Restore ordering.
pub mod tracker;
