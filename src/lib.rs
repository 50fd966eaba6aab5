//! # Garnet Render
//!
//! Execution core of a render engine: a render graph of named nodes, a
//! resource registry mediating GPU resource creation and cross-node data
//! exchange, and a frame-pipelining layer synchronizing CPU recording
//! against GPU execution across multiple frames in flight.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderGraph`] / [`RenderNode`] - Named per-frame work units with a
//!   construct phase and an execute phase, ordered by discovered
//!   dependencies
//! - [`Registry`] - Per-construction-pass resource factory, cross-node
//!   publish/lookup directory, and upload queue
//! - [`FramePipeline`] - The per-frame acquire/wait/record/submit/present
//!   state machine over the [`RenderBackend`] trait
//! - [`NullBackend`] - In-process backend for tests and headless runs
//!
//! ## Example
//!
//! ```ignore
//! use garnet_render::{Application, FramePipeline, NullBackend, PipelineConfig};
//!
//! let mut app = MyApp::default();
//! let mut pipeline = FramePipeline::new(
//!     NullBackend::new(3),
//!     &mut app,
//!     PipelineConfig::default(),
//!     Extent2d::new(1280, 720),
//! );
//! loop {
//!     pipeline.render_frame(&mut app)?;
//! }
//! ```

pub mod arena;
pub mod backend;
pub mod command;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod registry;
pub mod resize;
pub mod shader;
pub mod types;

// Re-export main types for convenience
pub use arena::{Arena, Handle};
pub use backend::{NullBackend, RenderBackend, SurfaceStatus};
pub use command::{Command, CommandList};
pub use error::RenderError;
pub use graph::{ExecuteFn, RenderGraph, RenderNode};
pub use pipeline::{Application, FrameContext, FramePipeline, PipelineConfig};
pub use registry::{Registry, RegistryLimits, ResourceKind};
pub use resize::ResizeManager;
pub use shader::{ShaderReload, ShaderWatcher, WatchConfig};
pub use types::{
    BufferDescriptor, BufferUsage, ClearValue, Extent2d, TextureDescriptor, TextureFormat,
    TextureUsage,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the rendering subsystem.
///
/// This should be called before using any rendering functionality.
pub fn init() {
    log::info!("Garnet Render v{VERSION} initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_null_backend() {
        let backend = NullBackend::new(2);
        assert_eq!(RenderBackend::name(&backend), "null");
    }
}
