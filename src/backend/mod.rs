//! GPU backend boundary.
//!
//! The frame pipeline drives rendering entirely through the
//! [`RenderBackend`] trait: resource commits after construction, queued
//! uploads, image acquisition, submission, and presentation. Concrete
//! graphics-API implementations live out of tree; in tree there is only
//! [`NullBackend`], an in-process implementation used by tests and
//! headless runs.
//!
//! Surface loss is reported, never handled, at this boundary: acquire and
//! present return a [`SurfaceStatus`] and the pipeline owns the rebuild
//! policy.

pub mod null;

pub use null::NullBackend;

use std::time::Duration;

use crate::command::CommandList;
use crate::error::RenderError;
use crate::pipeline::{Fence, Semaphore};
use crate::registry::{BufferUpload, Registry, TextureUpload};
use crate::types::Extent2d;

/// Presentation surface health reported by acquire and present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceStatus {
    /// The surface matches its targets.
    #[default]
    Ok,
    /// The frame was usable but the targets no longer match the surface
    /// optimally; rebuild at the next opportunity.
    Suboptimal,
    /// The surface is unusable; targets must be rebuilt before the frame
    /// can proceed.
    OutOfDate,
}

/// The driver-facing half of the frame pipeline.
pub trait RenderBackend: Send + Sync {
    /// Backend name for diagnostics.
    fn name(&self) -> &str;

    /// Create a fence, optionally already signaled (frame slots start
    /// signaled so their first use does not wait forever).
    fn create_fence(&mut self, signaled: bool) -> Fence;

    /// Create a GPU-side ordering semaphore.
    fn create_semaphore(&mut self) -> Semaphore;

    /// Block until `fence` signals or `timeout` elapses. Returns `true`
    /// if the fence was observed signaled.
    fn wait_fence(&mut self, fence: &Fence, timeout: Duration) -> bool;

    /// Return `fence` to the unsignaled state before its next submission.
    fn reset_fence(&mut self, fence: &Fence);

    /// Create the GPU objects for every resource described in `registry`.
    ///
    /// Called once per construction pass, after the whole graph has
    /// constructed successfully; creation is batched here so pool sizing
    /// can use the registry's final counts.
    fn commit_resources(&mut self, registry: &Registry) -> Result<(), RenderError>;

    /// Apply one queued buffer initialization.
    fn apply_buffer_upload(&mut self, registry: &Registry, upload: &BufferUpload);

    /// Apply one queued texture initialization (pixel decode, widening,
    /// mip generation happen here).
    fn apply_texture_upload(&mut self, registry: &Registry, upload: &TextureUpload);

    /// Acquire the next presentable image, signaling `signal` when it is
    /// ready. Returns the image index and the surface health.
    fn acquire_next_image(
        &mut self,
        timeout: Duration,
        signal: &Semaphore,
    ) -> Result<(u32, SurfaceStatus), RenderError>;

    /// Submit recorded commands: wait on `wait` (image available), signal
    /// `signal` (render finished) and `fence` (slot reusable) on
    /// completion.
    fn submit_frame(
        &mut self,
        list: &CommandList,
        image_index: u32,
        wait: &Semaphore,
        signal: &Semaphore,
        fence: &Fence,
    ) -> Result<(), RenderError>;

    /// Present `image_index` after `wait` (render finished) signals.
    fn present(&mut self, image_index: u32, wait: &Semaphore) -> SurfaceStatus;

    /// Recreate the size-dependent presentation targets at `size`.
    fn rebuild_targets(&mut self, size: Extent2d);

    /// Block until all submitted GPU work has completed. The single
    /// required teardown barrier before resources drop.
    fn wait_idle(&mut self);
}
