//! Frame pipelining: CPU recording overlapped with GPU execution.
//!
//! ```text
//!              slot 0                 slot 1                 slot 0
//!   CPU:  [record frame 0]      [record frame 1]      [record frame 2]
//!                  \ submit            \ submit       ^
//!   GPU:           [execute frame 0]   [execute frame 1]
//!                            \ fence 0 signal --------/
//! ```
//!
//! With N slots the CPU records frame *k + 1* while the GPU still
//! executes frame *k*. Each slot owns an image-available semaphore, a
//! render-finished semaphore, an in-flight fence, and a command list; the
//! fence is the sole correctness gate: slot *k* is not touched again
//! until its fence from the previous use has been observed signaled.
//!
//! Each frame walks `AcquireImage -> WaitInFlightFence -> [Reconstruct?]
//! -> RecordCommands -> Submit -> Present`. `OutOfDate` on acquire
//! rebuilds the targets and retries a bounded number of times;
//! `Suboptimal` defers the rebuild to the next acquire. Every blocking
//! wait carries a timeout that surfaces as an error rather than hanging.

mod sync;

pub use sync::{Fence, FenceStatus, Semaphore};

use std::time::{Duration, Instant};

use crate::backend::{RenderBackend, SurfaceStatus};
use crate::command::CommandList;
use crate::error::RenderError;
use crate::graph::RenderGraph;
use crate::registry::{Registry, RegistryLimits};
use crate::resize::ResizeManager;
use crate::types::Extent2d;

/// Per-frame values passed to node predicates and execute closures.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Frames rendered since startup.
    pub frame_index: u64,
    /// Current window/target size.
    pub window_size: Extent2d,
    /// True only during the frame in which a target rebuild occurred.
    pub window_size_changed: bool,
    /// Seconds since startup.
    pub elapsed: f32,
    /// Seconds since the previous frame.
    pub delta: f32,
}

/// Frame pipeline tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Frame slots (frames in flight). Two or three in practice.
    pub frames_in_flight: usize,
    /// Ceiling for every blocking fence wait.
    pub fence_timeout: Duration,
    /// Ceiling for image acquisition.
    pub acquire_timeout: Duration,
    /// Out-of-date rebuild attempts allowed within one frame.
    pub max_rebuild_attempts: usize,
    /// Arena ceilings for each registry generation.
    pub registry_limits: RegistryLimits,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            fence_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
            max_rebuild_attempts: 3,
            registry_limits: RegistryLimits::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the frame slot count.
    pub fn with_frames_in_flight(mut self, count: usize) -> Self {
        assert!(count > 0, "at least one frame in flight is required");
        self.frames_in_flight = count;
        self
    }

    /// Set the blocking-wait ceiling.
    pub fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout = timeout;
        self
    }

    /// Set the registry arena ceilings.
    pub fn with_registry_limits(mut self, limits: RegistryLimits) -> Self {
        self.registry_limits = limits;
        self
    }
}

/// The application half of the frame loop.
pub trait Application {
    /// Register graph nodes. Called once before the first frame; the
    /// node set is fixed afterwards.
    fn setup(&mut self, graph: &mut RenderGraph);

    /// Create and publish resources under the `"static"` scope. Called at
    /// the start of every construction pass, before any node constructs.
    fn construct_static(&mut self, _registry: &mut Registry) -> Result<(), RenderError> {
        Ok(())
    }

    /// Per-frame simulation step, before reconstruction and recording.
    fn update(&mut self, _elapsed: f32, _delta: f32) {}
}

/// Synchronization state owned by one frame slot.
struct FrameSlot {
    image_available: Semaphore,
    render_finished: Semaphore,
    in_flight: Fence,
    commands: CommandList,
}

/// Drives the render graph through the per-frame state machine against a
/// [`RenderBackend`].
pub struct FramePipeline<B: RenderBackend> {
    backend: B,
    config: PipelineConfig,
    graph: RenderGraph,
    slots: Vec<FrameSlot>,
    /// Registry generation backing each slot's execute closures. Replaced
    /// only after the slot fence has been observed signaled, so the GPU
    /// is never reading a dropped generation's resources.
    registries: Vec<Option<Registry>>,
    /// Slots whose construction output predates the latest trigger.
    pending_construct: Vec<bool>,
    resize: ResizeManager,
    frame_index: u64,
    current_slot: usize,
    window_size: Extent2d,
    window_size_changed: bool,
    rebuild_before_acquire: bool,
    started: Instant,
    last_frame: Instant,
}

impl<B: RenderBackend> FramePipeline<B> {
    /// Create a pipeline and run the application's setup.
    pub fn new(
        mut backend: B,
        app: &mut impl Application,
        config: PipelineConfig,
        window_size: Extent2d,
    ) -> Self {
        let slots = (0..config.frames_in_flight)
            .map(|_| FrameSlot {
                image_available: backend.create_semaphore(),
                render_finished: backend.create_semaphore(),
                // Signaled at creation so a slot's first use never waits.
                in_flight: backend.create_fence(true),
                commands: CommandList::new(),
            })
            .collect();

        let mut graph = RenderGraph::new(config.frames_in_flight);
        app.setup(&mut graph);
        log::info!(
            "frame pipeline: {} nodes, {} frames in flight, backend '{}'",
            graph.node_count(),
            config.frames_in_flight,
            backend.name()
        );

        let now = Instant::now();
        Self {
            backend,
            graph,
            slots,
            registries: (0..config.frames_in_flight).map(|_| None).collect(),
            pending_construct: vec![true; config.frames_in_flight],
            resize: ResizeManager::new(window_size),
            frame_index: 0,
            current_slot: 0,
            window_size,
            window_size_changed: false,
            rebuild_before_acquire: false,
            started: now,
            last_frame: now,
            config,
        }
    }

    /// Forward an OS resize event into the debounce window.
    pub fn on_resize_event(&mut self, size: Extent2d) {
        self.resize.on_resize_event(size);
    }

    /// Record, submit, and present one frame.
    pub fn render_frame(&mut self, app: &mut impl Application) -> Result<(), RenderError> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.started).as_secs_f32();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        app.update(elapsed, delta);

        // A settled debounced resize, or a deferred suboptimal-present
        // rebuild, is applied before acquiring.
        if let Some(size) = self.resize.update() {
            self.rebuild_targets(size)?;
        } else if self.rebuild_before_acquire {
            let size = self.resize.current_size();
            self.rebuild_targets(size)?;
        }

        // AcquireImage, rebuilding on OutOfDate with a bounded retry.
        let mut attempts = 0;
        let image_index = loop {
            let slot = &self.slots[self.current_slot];
            let (index, status) = self
                .backend
                .acquire_next_image(self.config.acquire_timeout, &slot.image_available)?;
            match status {
                SurfaceStatus::Ok => break index,
                SurfaceStatus::Suboptimal => {
                    // Usable this frame; rebuild at the next acquire.
                    self.rebuild_before_acquire = true;
                    break index;
                }
                SurfaceStatus::OutOfDate => {
                    attempts += 1;
                    if attempts > self.config.max_rebuild_attempts {
                        return Err(RenderError::SurfaceLost { attempts });
                    }
                    log::warn!("surface out of date on acquire, rebuilding (attempt {attempts})");
                    self.resize.force_resize();
                    let size = self.resize.current_size();
                    self.rebuild_targets(size)?;
                }
            }
        };

        // WaitInFlightFence: the GPU must be done with this slot's
        // previous submission before anything here is touched again.
        let fence = self.slots[self.current_slot].in_flight.clone();
        if !self.backend.wait_fence(&fence, self.config.fence_timeout) {
            return Err(RenderError::SyncTimeout(format!(
                "in-flight fence for frame slot {} (timeout {:?})",
                self.current_slot, self.config.fence_timeout
            )));
        }

        let ctx = FrameContext {
            frame_index: self.frame_index,
            window_size: self.window_size,
            window_size_changed: self.window_size_changed,
            elapsed,
            delta,
        };

        // Reconstruct if any node asks for it, or if this slot's output
        // predates the last rebuild.
        if self.graph.needs_reconstruction(&ctx) {
            for pending in &mut self.pending_construct {
                *pending = true;
            }
        }
        if self.pending_construct[self.current_slot] {
            self.construct_slot(app)?;
        }

        // RecordCommands.
        let slot = &mut self.slots[self.current_slot];
        self.backend.reset_fence(&slot.in_flight);
        slot.commands.clear();
        self.graph.execute(&ctx, self.current_slot, &mut slot.commands);
        log::trace!(
            "frame {}: slot {} recorded {} commands for image {}",
            self.frame_index,
            self.current_slot,
            slot.commands.len(),
            image_index
        );

        // Submit and Present.
        let slot = &self.slots[self.current_slot];
        self.backend.submit_frame(
            &slot.commands,
            image_index,
            &slot.image_available,
            &slot.render_finished,
            &slot.in_flight,
        )?;
        match self.backend.present(image_index, &slot.render_finished) {
            SurfaceStatus::Ok => {}
            SurfaceStatus::Suboptimal | SurfaceStatus::OutOfDate => {
                self.rebuild_before_acquire = true;
            }
        }

        self.window_size_changed = false;
        self.frame_index += 1;
        self.current_slot = (self.current_slot + 1) % self.slots.len();
        Ok(())
    }

    /// Run a fresh construction pass for the current slot: new registry
    /// generation, static pass, every node, then batched backend commit
    /// and queued uploads. The previous generation is dropped only after
    /// all of that succeeds.
    fn construct_slot(&mut self, app: &mut impl Application) -> Result<(), RenderError> {
        log::trace!(
            "frame {}: constructing slot {}",
            self.frame_index,
            self.current_slot
        );
        let mut registry = Registry::new(self.config.registry_limits);
        app.construct_static(&mut registry)?;
        self.graph.construct(&mut registry, self.current_slot)?;
        self.backend.commit_resources(&registry)?;
        for upload in registry.take_buffer_uploads() {
            self.backend.apply_buffer_upload(&registry, &upload);
        }
        for upload in registry.take_texture_uploads() {
            self.backend.apply_texture_upload(&registry, &upload);
        }
        self.registries[self.current_slot] = Some(registry);
        self.pending_construct[self.current_slot] = false;
        Ok(())
    }

    /// Wait for all in-flight work, rebuild the size-dependent targets,
    /// and invalidate every slot's construction output.
    fn rebuild_targets(&mut self, size: Extent2d) -> Result<(), RenderError> {
        log::info!("rebuilding targets at {}x{}", size.width, size.height);
        self.wait_idle()?;
        self.backend.rebuild_targets(size);
        self.window_size = size;
        self.window_size_changed = true;
        for pending in &mut self.pending_construct {
            *pending = true;
        }
        self.rebuild_before_acquire = false;
        Ok(())
    }

    /// Block until every slot's fence signals and the backend drains.
    /// Required once before teardown; resources must not drop while the
    /// GPU may still read them.
    pub fn wait_idle(&mut self) -> Result<(), RenderError> {
        for index in 0..self.slots.len() {
            let fence = self.slots[index].in_flight.clone();
            if fence.status() == FenceStatus::Signaled {
                continue;
            }
            if !self.backend.wait_fence(&fence, self.config.fence_timeout) {
                return Err(RenderError::SyncTimeout(format!(
                    "frame slot {index} fence while draining"
                )));
            }
        }
        self.backend.wait_idle();
        Ok(())
    }

    /// Frames rendered since startup.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Current window/target size.
    pub fn window_size(&self) -> Extent2d {
        self.window_size
    }

    /// The render graph.
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    /// The backend, for inspection in tests and teardown in apps.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The registry generation currently backing a frame slot.
    pub fn registry(&self, slot: usize) -> Option<&Registry> {
        self.registries[slot].as_ref()
    }
}
