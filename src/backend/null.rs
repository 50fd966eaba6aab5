//! In-process backend for tests and headless runs.
//!
//! Performs no GPU work: submissions signal their fence immediately
//! (unless auto-signal is disabled to exercise timeout paths), and the
//! surface replays scripted [`SurfaceStatus`] sequences so tests can
//! drive out-of-date and suboptimal recovery deterministically. Every
//! call is appended to an event log the tests assert against.

use std::collections::VecDeque;
use std::time::Duration;

use crate::command::CommandList;
use crate::error::RenderError;
use crate::pipeline::{Fence, FenceStatus, Semaphore};
use crate::registry::{BufferUpload, Registry, TextureUpload};
use crate::types::Extent2d;

use super::{RenderBackend, SurfaceStatus};

/// One observed backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// `commit_resources` with the registry's buffer and texture counts.
    CommitResources { buffers: usize, textures: usize },
    /// `apply_buffer_upload` with the byte count.
    BufferUpload { bytes: usize },
    /// `apply_texture_upload`.
    TextureUpload,
    /// `wait_fence` with whether the fence was observed signaled.
    WaitFence { signaled: bool },
    /// `submit_frame` with the recorded command count and whether the
    /// slot fence was observed signaled before recording began.
    Submit {
        image_index: u32,
        commands: usize,
        fence_was_unsignaled: bool,
    },
    /// `present`.
    Present { image_index: u32 },
    /// `rebuild_targets`.
    RebuildTargets(Extent2d),
    /// `wait_idle`.
    WaitIdle,
}

/// No-op [`RenderBackend`] with scripted surface behavior.
#[derive(Debug)]
pub struct NullBackend {
    next_sync_id: u64,
    next_image: u32,
    image_count: u32,
    /// Statuses returned by successive acquires; empty means `Ok`.
    acquire_script: VecDeque<SurfaceStatus>,
    /// Statuses returned by successive presents; empty means `Ok`.
    present_script: VecDeque<SurfaceStatus>,
    /// When false, submissions leave their fence unsignaled so timeout
    /// handling can be exercised.
    auto_signal: bool,
    events: Vec<BackendEvent>,
}

impl NullBackend {
    /// Backend with `image_count` presentable images and a well-behaved
    /// surface.
    pub fn new(image_count: u32) -> Self {
        assert!(image_count > 0, "null backend requires at least one image");
        Self {
            next_sync_id: 0,
            next_image: 0,
            image_count,
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            auto_signal: true,
            events: Vec::new(),
        }
    }

    /// Queue statuses for the next acquires, in order.
    pub fn script_acquire(&mut self, statuses: impl IntoIterator<Item = SurfaceStatus>) {
        self.acquire_script.extend(statuses);
    }

    /// Queue statuses for the next presents, in order.
    pub fn script_present(&mut self, statuses: impl IntoIterator<Item = SurfaceStatus>) {
        self.present_script.extend(statuses);
    }

    /// Disable fence auto-signal on submit.
    pub fn with_manual_fences(mut self) -> Self {
        self.auto_signal = false;
        self
    }

    /// The calls observed so far.
    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    /// Submissions observed so far.
    pub fn submit_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BackendEvent::Submit { .. }))
            .count()
    }

    /// Presents observed so far.
    pub fn present_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BackendEvent::Present { .. }))
            .count()
    }

    /// Target rebuilds observed so far.
    pub fn rebuild_sizes(&self) -> Vec<Extent2d> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BackendEvent::RebuildTargets(size) => Some(*size),
                _ => None,
            })
            .collect()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_sync_id;
        self.next_sync_id += 1;
        id
    }
}

impl RenderBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn create_fence(&mut self, signaled: bool) -> Fence {
        let id = self.next_id();
        Fence::new(id, signaled)
    }

    fn create_semaphore(&mut self) -> Semaphore {
        let id = self.next_id();
        Semaphore::new(id)
    }

    fn wait_fence(&mut self, fence: &Fence, timeout: Duration) -> bool {
        let signaled = fence.wait_timeout(timeout);
        self.events.push(BackendEvent::WaitFence { signaled });
        signaled
    }

    fn reset_fence(&mut self, fence: &Fence) {
        fence.reset();
    }

    fn commit_resources(&mut self, registry: &Registry) -> Result<(), RenderError> {
        log::trace!("null backend: commit {registry:?}");
        self.events.push(BackendEvent::CommitResources {
            buffers: registry.buffers().len(),
            textures: registry.textures().len(),
        });
        Ok(())
    }

    fn apply_buffer_upload(&mut self, _registry: &Registry, upload: &BufferUpload) {
        self.events.push(BackendEvent::BufferUpload {
            bytes: upload.data.len(),
        });
    }

    fn apply_texture_upload(&mut self, _registry: &Registry, _upload: &TextureUpload) {
        self.events.push(BackendEvent::TextureUpload);
    }

    fn acquire_next_image(
        &mut self,
        _timeout: Duration,
        _signal: &Semaphore,
    ) -> Result<(u32, SurfaceStatus), RenderError> {
        let status = self.acquire_script.pop_front().unwrap_or_default();
        let image = self.next_image;
        if status != SurfaceStatus::OutOfDate {
            self.next_image = (self.next_image + 1) % self.image_count;
        }
        Ok((image, status))
    }

    fn submit_frame(
        &mut self,
        list: &CommandList,
        image_index: u32,
        _wait: &Semaphore,
        _signal: &Semaphore,
        fence: &Fence,
    ) -> Result<(), RenderError> {
        self.events.push(BackendEvent::Submit {
            image_index,
            commands: list.len(),
            fence_was_unsignaled: fence.status() == FenceStatus::Unsignaled,
        });
        if self.auto_signal {
            fence.signal();
        }
        Ok(())
    }

    fn present(&mut self, image_index: u32, _wait: &Semaphore) -> SurfaceStatus {
        self.events.push(BackendEvent::Present { image_index });
        self.present_script.pop_front().unwrap_or_default()
    }

    fn rebuild_targets(&mut self, size: Extent2d) {
        log::trace!("null backend: rebuild targets at {}x{}", size.width, size.height);
        self.events.push(BackendEvent::RebuildTargets(size));
    }

    fn wait_idle(&mut self) {
        self.events.push(BackendEvent::WaitIdle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullBackend>();
    }

    #[test]
    fn test_acquire_cycles_image_indices() {
        let mut backend = NullBackend::new(3);
        let sem = backend.create_semaphore();
        let timeout = Duration::from_secs(1);

        let mut indices = Vec::new();
        for _ in 0..4 {
            let (index, status) = backend.acquire_next_image(timeout, &sem).unwrap();
            assert_eq!(status, SurfaceStatus::Ok);
            indices.push(index);
        }
        assert_eq!(indices, [0, 1, 2, 0]);
    }

    #[test]
    fn test_scripted_acquire_does_not_consume_image() {
        let mut backend = NullBackend::new(2);
        backend.script_acquire([SurfaceStatus::OutOfDate]);
        let sem = backend.create_semaphore();
        let timeout = Duration::from_secs(1);

        let (_, status) = backend.acquire_next_image(timeout, &sem).unwrap();
        assert_eq!(status, SurfaceStatus::OutOfDate);

        let (index, status) = backend.acquire_next_image(timeout, &sem).unwrap();
        assert_eq!(status, SurfaceStatus::Ok);
        assert_eq!(index, 0);
    }

    #[test]
    fn test_submit_signals_fence() {
        let mut backend = NullBackend::new(2);
        let fence = backend.create_fence(false);
        let wait = backend.create_semaphore();
        let signal = backend.create_semaphore();
        let list = CommandList::new();

        backend
            .submit_frame(&list, 0, &wait, &signal, &fence)
            .unwrap();
        assert_eq!(fence.status(), FenceStatus::Signaled);
        assert_eq!(
            backend.events(),
            [BackendEvent::Submit {
                image_index: 0,
                commands: 0,
                fence_was_unsignaled: true,
            }]
        );
    }

    #[test]
    fn test_manual_fences_leave_fence_unsignaled() {
        let mut backend = NullBackend::new(2).with_manual_fences();
        let fence = backend.create_fence(false);
        let wait = backend.create_semaphore();
        let signal = backend.create_semaphore();
        let list = CommandList::new();

        backend
            .submit_frame(&list, 0, &wait, &signal, &fence)
            .unwrap();
        assert_eq!(fence.status(), FenceStatus::Unsignaled);
    }
}
