//! Frame command recording.
//!
//! Nodes record their per-frame GPU work into a [`CommandList`] as a flat
//! sequence of [`Command`] values. The representation is a closed tagged
//! enum consumed via exhaustive matching in the backend; there is no
//! persistent state beyond what is explicit in each command, so a render,
//! compute, or ray tracing state must be (re)bound before any draw,
//! dispatch, or trace that depends on it.

use crate::arena::Handle;
use crate::registry::{BindingSet, Buffer, ComputeState, RayTracingState, RenderState, Texture};
use crate::types::ClearValue;

/// A single recorded GPU operation.
#[derive(Debug, Clone)]
pub enum Command {
    /// Bind a graphics render state (pipeline + target + viewport).
    SetRenderState(Handle<RenderState>),
    /// Bind a compute state.
    SetComputeState(Handle<ComputeState>),
    /// Bind a ray tracing state.
    SetRayTracingState(Handle<RayTracingState>),
    /// Bind a binding set at the given set index for the bound state.
    BindSet {
        /// Set index.
        index: u32,
        /// The binding set to bind.
        set: Handle<BindingSet>,
    },
    /// Bind a vertex buffer to input slot 0.
    BindVertexBuffer(Handle<Buffer>),
    /// Bind an index buffer (u32 indices).
    BindIndexBuffer(Handle<Buffer>),
    /// Non-indexed draw.
    Draw {
        /// Number of vertices.
        vertex_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
    /// Indexed draw.
    DrawIndexed {
        /// Number of indices.
        index_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
    /// Compute dispatch.
    Dispatch {
        /// Workgroups in X.
        x: u32,
        /// Workgroups in Y.
        y: u32,
        /// Workgroups in Z.
        z: u32,
    },
    /// Ray dispatch over a 2D launch grid.
    TraceRays {
        /// Launch width in rays.
        width: u32,
        /// Launch height in rays.
        height: u32,
    },
    /// Upload bytes into a buffer (per-frame dynamic data such as camera
    /// uniforms). The data is owned by the command.
    UpdateBuffer {
        /// Target buffer.
        buffer: Handle<Buffer>,
        /// Destination byte offset.
        offset: u64,
        /// Bytes to write.
        data: Vec<u8>,
    },
    /// Clear a texture outside of a render pass.
    ClearTexture {
        /// Target texture.
        texture: Handle<Texture>,
        /// Clear value.
        value: ClearValue,
    },
}

/// Which kind of pipeline state is currently bound during recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundState {
    None,
    Render,
    Compute,
    RayTracing,
}

/// An ordered sequence of commands for one frame.
///
/// Recording validates the bound-state discipline: a draw requires a render
/// state, a dispatch requires a compute state, and a trace requires a ray
/// tracing state. Violations panic immediately with the offending command,
/// since they indicate a node bug that would otherwise surface as undefined
/// backend behavior.
#[derive(Debug)]
pub struct CommandList {
    commands: Vec<Command>,
    bound: BoundState,
}

impl CommandList {
    /// Create a new empty command list.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            bound: BoundState::None,
        }
    }

    /// Append a command, validating bound-state discipline.
    pub fn push(&mut self, command: Command) {
        match &command {
            Command::SetRenderState(_) => self.bound = BoundState::Render,
            Command::SetComputeState(_) => self.bound = BoundState::Compute,
            Command::SetRayTracingState(_) => self.bound = BoundState::RayTracing,
            Command::Draw { .. } | Command::DrawIndexed { .. } => {
                assert!(
                    self.bound == BoundState::Render,
                    "draw recorded without a bound render state"
                );
            }
            Command::Dispatch { .. } => {
                assert!(
                    self.bound == BoundState::Compute,
                    "dispatch recorded without a bound compute state"
                );
            }
            Command::TraceRays { .. } => {
                assert!(
                    self.bound == BoundState::RayTracing,
                    "trace recorded without a bound ray tracing state"
                );
            }
            Command::BindSet { .. } => {
                assert!(
                    self.bound != BoundState::None,
                    "binding set bound without a pipeline state"
                );
            }
            Command::BindVertexBuffer(_)
            | Command::BindIndexBuffer(_)
            | Command::UpdateBuffer { .. }
            | Command::ClearTexture { .. } => {}
        }
        self.commands.push(command);
    }

    /// The recorded commands in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Clear all commands, preserving the allocation for the next frame.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.bound = BoundState::None;
    }
}

impl Default for CommandList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Registry, RegistryLimits, RenderStateDescriptor};
    use crate::types::{BufferDescriptor, BufferUsage};

    fn render_state_handle() -> Handle<RenderState> {
        // Build a minimal registry so handles are real arena slots.
        let mut registry = Registry::new(RegistryLimits::default());
        registry.begin_node("test");
        let target = registry
            .create_render_target(crate::registry::RenderTargetDescriptor::window())
            .unwrap();
        let state = registry
            .create_render_state(RenderStateDescriptor {
                label: None,
                target,
                vertex_layout: Default::default(),
                shader: "forward".to_string(),
                binding_sets: Vec::new(),
                viewport: Default::default(),
                blend: Default::default(),
                raster: Default::default(),
            })
            .unwrap();
        registry.finish_node();
        state
    }

    fn ray_tracing_state_handle() -> Handle<RayTracingState> {
        let mut registry = Registry::new(RegistryLimits::default());
        registry.begin_node("test");
        let state = registry
            .create_ray_tracing_state(crate::registry::RayTracingStateDescriptor {
                label: None,
                shader_binding_table: Default::default(),
                binding_sets: Vec::new(),
                max_recursion_depth: 1,
            })
            .unwrap();
        registry.finish_node();
        state
    }

    #[test]
    fn test_record_draw_with_state() {
        let state = render_state_handle();
        let mut cmds = CommandList::new();

        cmds.push(Command::SetRenderState(state));
        cmds.push(Command::Draw {
            vertex_count: 3,
            instance_count: 1,
        });

        assert_eq!(cmds.len(), 2);
        assert!(matches!(cmds.commands()[1], Command::Draw { .. }));
    }

    #[test]
    #[should_panic(expected = "draw recorded without a bound render state")]
    fn test_draw_without_state_panics() {
        let mut cmds = CommandList::new();
        cmds.push(Command::Draw {
            vertex_count: 3,
            instance_count: 1,
        });
    }

    #[test]
    #[should_panic(expected = "dispatch recorded without a bound compute state")]
    fn test_dispatch_under_render_state_panics() {
        let state = render_state_handle();
        let mut cmds = CommandList::new();
        cmds.push(Command::SetRenderState(state));
        cmds.push(Command::Dispatch { x: 1, y: 1, z: 1 });
    }

    #[test]
    fn test_record_trace_with_state() {
        let state = ray_tracing_state_handle();
        let mut cmds = CommandList::new();
        cmds.push(Command::SetRayTracingState(state));
        cmds.push(Command::TraceRays {
            width: 800,
            height: 600,
        });
        assert!(matches!(cmds.commands()[1], Command::TraceRays { .. }));
    }

    #[test]
    #[should_panic(expected = "trace recorded without a bound ray tracing state")]
    fn test_trace_under_render_state_panics() {
        let state = render_state_handle();
        let mut cmds = CommandList::new();
        cmds.push(Command::SetRenderState(state));
        cmds.push(Command::TraceRays {
            width: 800,
            height: 600,
        });
    }

    #[test]
    fn test_clear_resets_bound_state() {
        let state = render_state_handle();
        let mut cmds = CommandList::new();
        cmds.push(Command::SetRenderState(state));
        cmds.clear();
        assert!(cmds.is_empty());

        // Bound state does not survive clear; draws must rebind.
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cmds.push(Command::Draw {
                vertex_count: 3,
                instance_count: 1,
            });
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_buffer_update_needs_no_state() {
        let mut registry = Registry::new(RegistryLimits::default());
        registry.begin_node("test");
        let buffer = registry
            .create_buffer(BufferDescriptor::new(64, BufferUsage::UNIFORM))
            .unwrap();
        registry.finish_node();

        let mut cmds = CommandList::new();
        cmds.push(Command::UpdateBuffer {
            buffer,
            offset: 0,
            data: vec![0u8; 64],
        });
        assert_eq!(cmds.len(), 1);
    }
}
