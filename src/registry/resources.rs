//! Resource records and handle-bearing descriptors.
//!
//! Every `create_*` call on the [`Registry`](super::Registry) is pure
//! description-capture: it stores one of these records in a capped arena and
//! returns the slot handle. No GPU object is necessarily created
//! synchronously; the backend may batch creation after all nodes have
//! finished their construct phase.

use std::path::PathBuf;

use glam::Mat4;

use crate::arena::Handle;
use crate::types::{
    BlendMode, BufferDescriptor, ClearValue, Extent2d, RasterState, TextureDescriptor,
    TextureFormat, VertexLayout, Viewport,
};

/// A buffer resource record.
#[derive(Debug, Clone)]
pub struct Buffer {
    /// Creation descriptor.
    pub desc: BufferDescriptor,
}

/// A texture resource record.
#[derive(Debug, Clone)]
pub struct Texture {
    /// Creation descriptor.
    pub desc: TextureDescriptor,
}

// ============================================================================
// Render targets
// ============================================================================

/// Sizing policy for a render target.
///
/// Window-relative targets are recreated at the new extent whenever the
/// presentation target is rebuilt after a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetSize {
    /// Track the window/swapchain extent.
    #[default]
    Window,
    /// Fixed extent independent of the window.
    Fixed(Extent2d),
}

/// A single color attachment description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    /// Attachment format.
    pub format: TextureFormat,
    /// Clear behavior at the start of the pass.
    pub clear: ClearValue,
}

/// Depth/stencil attachment description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAttachment {
    /// Attachment format (must be a depth/stencil format).
    pub format: TextureFormat,
    /// Clear behavior at the start of the pass.
    pub clear: ClearValue,
}

/// Descriptor for creating a render target.
#[derive(Debug, Clone, Default)]
pub struct RenderTargetDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Sizing policy.
    pub size: TargetSize,
    /// Color attachments, in shader output order.
    pub colors: Vec<ColorAttachment>,
    /// Optional depth/stencil attachment.
    pub depth: Option<DepthAttachment>,
}

impl RenderTargetDescriptor {
    /// Create a window-sized target with no attachments yet.
    pub fn window() -> Self {
        Self {
            size: TargetSize::Window,
            ..Self::default()
        }
    }

    /// Create a fixed-size target with no attachments yet.
    pub fn fixed(extent: Extent2d) -> Self {
        Self {
            size: TargetSize::Fixed(extent),
            ..Self::default()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a color attachment.
    pub fn with_color(mut self, format: TextureFormat, clear: ClearValue) -> Self {
        self.colors.push(ColorAttachment { format, clear });
        self
    }

    /// Set the depth attachment.
    pub fn with_depth(mut self, format: TextureFormat, clear: ClearValue) -> Self {
        assert!(
            format.is_depth_stencil(),
            "depth attachment requires a depth/stencil format, got {format:?}"
        );
        self.depth = Some(DepthAttachment { format, clear });
        self
    }
}

/// A render target resource record.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    /// Creation descriptor.
    pub desc: RenderTargetDescriptor,
}

// ============================================================================
// Binding sets
// ============================================================================

/// A resource bound to one shader binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    /// Uniform buffer binding.
    UniformBuffer(Handle<Buffer>),
    /// Storage buffer binding.
    StorageBuffer(Handle<Buffer>),
    /// Sampled texture binding.
    SampledTexture(Handle<Texture>),
    /// Storage image binding.
    StorageTexture(Handle<Texture>),
    /// Top-level acceleration structure binding.
    AccelerationStructure(Handle<TopLevelAs>),
}

/// One shader binding: slot index plus the bound resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderBinding {
    /// Binding slot index within the set.
    pub binding: u32,
    /// The bound resource.
    pub resource: Binding,
}

impl ShaderBinding {
    /// Create a new shader binding.
    pub fn new(binding: u32, resource: Binding) -> Self {
        Self { binding, resource }
    }
}

/// A binding set resource record.
#[derive(Debug, Clone)]
pub struct BindingSet {
    /// Bindings in this set.
    pub bindings: Vec<ShaderBinding>,
}

// ============================================================================
// Pipeline states
// ============================================================================

/// Descriptor for creating a graphics render state.
#[derive(Debug, Clone)]
pub struct RenderStateDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Target the state renders into.
    pub target: Handle<RenderTarget>,
    /// Vertex input layout.
    pub vertex_layout: VertexLayout,
    /// Shader module name (resolved by the backend).
    pub shader: String,
    /// Binding sets, in set-index order.
    pub binding_sets: Vec<Handle<BindingSet>>,
    /// Viewport configuration.
    pub viewport: Viewport,
    /// Blend configuration.
    pub blend: BlendMode,
    /// Rasterizer configuration.
    pub raster: RasterState,
}

/// A graphics render state resource record.
#[derive(Debug, Clone)]
pub struct RenderState {
    /// Creation descriptor.
    pub desc: RenderStateDescriptor,
}

/// Descriptor for creating a compute state.
#[derive(Debug, Clone)]
pub struct ComputeStateDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Compute shader module name.
    pub shader: String,
    /// Binding sets, in set-index order.
    pub binding_sets: Vec<Handle<BindingSet>>,
}

/// A compute state resource record.
#[derive(Debug, Clone)]
pub struct ComputeState {
    /// Creation descriptor.
    pub desc: ComputeStateDescriptor,
}

// ============================================================================
// Ray tracing
// ============================================================================

/// Triangle geometry feeding a bottom-level acceleration structure build.
#[derive(Debug, Clone)]
pub struct BlasGeometry {
    /// Vertex position buffer.
    pub vertex_buffer: Handle<Buffer>,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Distance in bytes between vertex positions.
    pub vertex_stride: u32,
    /// Optional index buffer (u32 indices).
    pub index_buffer: Option<Handle<Buffer>>,
    /// Number of indices (0 for non-indexed geometry).
    pub index_count: u32,
}

/// A bottom-level acceleration structure record.
#[derive(Debug, Clone)]
pub struct BottomLevelAs {
    /// Geometries baked into this structure.
    pub geometries: Vec<BlasGeometry>,
}

/// One instance of a BLAS within a top-level acceleration structure.
#[derive(Debug, Clone)]
pub struct TlasInstance {
    /// The referenced bottom-level structure.
    pub blas: Handle<BottomLevelAs>,
    /// World transform of the instance.
    pub transform: Mat4,
    /// Application-defined instance id visible to shaders.
    pub instance_id: u32,
    /// Visibility mask for ray culling.
    pub mask: u8,
}

/// A top-level acceleration structure record.
#[derive(Debug, Clone)]
pub struct TopLevelAs {
    /// Instances in this structure.
    pub instances: Vec<TlasInstance>,
}

/// Shader binding table for a ray tracing state.
#[derive(Debug, Clone, Default)]
pub struct ShaderBindingTable {
    /// Ray generation shader module name.
    pub raygen: String,
    /// Miss shader module names.
    pub miss: Vec<String>,
    /// Closest-hit shader module names.
    pub closest_hit: Vec<String>,
}

/// Descriptor for creating a ray tracing state.
#[derive(Debug, Clone)]
pub struct RayTracingStateDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Shader binding table.
    pub shader_binding_table: ShaderBindingTable,
    /// Binding sets, in set-index order.
    pub binding_sets: Vec<Handle<BindingSet>>,
    /// Maximum ray recursion depth.
    pub max_recursion_depth: u32,
}

/// A ray tracing state resource record.
#[derive(Debug, Clone)]
pub struct RayTracingState {
    /// Creation descriptor.
    pub desc: RayTracingStateDescriptor,
}

// ============================================================================
// Pending immediate-initialization actions
// ============================================================================

/// A pending buffer initialization: byte contents to upload before the
/// buffer is first read. The data is an owned copy, decoupled from whatever
/// caller-owned memory it came from.
#[derive(Debug, Clone)]
pub struct BufferUpload {
    /// Target buffer.
    pub buffer: Handle<Buffer>,
    /// Bytes to copy into the buffer at offset 0.
    pub data: Vec<u8>,
}

/// Where a pending texture initialization gets its pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    /// Decode pixels from a file (the header was already probed at
    /// construct time; the decode happens when the upload is applied).
    File {
        /// Source image path.
        path: PathBuf,
        /// Whether to generate the full mip chain after upload.
        generate_mipmaps: bool,
    },
    /// A single RGBA8 pixel, replicated as a 1x1 texture.
    Pixel {
        /// The pixel value.
        rgba: [u8; 4],
    },
}

/// A pending texture initialization to apply before first read.
#[derive(Debug, Clone)]
pub struct TextureUpload {
    /// Target texture.
    pub texture: Handle<Texture>,
    /// Pixel source.
    pub source: TextureSource,
}
