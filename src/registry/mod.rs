//! Per-construction-pass resource registry.
//!
//! A [`Registry`] is created fresh for every construction pass (the static
//! startup pass, and every graph reconstruction). During a pass it serves
//! three roles:
//!
//! - **Factory**: `create_*` methods capture resource descriptions into
//!   capacity-bounded arenas and return stable [`Handle`]s. The ceilings are
//!   deliberate: they keep backend descriptor-pool and memory-pool sizing
//!   static per frame, so exhaustion is an error, never a silent grow.
//! - **Directory**: nodes [`publish`](Registry::publish) resources under
//!   their own name and look up other nodes' publications by qualified name
//!   (`"<node>:<resource>"`). A successful lookup records a dependency edge
//!   `(consumer, producer)`; a miss returns `None` and records nothing, so
//!   each node decides placeholder-vs-fatal on its own.
//! - **Upload queue**: immediate-initialization actions (buffer byte copies,
//!   texture loads) are queued here and drained by the backend exactly once
//!   per construction, not once per frame.
//!
//! The registry is exclusively owned by the construct pass that created it
//! and is not thread-safe; it must only be touched from the frame-driving
//! thread.

mod resources;

pub use resources::{
    Binding, BindingSet, BlasGeometry, BottomLevelAs, Buffer, BufferUpload, ColorAttachment,
    ComputeState, ComputeStateDescriptor, DepthAttachment, RayTracingState,
    RayTracingStateDescriptor, RenderState, RenderStateDescriptor, RenderTarget,
    RenderTargetDescriptor, ShaderBinding, ShaderBindingTable, TargetSize, Texture, TextureSource,
    TextureUpload, TlasInstance, TopLevelAs,
};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::Vec4;
use image::ImageDecoder;

use crate::arena::{Arena, Handle};
use crate::error::RenderError;
use crate::types::{
    BufferDescriptor, BufferUsage, Extent2d, TextureDescriptor, TextureFormat, TextureUsage,
};

/// Name of the implicit scope used outside any node's construct phase
/// (static/startup resources).
pub const STATIC_SCOPE: &str = "static";

/// The resource arenas a registry owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// GPU buffers.
    Buffer,
    /// GPU textures.
    Texture,
    /// Render targets.
    RenderTarget,
    /// Shader binding sets.
    BindingSet,
    /// Graphics render states.
    RenderState,
    /// Bottom-level acceleration structures.
    BottomLevelAs,
    /// Top-level acceleration structures.
    TopLevelAs,
    /// Ray tracing states.
    RayTracingState,
    /// Compute states.
    ComputeState,
}

/// Per-arena capacity ceilings.
///
/// The defaults are sized for a mid-size graph; applications with heavier
/// resource counts raise the relevant ceiling explicitly rather than the
/// registry growing unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Buffer arena ceiling.
    pub buffers: usize,
    /// Texture arena ceiling.
    pub textures: usize,
    /// Render target arena ceiling.
    pub render_targets: usize,
    /// Binding set arena ceiling.
    pub binding_sets: usize,
    /// Render state arena ceiling.
    pub render_states: usize,
    /// BLAS arena ceiling.
    pub bottom_level_as: usize,
    /// TLAS arena ceiling.
    pub top_level_as: usize,
    /// Ray tracing state arena ceiling.
    pub ray_tracing_states: usize,
    /// Compute state arena ceiling.
    pub compute_states: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            buffers: 256,
            textures: 256,
            render_targets: 32,
            binding_sets: 128,
            render_states: 64,
            bottom_level_as: 128,
            top_level_as: 8,
            ray_tracing_states: 8,
            compute_states: 32,
        }
    }
}

impl RegistryLimits {
    /// The ceiling for one arena kind.
    pub fn capacity(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Buffer => self.buffers,
            ResourceKind::Texture => self.textures,
            ResourceKind::RenderTarget => self.render_targets,
            ResourceKind::BindingSet => self.binding_sets,
            ResourceKind::RenderState => self.render_states,
            ResourceKind::BottomLevelAs => self.bottom_level_as,
            ResourceKind::TopLevelAs => self.top_level_as,
            ResourceKind::RayTracingState => self.ray_tracing_states,
            ResourceKind::ComputeState => self.compute_states,
        }
    }

    /// Set the buffer arena ceiling.
    pub fn with_buffers(mut self, ceiling: usize) -> Self {
        self.buffers = ceiling;
        self
    }

    /// Set the texture arena ceiling.
    pub fn with_textures(mut self, ceiling: usize) -> Self {
        self.textures = ceiling;
        self
    }
}

/// A resource reference published into the cross-node directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishedResource {
    /// A published buffer.
    Buffer(Handle<Buffer>),
    /// A published texture.
    Texture(Handle<Texture>),
    /// A published render target.
    RenderTarget(Handle<RenderTarget>),
}

impl From<Handle<Buffer>> for PublishedResource {
    fn from(handle: Handle<Buffer>) -> Self {
        Self::Buffer(handle)
    }
}

impl From<Handle<Texture>> for PublishedResource {
    fn from(handle: Handle<Texture>) -> Self {
        Self::Texture(handle)
    }
}

impl From<Handle<RenderTarget>> for PublishedResource {
    fn from(handle: Handle<RenderTarget>) -> Self {
        Self::RenderTarget(handle)
    }
}

/// Resource factory and cross-node directory for one construction pass.
pub struct Registry {
    limits: RegistryLimits,
    current_node: Option<String>,

    buffers: Arena<Buffer>,
    textures: Arena<Texture>,
    render_targets: Arena<RenderTarget>,
    binding_sets: Arena<BindingSet>,
    render_states: Arena<RenderState>,
    bottom_level_as: Arena<BottomLevelAs>,
    top_level_as: Arena<TopLevelAs>,
    ray_tracing_states: Arena<RayTracingState>,
    compute_states: Arena<ComputeState>,

    /// Qualified name -> published resource reference.
    published: HashMap<String, PublishedResource>,
    /// `(consumer, producer)` pairs discovered via lookups.
    dependencies: HashSet<(String, String)>,

    buffer_uploads: Vec<BufferUpload>,
    texture_uploads: Vec<TextureUpload>,
}

impl Registry {
    /// Create a registry for a new construction pass.
    pub fn new(limits: RegistryLimits) -> Self {
        Self {
            limits,
            current_node: None,
            buffers: Arena::new(),
            textures: Arena::new(),
            render_targets: Arena::new(),
            binding_sets: Arena::new(),
            render_states: Arena::new(),
            bottom_level_as: Arena::new(),
            top_level_as: Arena::new(),
            ray_tracing_states: Arena::new(),
            compute_states: Arena::new(),
            published: HashMap::new(),
            dependencies: HashSet::new(),
            buffer_uploads: Vec::new(),
            texture_uploads: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Node scoping
    // ------------------------------------------------------------------

    /// Enter a node's construct scope. Subsequent publishes and resource
    /// diagnostics are attributed to this node until [`finish_node`].
    ///
    /// [`finish_node`]: Registry::finish_node
    pub fn begin_node(&mut self, name: &str) {
        debug_assert!(
            self.current_node.is_none(),
            "begin_node('{name}') while '{}' is still open",
            self.current_node.as_deref().unwrap_or("")
        );
        self.current_node = Some(name.to_string());
    }

    /// Leave the current node's construct scope.
    pub fn finish_node(&mut self) {
        self.current_node = None;
    }

    /// The name publishes are currently attributed to.
    pub fn scope(&self) -> &str {
        self.current_node.as_deref().unwrap_or(STATIC_SCOPE)
    }

    fn ensure_capacity(&self, len: usize, kind: ResourceKind) -> Result<(), RenderError> {
        let capacity = self.limits.capacity(kind);
        if len >= capacity {
            Err(RenderError::ArenaFull {
                kind,
                capacity,
                node: self.scope().to_string(),
            })
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    /// Create a buffer from a descriptor.
    pub fn create_buffer(&mut self, desc: BufferDescriptor) -> Result<Handle<Buffer>, RenderError> {
        self.ensure_capacity(self.buffers.len(), ResourceKind::Buffer)?;
        log::trace!(
            "[{}] create_buffer {:?} ({} bytes)",
            self.scope(),
            desc.label,
            desc.size
        );
        Ok(self.buffers.add(Buffer { desc }))
    }

    /// Create a buffer initialized from raw bytes.
    ///
    /// The bytes are copied into the registry's upload queue, so the caller
    /// keeps ownership of its own memory. The upload is applied by the
    /// backend before the buffer is first read.
    pub fn create_buffer_with_data(
        &mut self,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Handle<Buffer>, RenderError> {
        let desc = BufferDescriptor::new(data.len() as u64, usage | BufferUsage::COPY_DST);
        let buffer = self.create_buffer(desc)?;
        self.buffer_uploads.push(BufferUpload {
            buffer,
            data: data.to_vec(),
        });
        Ok(buffer)
    }

    /// Create a uniform buffer initialized from a plain-old-data value
    /// (a camera matrix, a light block).
    pub fn create_uniform_buffer<T: bytemuck::Pod>(
        &mut self,
        value: &T,
    ) -> Result<Handle<Buffer>, RenderError> {
        self.create_buffer_with_data(bytemuck::bytes_of(value), BufferUsage::UNIFORM)
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    /// Create an uninitialized 2D texture.
    pub fn create_texture_2d(
        &mut self,
        extent: Extent2d,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Result<Handle<Texture>, RenderError> {
        self.ensure_capacity(self.textures.len(), ResourceKind::Texture)?;
        log::trace!(
            "[{}] create_texture_2d {}x{} {:?}",
            self.scope(),
            extent.width,
            extent.height,
            format
        );
        Ok(self.textures.add(Texture {
            desc: TextureDescriptor::new_2d(extent, format, usage),
        }))
    }

    /// Create a 2D texture from an image file.
    ///
    /// Only the image header is probed here (dimensions and channel count),
    /// so render-state and binding-set layouts can be fixed before pixel
    /// data is available; the pixel decode and upload are deferred to a
    /// queued [`TextureUpload`] consumed later by the backend.
    ///
    /// Three-channel sources are widened to RGBA: 3-channel formats are not
    /// guaranteed supported on all targets. Any channel count other than 3
    /// or 4 is an error.
    pub fn load_texture_2d(
        &mut self,
        path: impl AsRef<Path>,
        srgb: bool,
        generate_mipmaps: bool,
    ) -> Result<Handle<Texture>, RenderError> {
        let path = path.as_ref();
        self.ensure_capacity(self.textures.len(), ResourceKind::Texture)?;

        let decoder = image::ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| {
                RenderError::ResourceCreationFailed(format!(
                    "failed to open '{}': {e}",
                    path.display()
                ))
            })?
            .into_decoder()
            .map_err(|e| {
                RenderError::ResourceCreationFailed(format!(
                    "failed to probe '{}': {e}",
                    path.display()
                ))
            })?;

        let (width, height) = decoder.dimensions();
        let channels = decoder.color_type().channel_count();
        let format = match channels {
            // 3-channel sources are widened to RGBA on upload.
            3 | 4 if srgb => TextureFormat::Rgba8UnormSrgb,
            3 | 4 => TextureFormat::Rgba8Unorm,
            _ => {
                return Err(RenderError::UnsupportedChannelCount {
                    channels,
                    path: path.display().to_string(),
                })
            }
        };

        let extent = Extent2d::new(width, height);
        let mut desc =
            TextureDescriptor::new_2d(extent, format, TextureUsage::SAMPLED | TextureUsage::COPY_DST)
                .with_label(path.display().to_string());
        if generate_mipmaps {
            desc = desc.with_mip_levels(TextureDescriptor::full_mip_chain(extent));
        }

        log::trace!(
            "[{}] load_texture_2d '{}' {}x{} {}ch -> {:?}",
            self.scope(),
            path.display(),
            width,
            height,
            channels,
            format
        );

        let texture = self.textures.add(Texture { desc });
        self.texture_uploads.push(TextureUpload {
            texture,
            source: TextureSource::File {
                path: path.to_path_buf(),
                generate_mipmaps,
            },
        });
        Ok(texture)
    }

    /// Create a 1x1 single-pixel texture.
    ///
    /// Used as a placeholder for missing material maps so every binding-set
    /// slot has a valid texture even when content is absent, avoiding
    /// conditional branching in shader binding logic.
    pub fn create_pixel_texture(
        &mut self,
        pixel: Vec4,
        srgb: bool,
    ) -> Result<Handle<Texture>, RenderError> {
        self.ensure_capacity(self.textures.len(), ResourceKind::Texture)?;

        let format = if srgb {
            TextureFormat::Rgba8UnormSrgb
        } else {
            TextureFormat::Rgba8Unorm
        };
        let rgba = pixel
            .clamp(Vec4::ZERO, Vec4::ONE)
            .to_array()
            .map(|c| (c * 255.0).round() as u8);

        let texture = self.textures.add(Texture {
            desc: TextureDescriptor::new_2d(
                Extent2d::new(1, 1),
                format,
                TextureUsage::SAMPLED | TextureUsage::COPY_DST,
            ),
        });
        self.texture_uploads.push(TextureUpload {
            texture,
            source: TextureSource::Pixel { rgba },
        });
        Ok(texture)
    }

    // ------------------------------------------------------------------
    // Targets, bindings, and pipeline states
    // ------------------------------------------------------------------

    /// Create a render target.
    pub fn create_render_target(
        &mut self,
        desc: RenderTargetDescriptor,
    ) -> Result<Handle<RenderTarget>, RenderError> {
        self.ensure_capacity(self.render_targets.len(), ResourceKind::RenderTarget)?;
        Ok(self.render_targets.add(RenderTarget { desc }))
    }

    /// Create a binding set from shader bindings.
    pub fn create_binding_set(
        &mut self,
        bindings: Vec<ShaderBinding>,
    ) -> Result<Handle<BindingSet>, RenderError> {
        self.ensure_capacity(self.binding_sets.len(), ResourceKind::BindingSet)?;
        Ok(self.binding_sets.add(BindingSet { bindings }))
    }

    /// Create a graphics render state.
    pub fn create_render_state(
        &mut self,
        desc: RenderStateDescriptor,
    ) -> Result<Handle<RenderState>, RenderError> {
        self.ensure_capacity(self.render_states.len(), ResourceKind::RenderState)?;
        Ok(self.render_states.add(RenderState { desc }))
    }

    /// Create a compute state.
    pub fn create_compute_state(
        &mut self,
        desc: ComputeStateDescriptor,
    ) -> Result<Handle<ComputeState>, RenderError> {
        self.ensure_capacity(self.compute_states.len(), ResourceKind::ComputeState)?;
        Ok(self.compute_states.add(ComputeState { desc }))
    }

    /// Create a bottom-level acceleration structure over triangle geometry.
    pub fn create_bottom_level_as(
        &mut self,
        geometries: Vec<BlasGeometry>,
    ) -> Result<Handle<BottomLevelAs>, RenderError> {
        self.ensure_capacity(self.bottom_level_as.len(), ResourceKind::BottomLevelAs)?;
        Ok(self.bottom_level_as.add(BottomLevelAs { geometries }))
    }

    /// Create a top-level acceleration structure over BLAS instances.
    pub fn create_top_level_as(
        &mut self,
        instances: Vec<TlasInstance>,
    ) -> Result<Handle<TopLevelAs>, RenderError> {
        self.ensure_capacity(self.top_level_as.len(), ResourceKind::TopLevelAs)?;
        Ok(self.top_level_as.add(TopLevelAs { instances }))
    }

    /// Create a ray tracing state.
    pub fn create_ray_tracing_state(
        &mut self,
        desc: RayTracingStateDescriptor,
    ) -> Result<Handle<RayTracingState>, RenderError> {
        self.ensure_capacity(self.ray_tracing_states.len(), ResourceKind::RayTracingState)?;
        Ok(self.ray_tracing_states.add(RayTracingState { desc }))
    }

    // ------------------------------------------------------------------
    // Cross-node directory
    // ------------------------------------------------------------------

    /// Publish a resource under `"<currentNode>:<name>"` for other nodes to
    /// look up.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate publish under the same qualified name within
    /// one registry generation; that is a programmer error, not a runtime
    /// condition.
    pub fn publish(&mut self, name: &str, resource: impl Into<PublishedResource>) {
        let qualified = format!("{}:{name}", self.scope());
        let previous = self.published.insert(qualified.clone(), resource.into());
        assert!(
            previous.is_none(),
            "duplicate publish of '{qualified}' within one registry generation"
        );
        log::trace!("published '{qualified}'");
    }

    fn lookup(&mut self, node: &str, name: &str) -> Option<PublishedResource> {
        let qualified = format!("{node}:{name}");
        let found = self.published.get(&qualified).copied();
        if found.is_some() {
            let consumer = self.scope().to_string();
            if consumer != node {
                self.dependencies.insert((consumer, node.to_string()));
            }
        }
        found
    }

    /// Look up a buffer published by another node.
    ///
    /// Returns `None` if the producer has not published under that name
    /// (first-run ordering, optional nodes); callers must handle the miss
    /// explicitly. A hit records a dependency edge `(consumer, producer)`.
    ///
    /// # Panics
    ///
    /// Panics if the qualified name is published but is not a buffer.
    pub fn get_buffer(&mut self, node: &str, name: &str) -> Option<Handle<Buffer>> {
        self.lookup(node, name).map(|found| match found {
            PublishedResource::Buffer(handle) => handle,
            other => panic!("'{node}:{name}' is published but is not a buffer: {other:?}"),
        })
    }

    /// Look up a texture published by another node. See [`get_buffer`].
    ///
    /// [`get_buffer`]: Registry::get_buffer
    pub fn get_texture(&mut self, node: &str, name: &str) -> Option<Handle<Texture>> {
        self.lookup(node, name).map(|found| match found {
            PublishedResource::Texture(handle) => handle,
            other => panic!("'{node}:{name}' is published but is not a texture: {other:?}"),
        })
    }

    /// Look up a render target published by another node. See [`get_buffer`].
    ///
    /// [`get_buffer`]: Registry::get_buffer
    pub fn get_render_target(&mut self, node: &str, name: &str) -> Option<Handle<RenderTarget>> {
        self.lookup(node, name).map(|found| match found {
            PublishedResource::RenderTarget(handle) => handle,
            other => panic!("'{node}:{name}' is published but is not a render target: {other:?}"),
        })
    }

    /// The `(consumer, producer)` dependency edges recorded so far.
    pub fn dependencies(&self) -> &HashSet<(String, String)> {
        &self.dependencies
    }

    // ------------------------------------------------------------------
    // Pending uploads
    // ------------------------------------------------------------------

    /// Drain the queued buffer initializations.
    ///
    /// The backend applies these once per construction, before the affected
    /// buffers are first read. Re-running construct for the same logical
    /// resource does not re-issue an upload unless the resource itself was
    /// recreated in the new generation.
    pub fn take_buffer_uploads(&mut self) -> Vec<BufferUpload> {
        std::mem::take(&mut self.buffer_uploads)
    }

    /// Drain the queued texture initializations. See
    /// [`take_buffer_uploads`](Registry::take_buffer_uploads).
    pub fn take_texture_uploads(&mut self) -> Vec<TextureUpload> {
        std::mem::take(&mut self.texture_uploads)
    }

    // ------------------------------------------------------------------
    // Backend access
    // ------------------------------------------------------------------

    /// The buffer record for a handle.
    pub fn buffer(&self, handle: Handle<Buffer>) -> &Buffer {
        self.buffers.get(handle)
    }

    /// The texture record for a handle.
    pub fn texture(&self, handle: Handle<Texture>) -> &Texture {
        self.textures.get(handle)
    }

    /// The render target record for a handle.
    pub fn render_target(&self, handle: Handle<RenderTarget>) -> &RenderTarget {
        self.render_targets.get(handle)
    }

    /// The render state record for a handle.
    pub fn render_state(&self, handle: Handle<RenderState>) -> &RenderState {
        self.render_states.get(handle)
    }

    /// The bottom-level acceleration structure record for a handle.
    pub fn bottom_level_as(&self, handle: Handle<BottomLevelAs>) -> &BottomLevelAs {
        self.bottom_level_as.get(handle)
    }

    /// The top-level acceleration structure record for a handle.
    pub fn top_level_as(&self, handle: Handle<TopLevelAs>) -> &TopLevelAs {
        self.top_level_as.get(handle)
    }

    /// The ray tracing state record for a handle.
    pub fn ray_tracing_state(&self, handle: Handle<RayTracingState>) -> &RayTracingState {
        self.ray_tracing_states.get(handle)
    }

    /// All buffers (for batched backend creation).
    pub fn buffers(&self) -> &Arena<Buffer> {
        &self.buffers
    }

    /// All textures (for batched backend creation).
    pub fn textures(&self) -> &Arena<Texture> {
        &self.textures
    }

    /// All render targets (for batched backend creation).
    pub fn render_targets(&self) -> &Arena<RenderTarget> {
        &self.render_targets
    }

    /// The configured limits.
    pub fn limits(&self) -> &RegistryLimits {
        &self.limits
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("scope", &self.scope())
            .field("buffers", &self.buffers.len())
            .field("textures", &self.textures.len())
            .field("published", &self.published.len())
            .field("dependencies", &self.dependencies.len())
            .finish_non_exhaustive()
    }
}
