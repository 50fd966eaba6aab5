//! Common types shared across the rendering core.

/// 2D extent for textures and render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    /// Create a new extent.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Viewport configuration for rendering.
///
/// Depth range is `[0, 1]` by convention (D3D/Metal/Vulkan style).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// X coordinate of the viewport's top-left corner.
    pub x: f32,
    /// Y coordinate of the viewport's top-left corner.
    pub y: f32,
    /// Width of the viewport.
    pub width: f32,
    /// Height of the viewport.
    pub height: f32,
    /// Minimum depth value (default: 0.0).
    pub min_depth: f32,
    /// Maximum depth value (default: 1.0).
    pub max_depth: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl Viewport {
    /// Create a full-extent viewport with origin at (0, 0).
    pub fn from_extent(extent: Extent2d) -> Self {
        Self {
            width: extent.width as f32,
            height: extent.height as f32,
            ..Self::default()
        }
    }

    /// Set the depth range.
    ///
    /// `min > max` (reverse-Z) is valid and useful for depth precision.
    pub fn with_depth_range(mut self, min_depth: f32, max_depth: f32) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }
}

/// Clear value for render target attachments.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClearValue {
    /// No clear operation (load previous contents).
    #[default]
    None,
    /// Clear a color attachment with RGBA values.
    Color {
        /// Red component.
        r: f32,
        /// Green component.
        g: f32,
        /// Blue component.
        b: f32,
        /// Alpha component.
        a: f32,
    },
    /// Clear depth and stencil attachments.
    DepthStencil {
        /// Depth clear value.
        depth: f32,
        /// Stencil clear value.
        stencil: u32,
    },
}

impl ClearValue {
    /// Create a color clear value.
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color { r, g, b, a }
    }

    /// Create a depth-only clear value (stencil 0).
    pub fn depth(depth: f32) -> Self {
        Self::DepthStencil { depth, stencil: 0 }
    }
}

/// Fixed-function blend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// No blending, source overwrites destination.
    #[default]
    Opaque,
    /// Standard alpha blending (src.a, 1 - src.a).
    AlphaBlend,
    /// Additive blending.
    Additive,
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// Cull back faces (default).
    #[default]
    Back,
    /// Cull front faces.
    Front,
    /// No culling.
    None,
}

/// Rasterizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RasterState {
    /// Face culling mode.
    pub cull: CullMode,
    /// Render wireframe instead of filled triangles.
    pub wireframe: bool,
    /// Enable depth testing.
    pub depth_test: bool,
    /// Enable depth writes.
    pub depth_write: bool,
}

impl RasterState {
    /// Standard opaque-geometry raster state: back-face culling,
    /// depth test and write enabled.
    pub fn opaque() -> Self {
        Self {
            cull: CullMode::Back,
            wireframe: false,
            depth_test: true,
            depth_write: true,
        }
    }
}
