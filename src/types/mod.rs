//! Plain vocabulary types shared across the rendering core.
//!
//! Everything here is pure description: formats, usage flags, extents,
//! viewport/clear/blend/raster configuration, and vertex layouts. The
//! handle-bearing resource records live in [`crate::registry`].

mod buffer;
mod common;
mod texture;
mod vertex;

pub use buffer::{BufferDescriptor, BufferUsage, MemoryHint};
pub use common::{BlendMode, ClearValue, CullMode, Extent2d, RasterState, Viewport};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
pub use vertex::{VertexAttribute, VertexFormat, VertexLayout};
