//! Vertex layout description.

/// Per-attribute data format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats (texcoords).
    Float32x2,
    /// Three 32-bit floats (positions, normals).
    Float32x3,
    /// Four 32-bit floats (tangents, colors).
    Float32x4,
    /// One 32-bit unsigned integer.
    Uint32,
}

impl VertexFormat {
    /// Size of one attribute in bytes.
    pub fn size(&self) -> u32 {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
            Self::Uint32 => 4,
        }
    }
}

/// A single vertex attribute within a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    /// Attribute data format.
    pub format: VertexFormat,
    /// Byte offset within the vertex.
    pub offset: u32,
}

/// Vertex buffer layout: stride plus attribute list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayout {
    /// Distance in bytes between consecutive vertices.
    pub stride: u32,
    /// Attributes in this layout.
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Build a tightly packed layout from a format list, assigning
    /// sequential locations and accumulating offsets.
    pub fn packed(formats: &[VertexFormat]) -> Self {
        let mut attributes = Vec::with_capacity(formats.len());
        let mut offset = 0;
        for (location, &format) in formats.iter().enumerate() {
            attributes.push(VertexAttribute {
                location: location as u32,
                format,
                offset,
            });
            offset += format.size();
        }
        Self {
            stride: offset,
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_layout() {
        let layout = VertexLayout::packed(&[
            VertexFormat::Float32x3,
            VertexFormat::Float32x3,
            VertexFormat::Float32x2,
        ]);

        assert_eq!(layout.stride, 32);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].offset, 24);
        assert_eq!(layout.attributes[2].location, 2);
    }
}
