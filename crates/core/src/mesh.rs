//! Mesh input: typed vertex records and the flat-buffer boundary format

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Model-space position
    pub position: Vec3,
    /// Linear RGB in [0, 1]
    pub color: Vec3,
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, color: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            color,
            normal,
        }
    }
}

/// Triangle mesh: every three consecutive indices form one triangle
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Whole triangles only; a trailing partial triple is ignored
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Decode flat attribute arrays into vertex records
    ///
    /// The vertex count is taken from `positions`. Missing colors default to
    /// white and missing normals to zero; the caller is expected to pass
    /// matched buffers.
    pub fn from_flat(flat: &FlatMesh<'_>) -> Self {
        let vertex_count = flat.positions.len() / 3;
        let vertices = (0..vertex_count)
            .map(|i| {
                Vertex::new(
                    read_vec3(flat.positions, i).unwrap_or(Vec3::ZERO),
                    read_vec3(flat.colors, i).unwrap_or(Vec3::ONE),
                    read_vec3(flat.normals, i).unwrap_or(Vec3::ZERO),
                )
            })
            .collect();

        let whole = flat.indices.len() / 3 * 3;
        Self::new(vertices, flat.indices[..whole].to_vec())
    }
}

fn read_vec3(buffer: &[f32], index: usize) -> Option<Vec3> {
    buffer
        .get(index * 3..index * 3 + 3)
        .map(Vec3::from_slice)
}

/// Mesh as parallel flat arrays: 3 floats per vertex, 3 indices per triangle
#[derive(Debug, Clone, Copy)]
pub struct FlatMesh<'a> {
    pub positions: &'a [f32],
    pub colors: &'a [f32],
    pub indices: &'a [u32],
    pub normals: &'a [f32],
}
