//! CPU-side mesh representation and the float packings the renderer consumes.

use glam::{Vec2, Vec3};

/// Floats per vertex for position + normal.
pub const BASE_FLOATS: usize = 6;
/// Floats per vertex when tangent and texture coordinates are appended.
pub const TEXTURED_FLOATS: usize = BASE_FLOATS + 5;

/// Vertex in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tangent: [0.0; 3],
            uv,
        }
    }
}

/// Indexed triangle mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both vertex and index lists are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    /// Per-vertex `position, normal[, tangent, uv]`, 6 or 11 floats each.
    pub fn interleaved(&self, textured: bool) -> Vec<f32> {
        let per_vertex = if textured { TEXTURED_FLOATS } else { BASE_FLOATS };
        let mut out = Vec::with_capacity(self.vertices.len() * per_vertex);
        for v in &self.vertices {
            out.extend_from_slice(&v.position);
            out.extend_from_slice(&v.normal);
            if textured {
                out.extend_from_slice(&v.tangent);
                out.extend_from_slice(&v.uv);
            }
        }
        out
    }

    /// All positions first, then all normals: the packing plain objects expect.
    pub fn planar(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.vertices.len() * BASE_FLOATS);
        out.extend(self.vertices.iter().flat_map(|v| v.position));
        out.extend(self.vertices.iter().flat_map(|v| v.normal));
        out
    }

    /// Fill `tangent` from UV gradients, orthogonalized against the normal.
    ///
    /// Triangles with degenerate UVs contribute nothing; vertices left without
    /// a tangent get an arbitrary unit vector perpendicular to their normal.
    pub fn compute_tangents(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(v0), Some(v1), Some(v2)) = (
                self.vertices.get(i0),
                self.vertices.get(i1),
                self.vertices.get(i2),
            ) else {
                log::warn!("Skipping triangle with out-of-range index: {:?}", tri);
                continue;
            };

            let p0 = Vec3::from(v0.position);
            let e1 = Vec3::from(v1.position) - p0;
            let e2 = Vec3::from(v2.position) - p0;
            let uv0 = Vec2::from(v0.uv);
            let d1 = Vec2::from(v1.uv) - uv0;
            let d2 = Vec2::from(v2.uv) - uv0;

            let det = d1.perp_dot(d2);
            if det.abs() < f32::EPSILON {
                continue;
            }
            let t = (e1 * d2.y - e2 * d1.y) / det;
            for i in [i0, i1, i2] {
                accum[i] += t;
            }
        }

        for (v, t) in self.vertices.iter_mut().zip(accum) {
            let n = Vec3::from(v.normal).normalize_or(Vec3::Z);
            let tangent = (t - n * n.dot(t))
                .try_normalize()
                .unwrap_or_else(|| n.any_orthonormal_vector());
            v.tangent = tangent.to_array();
        }
    }
}
