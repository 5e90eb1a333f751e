//! Box geometry with per-axis subdivision.
//!
//! Each of the six faces is a grid of (segments + 1)^2 vertices so the
//! height map has real geometry to displace. Tangents and bitangents are
//! axis-aligned per face, which is all the normal map needs on a box.

use std::mem;

/// Vertex layout shared by every pipeline in the crate.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x2,
            2 => Float32x3,
            3 => Float32x3,
            4 => Float32x3,
        ];
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// A box subdivided into a per-axis segment grid.
#[derive(Debug, Clone)]
pub struct BoxGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    segments: [u32; 3],
}

impl BoxGeometry {
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self::with_segments(width, height, depth, [1, 1, 1])
    }

    pub fn with_segments(width: f32, height: f32, depth: f32, segments: [u32; 3]) -> Self {
        let [sx, sy, sz] = segments.map(|s| s.max(1));
        let mut geometry = Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            segments: [sx, sy, sz],
        };

        // (u axis, v axis, w axis, u sign, v sign, u extent, v extent, w offset, grid)
        geometry.build_plane(2, 1, 0, -1.0, -1.0, depth, height, width / 2.0, [sz, sy]); // +x
        geometry.build_plane(2, 1, 0, 1.0, -1.0, depth, height, -width / 2.0, [sz, sy]); // -x
        geometry.build_plane(0, 2, 1, 1.0, 1.0, width, depth, height / 2.0, [sx, sz]); // +y
        geometry.build_plane(0, 2, 1, 1.0, -1.0, width, depth, -height / 2.0, [sx, sz]); // -y
        geometry.build_plane(0, 1, 2, 1.0, -1.0, width, height, depth / 2.0, [sx, sy]); // +z
        geometry.build_plane(0, 1, 2, -1.0, -1.0, width, height, -depth / 2.0, [sx, sy]); // -z

        geometry
    }

    pub fn segments(&self) -> [u32; 3] {
        self.segments
    }

    #[allow(clippy::too_many_arguments)]
    fn build_plane(
        &mut self,
        u: usize,
        v: usize,
        w: usize,
        udir: f32,
        vdir: f32,
        u_extent: f32,
        v_extent: f32,
        w_offset: f32,
        grid: [u32; 2],
    ) {
        let [gx, gy] = grid;
        let base = self.vertices.len() as u32;
        let normal_sign = if w_offset >= 0.0 { 1.0 } else { -1.0 };

        for iy in 0..=gy {
            let fy = iy as f32 / gy as f32;
            for ix in 0..=gx {
                let fx = ix as f32 / gx as f32;

                let mut position = [0.0f32; 3];
                position[u] = (fx - 0.5) * u_extent * udir;
                position[v] = (fy - 0.5) * v_extent * vdir;
                position[w] = w_offset;

                let mut normal = [0.0f32; 3];
                normal[w] = normal_sign;

                let mut tangent = [0.0f32; 3];
                tangent[u] = udir;
                let mut bitangent = [0.0f32; 3];
                bitangent[v] = vdir;

                self.vertices.push(Vertex {
                    position,
                    tex_coords: [fx, 1.0 - fy],
                    normal,
                    tangent,
                    bitangent,
                });
            }
        }

        for iy in 0..gy {
            for ix in 0..gx {
                let a = base + ix + (gx + 1) * iy;
                let b = base + ix + (gx + 1) * (iy + 1);
                let c = base + (ix + 1) + (gx + 1) * (iy + 1);
                let d = base + (ix + 1) + (gx + 1) * iy;
                self.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_counts(segments: [u32; 3]) -> (usize, usize) {
        let [sx, sy, sz] = segments;
        let verts = 2 * ((sz + 1) * (sy + 1) + (sx + 1) * (sz + 1) + (sx + 1) * (sy + 1));
        let quads = 2 * (sz * sy + sx * sz + sx * sy);
        (verts as usize, (quads * 6) as usize)
    }

    #[test]
    fn unit_cube_has_24_vertices_and_36_indices() {
        let geometry = BoxGeometry::new(1.0, 1.0, 1.0);
        assert_eq!(geometry.vertices.len(), 24);
        assert_eq!(geometry.indices.len(), 36);
    }

    #[test]
    fn subdivision_follows_the_per_face_grid() {
        for segments in [[2, 3, 4], [10, 10, 10], [100, 100, 100]] {
            let geometry = BoxGeometry::with_segments(1.0, 1.0, 1.0, segments);
            let (verts, indices) = grid_counts(segments);
            assert_eq!(geometry.vertices.len(), verts);
            assert_eq!(geometry.indices.len(), indices);
        }
    }

    #[test]
    fn normals_are_unit_axis_vectors() {
        let geometry = BoxGeometry::with_segments(1.0, 2.0, 3.0, [2, 2, 2]);
        for vertex in &geometry.vertices {
            let n = vertex.normal;
            let magnitude = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((magnitude - 1.0).abs() < 1e-6);
            assert_eq!(n.iter().filter(|c| c.abs() > 0.0).count(), 1);
        }
    }

    #[test]
    fn uvs_span_the_unit_square() {
        let geometry = BoxGeometry::with_segments(1.0, 1.0, 1.0, [4, 4, 4]);
        let mut min = [f32::MAX; 2];
        let mut max = [f32::MIN; 2];
        for vertex in &geometry.vertices {
            for axis in 0..2 {
                min[axis] = min[axis].min(vertex.tex_coords[axis]);
                max[axis] = max[axis].max(vertex.tex_coords[axis]);
            }
        }
        assert_eq!(min, [0.0, 0.0]);
        assert_eq!(max, [1.0, 1.0]);
    }

    #[test]
    fn indices_stay_in_bounds() {
        let geometry = BoxGeometry::with_segments(1.0, 1.0, 1.0, [5, 3, 2]);
        let count = geometry.vertices.len() as u32;
        assert!(geometry.indices.iter().all(|&i| i < count));
    }

    #[test]
    fn vertices_lie_on_the_box_surface() {
        let geometry = BoxGeometry::with_segments(2.0, 4.0, 6.0, [3, 3, 3]);
        for vertex in &geometry.vertices {
            let [x, y, z] = vertex.position;
            let on_surface = (x.abs() - 1.0).abs() < 1e-6
                || (y.abs() - 2.0).abs() < 1e-6
                || (z.abs() - 3.0).abs() < 1e-6;
            assert!(on_surface, "vertex off surface: {:?}", vertex.position);
        }
    }
}
