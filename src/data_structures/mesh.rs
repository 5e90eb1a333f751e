//! Mesh: geometry bound to a material, plus its rotation state.

use cgmath::{Matrix4, Rad};
use wgpu::util::DeviceExt;

use crate::data_structures::{geometry::BoxGeometry, material::Material};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    model: [[f32; 4]; 4],
}

/// GPU buffers for a mesh: vertices, indices and the model-matrix uniform.
#[derive(Debug)]
pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub model_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// A shape description paired with a material. The render loop drives the
/// rotation; everything else is fixed after construction.
#[derive(Debug)]
pub struct Mesh {
    pub geometry: BoxGeometry,
    pub material: Material,
    rotation: (f32, f32),
    gpu: Option<MeshBuffers>,
}

impl Mesh {
    pub fn new(geometry: BoxGeometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            rotation: (0.0, 0.0),
            gpu: None,
        }
    }

    /// Rotation about the x and y axes in radians.
    pub fn rotation(&self) -> (f32, f32) {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: (f32, f32)) {
        self.rotation = rotation;
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_angle_y(Rad(self.rotation.1)) * Matrix4::from_angle_x(Rad(self.rotation.0))
    }

    pub fn buffers(&self) -> Option<&MeshBuffers> {
        self.gpu.as_ref()
    }

    /// Create the GPU buffers. Geometry is immutable, so this happens once.
    pub fn upload(&mut self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Box Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Box Index Buffer"),
            contents: bytemuck::cast_slice(&self.geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform = ModelUniform {
            model: self.model_matrix().into(),
        };
        let model_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: model_buffer.as_entire_binding(),
            }],
            label: Some("model_bind_group"),
        });
        self.gpu = Some(MeshBuffers {
            vertex_buffer,
            index_buffer,
            num_elements: self.geometry.indices.len() as u32,
            model_buffer,
            bind_group,
        });
    }

    /// Push the current rotation to the model uniform.
    pub fn write_model(&self, queue: &wgpu::Queue) {
        if let Some(gpu) = &self.gpu {
            let uniform = ModelUniform {
                model: self.model_matrix().into(),
            };
            queue.write_buffer(&gpu.model_buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
    }

    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("model_bind_group_layout"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::material::TextureSlots;
    use crate::data_structures::texture::{SamplerConfig, Texture};
    use cgmath::{SquareMatrix, Transform, Vector3};

    fn slots() -> TextureSlots {
        let make = |label: &str| {
            Texture::new(label, SamplerConfig::default(), [127, 127, 127, 255]).into_handle()
        };
        TextureSlots {
            color: make("color"),
            alpha: make("alpha"),
            height: make("height"),
            normal: make("normal"),
            ambient_occlusion: make("ao"),
            metalness: make("metalness"),
            roughness: make("roughness"),
        }
    }

    #[test]
    fn fresh_mesh_has_identity_model_matrix() {
        let mesh = Mesh::new(
            BoxGeometry::new(1.0, 1.0, 1.0),
            Material::new(slots(), true, 0.1),
        );
        assert_eq!(mesh.model_matrix(), Matrix4::identity());
    }

    #[test]
    fn rotation_state_feeds_the_model_matrix() {
        let mut mesh = Mesh::new(
            BoxGeometry::new(1.0, 1.0, 1.0),
            Material::new(slots(), true, 0.1),
        );
        mesh.set_rotation((0.0, std::f32::consts::FRAC_PI_2));
        assert_eq!(mesh.rotation(), (0.0, std::f32::consts::FRAC_PI_2));
        // A quarter turn about y maps +z onto +x.
        let rotated = mesh
            .model_matrix()
            .transform_vector(Vector3::new(0.0, 0.0, 1.0));
        assert!((rotated.x - 1.0).abs() < 1e-6);
        assert!(rotated.z.abs() < 1e-6);
    }
}
