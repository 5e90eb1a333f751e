//! The seven-slot surface material.
//!
//! A [`Material`] bundles shared references to the color, alpha, height,
//! normal, ambient-occlusion, metalness and roughness textures together with
//! the shading flags. It owns no textures; the asset loader fills the slots
//! whenever their images resolve, and [`refresh`](Material::refresh) rebuilds
//! the bind group only when a slot actually committed new pixels.

use wgpu::util::DeviceExt;

use crate::data_structures::texture::{self, TextureHandle};

/// Shader-side material parameters.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialParams {
    repeat: [f32; 2],
    displacement_scale: f32,
    _padding: f32,
}

/// The texture slots, in bind-group order.
#[derive(Debug, Clone)]
pub struct TextureSlots {
    pub color: TextureHandle,
    pub alpha: TextureHandle,
    pub height: TextureHandle,
    pub normal: TextureHandle,
    pub ambient_occlusion: TextureHandle,
    pub metalness: TextureHandle,
    pub roughness: TextureHandle,
}

impl TextureSlots {
    fn as_array(&self) -> [&TextureHandle; 7] {
        [
            &self.color,
            &self.alpha,
            &self.height,
            &self.normal,
            &self.ambient_occlusion,
            &self.metalness,
            &self.roughness,
        ]
    }
}

#[derive(Debug)]
pub struct MaterialBinding {
    pub bind_group: wgpu::BindGroup,
    params_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
}

/// Immutable-after-construction bundle of texture references and shading
/// flags. The referenced textures themselves stay mutable behind their
/// handles (that is the whole point of the deferred-load scheme).
#[derive(Debug)]
pub struct Material {
    pub slots: TextureSlots,
    pub transparent: bool,
    pub displacement_scale: f32,
    params_dirty: bool,
    gpu: Option<MaterialBinding>,
}

impl Material {
    pub fn new(slots: TextureSlots, transparent: bool, displacement_scale: f32) -> Self {
        Self {
            slots,
            transparent,
            displacement_scale,
            params_dirty: false,
            gpu: None,
        }
    }

    pub fn binding(&self) -> Option<&MaterialBinding> {
        self.gpu.as_ref()
    }

    /// Change the displacement scale; the params buffer is rewritten on the
    /// next [`refresh`](Self::refresh).
    pub fn set_displacement_scale(&mut self, value: f32) {
        if (self.displacement_scale - value).abs() > f32::EPSILON {
            self.displacement_scale = value;
            self.params_dirty = true;
        }
    }

    fn params(&self) -> MaterialParams {
        let repeat = self
            .slots
            .color
            .lock()
            .expect("texture mutex poisoned")
            .sampling
            .repeat;
        MaterialParams {
            repeat,
            displacement_scale: self.displacement_scale,
            _padding: 0.0,
        }
    }

    /// Commit any slot with pending pixels and rebuild the bind group when
    /// at least one texture view changed. Returns true when a rebuild
    /// happened, which is exactly when a late-loading texture becomes
    /// visible to the next draw.
    pub fn refresh(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> bool {
        let mut changed = self.gpu.is_none();
        for handle in self.slots.as_array() {
            let mut slot = handle.lock().expect("texture mutex poisoned");
            changed |= slot.commit(device, queue);
        }

        if self.params_dirty {
            if let Some(binding) = &self.gpu {
                queue.write_buffer(
                    &binding.params_buffer,
                    0,
                    bytemuck::cast_slice(&[self.params()]),
                );
            }
            self.params_dirty = false;
        }

        if !changed {
            return false;
        }

        let (params_buffer, sampler) = match self.gpu.take() {
            Some(binding) => (binding.params_buffer, binding.sampler),
            None => {
                let color_sampling = self
                    .slots
                    .color
                    .lock()
                    .expect("texture mutex poisoned")
                    .sampling;
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Material Params Buffer"),
                    contents: bytemuck::cast_slice(&[self.params()]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                (buffer, texture::create_sampler(device, &color_sampling))
            }
        };

        let slots = self.slots.as_array();
        let guards: Vec<_> = slots
            .iter()
            .map(|handle| handle.lock().expect("texture mutex poisoned"))
            .collect();
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ];
        for (i, guard) in guards.iter().enumerate() {
            let gpu = guard
                .gpu()
                .expect("commit guarantees a GPU texture for every slot");
            entries.push(wgpu::BindGroupEntry {
                binding: 2 + i as u32,
                resource: wgpu::BindingResource::TextureView(&gpu.view),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some("material_bind_group"),
        });
        drop(guards);

        self.gpu = Some(MaterialBinding {
            bind_group,
            params_buffer,
            sampler,
        });
        true
    }
}

/// Layout for the material bind group: params uniform, shared sampler and
/// the seven texture slots. The height map is visible to the vertex stage
/// for displacement.
pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding: u32, visibility: wgpu::ShaderStages| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    let both = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: both,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: both,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            texture_entry(2, wgpu::ShaderStages::FRAGMENT), // color
            texture_entry(3, wgpu::ShaderStages::FRAGMENT), // alpha
            texture_entry(4, both),                         // height, displaces vertices
            texture_entry(5, wgpu::ShaderStages::FRAGMENT), // normal
            texture_entry(6, wgpu::ShaderStages::FRAGMENT), // ambient occlusion
            texture_entry(7, wgpu::ShaderStages::FRAGMENT), // metalness
            texture_entry(8, wgpu::ShaderStages::FRAGMENT), // roughness
        ],
        label: Some("material_bind_group_layout"),
    })
}
