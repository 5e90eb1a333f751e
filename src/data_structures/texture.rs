//! Textures with deferred, load-when-ready uploads.
//!
//! A [`Texture`] starts life as a 1x1 neutral placeholder so materials can
//! bind before any image data exists. When the asset loader resolves the
//! backing image, [`set_image`](Texture::set_image) stores the pixels and
//! raises the `needs_update` flag; the render loop observes the flag via
//! [`commit`](Texture::commit), which (re)uploads to the GPU and clears it.
//! A slot whose fetch fails simply keeps its placeholder.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use image::RgbaImage;

/// Texture coordinate wrapping outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

impl WrapMode {
    pub(crate) fn address_mode(self) -> wgpu::AddressMode {
        match self {
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// Sampling configuration: wrap mode, UV repeat factor and color-space tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    pub wrap: WrapMode,
    pub repeat: [f32; 2],
    /// True for color data (sampled as sRGB), false for linear data such as
    /// normal, height and the scalar maps.
    pub srgb: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            wrap: WrapMode::Repeat,
            repeat: [1.0, 1.0],
            srgb: false,
        }
    }
}

/// Uploaded GPU state for a texture.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

/// A 2D image resource plus sampling configuration.
///
/// Lives behind a [`TextureHandle`] so the loader task can store pixels
/// while the material keeps a shared reference. Pixels are written exactly
/// once per load; the texture is never destroyed during a session.
#[derive(Debug)]
pub struct Texture {
    label: String,
    pub sampling: SamplerConfig,
    image: Option<RgbaImage>,
    needs_update: bool,
    placeholder: [u8; 4],
    gpu: Option<GpuTexture>,
}

/// Shared reference to a texture. The loader resolves images on another
/// task while the event-loop thread commits and samples.
pub type TextureHandle = Arc<Mutex<Texture>>;

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create an empty texture; it renders as `placeholder` until an image
    /// arrives.
    pub fn new(label: &str, sampling: SamplerConfig, placeholder: [u8; 4]) -> Self {
        Self {
            label: label.to_owned(),
            sampling,
            image: None,
            needs_update: false,
            placeholder,
            gpu: None,
        }
    }

    /// The manual load path: decode image bytes eagerly instead of going
    /// through the batch loader.
    pub fn from_bytes(label: &str, sampling: SamplerConfig, bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let mut texture = Self::new(label, sampling, [255; 4]);
        texture.set_image(img);
        Ok(texture)
    }

    pub fn into_handle(self) -> TextureHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Attach the decoded backing image and flag the pixels for re-upload.
    pub fn set_image(&mut self, image: RgbaImage) {
        self.image = Some(image);
        self.needs_update = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn gpu(&self) -> Option<&GpuTexture> {
        self.gpu.as_ref()
    }

    /// Upload pending pixels. Returns true when the texture view changed
    /// (first upload or re-upload), in which case bind groups referencing
    /// this texture must be rebuilt.
    pub fn commit(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        if self.gpu.is_some() && !self.needs_update {
            return false;
        }

        let placeholder_image;
        let (pixels, width, height) = match &self.image {
            Some(img) => (img.as_raw().as_slice(), img.width(), img.height()),
            None => {
                placeholder_image = self.placeholder;
                (&placeholder_image[..], 1, 1)
            }
        };

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let format = if self.sampling.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&self.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.gpu = Some(GpuTexture {
            texture,
            view,
            sampler: None,
        });
        self.needs_update = false;
        true
    }

    /// Depth buffer for the render pass; recreated on every resize.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> GpuTexture {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        }));

        GpuTexture {
            texture,
            view,
            sampler,
        }
    }
}

pub fn create_sampler(device: &wgpu::Device, config: &SamplerConfig) -> wgpu::Sampler {
    let address_mode = config.wrap.address_mode();
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_image_raises_needs_update_once() {
        let mut texture = Texture::new("color", SamplerConfig::default(), [255; 4]);
        assert!(!texture.needs_update());
        assert!(!texture.is_loaded());
        texture.set_image(RgbaImage::new(4, 4));
        assert!(texture.needs_update());
        assert!(texture.is_loaded());
    }

    #[test]
    fn from_bytes_decodes_and_flags_eagerly() {
        let mut png = Vec::new();
        let img = image::DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let texture = Texture::from_bytes("manual", SamplerConfig::default(), &png).unwrap();
        assert!(texture.is_loaded());
        assert!(texture.needs_update());
    }

    #[test]
    fn garbage_bytes_are_an_error() {
        assert!(Texture::from_bytes("bad", SamplerConfig::default(), &[0, 1, 2, 3]).is_err());
    }
}
