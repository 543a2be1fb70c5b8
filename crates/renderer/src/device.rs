//! [`GpuDevice`] implemented on wgpu.
//!
//! Resource calls map directly onto wgpu objects. Draw calls are recorded
//! together with a snapshot of the texture-unit table and replayed into a
//! render pass by [`WgpuDevice::encode`].

use std::collections::HashMap;

use corelib::{
    GeometryId, GpuDevice, GpuError, PixelFormat, TextureId, TextureRole, TextureUpload,
    UNITS_PER_ROLE, Vertex,
};
use image::{RgbaImage, imageops::FilterType};
use wgpu::util::DeviceExt;

/// Texture units exposed to shaders; unit `n` is bound at `@binding(n + 1)`
/// of the material bind group, binding 0 being the shared sampler.
pub const TEXTURE_UNITS: usize = TextureRole::COUNT * UNITS_PER_ROLE as usize;

pub type UnitTable = [Option<TextureId>; TEXTURE_UNITS];

/// Vertex buffer layout matching [`Vertex`]: position, normal, uv.
pub const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: Vertex::STRIDE as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
};

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// One recorded indexed draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCall {
    pub geometry: GeometryId,
    pub index_count: u32,
    pub units: UnitTable,
}

struct GpuGeometry {
    vertex_buf: wgpu::Buffer,
    index_buf: wgpu::Buffer,
}

struct GpuTexture {
    label: String,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    // Level 0 pixels, kept until the mip chain is generated.
    base: Option<RgbaImage>,
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fallback: GpuTexture,

    geometries: HashMap<GeometryId, GpuGeometry>,
    textures: HashMap<TextureId, GpuTexture>,
    bind_groups: HashMap<UnitTable, wgpu::BindGroup>,
    next_id: u32,

    bound: UnitTable,
    draws: Vec<DrawCall>,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }];
        entries.extend((0..TEXTURE_UNITS as u32).map(|unit| wgpu::BindGroupLayoutEntry {
            binding: unit + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &entries,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        let (texture, view) = create_texture_levels(&device, &queue, "Fallback Texture", &white, 1);
        let fallback = GpuTexture {
            label: "Fallback Texture".into(),
            texture,
            view,
            base: None,
        };

        Self {
            device,
            queue,
            texture_layout,
            sampler,
            fallback,
            geometries: HashMap::new(),
            textures: HashMap::new(),
            bind_groups: HashMap::new(),
            next_id: 0,
            bound: [None; TEXTURE_UNITS],
            draws: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Layout of the material bind group (sampler + one view per unit).
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    /// Draw calls recorded since the last call, in submission order.
    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    /// Create the bind groups `draws` need. Must run before [`Self::encode`].
    pub fn prepare(&mut self, draws: &[DrawCall]) {
        for draw in draws {
            if !self.bind_groups.contains_key(&draw.units) {
                let bind_group = self.create_bind_group(&draw.units);
                self.bind_groups.insert(draw.units, bind_group);
            }
        }
    }

    /// Replay recorded draws; the pipeline and group 0 must already be set.
    pub fn encode(&self, pass: &mut wgpu::RenderPass<'_>, draws: &[DrawCall]) {
        for draw in draws {
            let geometry = self.geometries.get(&draw.geometry);
            let bind_group = self.bind_groups.get(&draw.units);
            let (Some(geometry), Some(bind_group)) = (geometry, bind_group) else {
                if let Some(reason) = skip_reason(geometry.is_some(), bind_group.is_some()) {
                    log::warn!("Skipping draw of geometry {:?}: {}", draw.geometry, reason);
                }
                continue;
            };
            if draw.index_count == 0 {
                continue;
            }
            pass.set_bind_group(1, bind_group, &[]);
            pass.set_vertex_buffer(0, geometry.vertex_buf.slice(..));
            pass.set_index_buffer(geometry.index_buf.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }

    fn create_bind_group(&self, units: &UnitTable) -> wgpu::BindGroup {
        let views: Vec<&wgpu::TextureView> = units
            .iter()
            .map(|unit| {
                unit.and_then(|id| self.textures.get(&id))
                    .map_or(&self.fallback.view, |t| &t.view)
            })
            .collect();

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        }];
        entries.extend(views.iter().enumerate().map(|(unit, view)| wgpu::BindGroupEntry {
            binding: unit as u32 + 1,
            resource: wgpu::BindingResource::TextureView(view),
        }));

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material BG"),
            layout: &self.texture_layout,
            entries: &entries,
        })
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Run `f` inside out-of-memory and validation error scopes, so neither
    /// reaches the uncaptured error handler.
    fn scoped<T>(&self, what: &str, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        // Scopes pop innermost first.
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());

        if let Some(err) = oom {
            log::error!("GPU allocation for {} failed: {}", what, err);
            return Err(GpuError::OutOfMemory(what.to_string()));
        }
        if let Some(err) = validation {
            log::error!("GPU rejected {}: {}", what, err);
            return Err(GpuError::InvalidData {
                label: what.to_string(),
                reason: err.to_string(),
            });
        }
        Ok(value)
    }

    fn forget_bind_groups_using(&mut self, texture: TextureId) {
        self.bind_groups
            .retain(|units, _| !units.contains(&Some(texture)));
    }
}

impl GpuDevice for WgpuDevice {
    fn create_geometry(
        &mut self,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<GeometryId, GpuError> {
        let geometry = self.scoped(label, |device| GpuGeometry {
            vertex_buf: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buf: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
        })?;
        let id = GeometryId(self.next_id());
        self.geometries.insert(id, geometry);
        Ok(id)
    }

    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureId, GpuError> {
        check_texture_size(upload, self.device.limits().max_texture_dimension_2d)?;
        let base = to_rgba(upload)?;
        let (texture, view) = self.scoped(upload.label, |device| {
            create_texture_levels(device, &self.queue, upload.label, &base, 1)
        })?;
        let id = TextureId(self.next_id());
        self.textures.insert(
            id,
            GpuTexture {
                label: upload.label.to_string(),
                texture,
                view,
                base: Some(base),
            },
        );
        Ok(id)
    }

    fn generate_mipmaps(&mut self, texture: TextureId) -> Result<(), GpuError> {
        let entry = self
            .textures
            .get_mut(&texture)
            .ok_or(GpuError::UnknownTexture(texture))?;
        let Some(base) = entry.base.take() else {
            return Ok(());
        };
        let label = entry.label.clone();
        let levels = mip_level_count(base.width(), base.height());
        if levels <= 1 {
            return Ok(());
        }

        let (new_texture, view) = self.scoped(&label, |device| {
            create_texture_levels(device, &self.queue, &label, &base, levels)
        })?;
        if let Some(entry) = self.textures.get_mut(&texture) {
            entry.texture.destroy();
            entry.texture = new_texture;
            entry.view = view;
        }
        self.forget_bind_groups_using(texture);
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<(), GpuError> {
        if unit as usize >= TEXTURE_UNITS {
            return Err(GpuError::InvalidTextureUnit {
                unit,
                max: TEXTURE_UNITS as u32 - 1,
            });
        }
        if !self.textures.contains_key(&texture) {
            return Err(GpuError::UnknownTexture(texture));
        }
        self.bound[unit as usize] = Some(texture);
        Ok(())
    }

    fn draw_indexed(&mut self, geometry: GeometryId, index_count: u32) -> Result<(), GpuError> {
        if !self.geometries.contains_key(&geometry) {
            return Err(GpuError::UnknownGeometry(geometry));
        }
        self.draws.push(DrawCall {
            geometry,
            index_count,
            units: self.bound,
        });
        Ok(())
    }

    fn reset_texture_units(&mut self) {
        self.bound = [None; TEXTURE_UNITS];
    }

    fn destroy_geometry(&mut self, geometry: GeometryId) {
        if let Some(g) = self.geometries.remove(&geometry) {
            g.vertex_buf.destroy();
            g.index_buf.destroy();
        }
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if let Some(t) = self.textures.remove(&texture) {
            t.texture.destroy();
        }
        self.forget_bind_groups_using(texture);
    }
}

/// Why a recorded draw cannot be replayed, if it cannot.
fn skip_reason(geometry_live: bool, prepared: bool) -> Option<&'static str> {
    match (geometry_live, prepared) {
        (false, _) => Some("geometry was released"),
        (true, false) => Some("textures were not prepared"),
        (true, true) => None,
    }
}

/// Full mip chain length for a `width` x `height` image.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Reject images the device cannot hold as a single 2D texture.
fn check_texture_size(upload: &TextureUpload<'_>, max_dimension: u32) -> Result<(), GpuError> {
    if upload.width > max_dimension || upload.height > max_dimension {
        return Err(GpuError::InvalidData {
            label: upload.label.to_string(),
            reason: format!(
                "{}x{} exceeds the device limit of {} texels per side",
                upload.width, upload.height, max_dimension
            ),
        });
    }
    Ok(())
}

/// Expand any supported pixel layout to RGBA8. Greyscale is replicated
/// into RGB.
fn to_rgba(upload: &TextureUpload<'_>) -> Result<RgbaImage, GpuError> {
    let invalid = |reason: String| GpuError::InvalidData {
        label: upload.label.to_string(),
        reason,
    };
    let expected = upload.width as usize * upload.height as usize * upload.format.channels() as usize;
    if upload.width == 0 || upload.height == 0 || upload.pixels.len() != expected {
        return Err(invalid(format!(
            "{} bytes for a {}x{} {:?} image",
            upload.pixels.len(),
            upload.width,
            upload.height,
            upload.format
        )));
    }

    let px = upload.pixels;
    let rgba: Vec<u8> = match upload.format {
        PixelFormat::R8 => px.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        PixelFormat::Rg8 => px.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect(),
        PixelFormat::Rgb8 => px.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect(),
        PixelFormat::Rgba8 => px.to_vec(),
    };
    RgbaImage::from_raw(upload.width, upload.height, rgba)
        .ok_or_else(|| invalid("pixel buffer too small".into()))
}

/// Create a texture with `levels` mip levels and fill them, downsampling
/// `base` for every level after the first.
fn create_texture_levels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    base: &RgbaImage,
    levels: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: base.width(),
            height: base.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: levels,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    write_level(queue, &texture, 0, base);
    let mut previous = base.clone();
    for level in 1..levels {
        let width = (base.width() >> level).max(1);
        let height = (base.height() >> level).max(1);
        let mip = image::imageops::resize(&previous, width, height, FilterType::Triangle);
        write_level(queue, &texture, level, &mip);
        previous = mip;
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn write_level(queue: &wgpu::Queue, texture: &wgpu::Texture, level: u32, image: &RgbaImage) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width()),
            rows_per_image: Some(image.height()),
        },
        wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        },
    );
}
