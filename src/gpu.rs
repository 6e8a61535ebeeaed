//! Graphics-context boundary: texture upload, release, and context liveness.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::error::GpuError;
use crate::events::RawImage;

/// A GPU resource that can be freed exactly once. Repeated calls are no-ops.
pub trait Releasable {
    fn release(&mut self) -> Result<(), GpuError>;
    fn is_released(&self) -> bool;
}

/// The single-threaded owner of all GPU resources.
pub trait GraphicsContext {
    type Texture: Releasable;

    /// `false` once the device is gone; nothing may be created or released then.
    fn is_available(&self) -> bool;

    fn upload(&self, image: &RawImage) -> Result<Self::Texture, GpuError>;
}

/// Pixel layout of every texture we upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
}

/// A resident texture plus where it came from.
#[derive(Debug)]
pub struct ImageHandle<T> {
    texture: T,
    path: PathBuf,
    width: u32,
    height: u32,
}

impl<T> ImageHandle<T> {
    pub const FORMAT: PixelFormat = PixelFormat::Rgba8;

    pub fn new(path: PathBuf, width: u32, height: u32, texture: T) -> Self {
        Self {
            texture,
            path,
            width,
            height,
        }
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl<T: Releasable> Releasable for ImageHandle<T> {
    fn release(&mut self) -> Result<(), GpuError> {
        self.texture.release()
    }

    fn is_released(&self) -> bool {
        self.texture.is_released()
    }
}

/// Upload `image` and wrap the texture in a handle for `path`.
pub fn upload_handle<G: GraphicsContext>(
    ctx: &G,
    path: &Path,
    image: &RawImage,
) -> Result<ImageHandle<G::Texture>, GpuError> {
    if !ctx.is_available() {
        return Err(GpuError::ContextUnavailable);
    }
    let texture = ctx.upload(image)?;
    Ok(ImageHandle::new(
        path.to_path_buf(),
        image.width,
        image.height,
        texture,
    ))
}

/// Release `handle` on `ctx`, then drop it.
///
/// Release failures are logged and the handle is dropped anyway. With the
/// context gone the release is skipped entirely.
pub fn dispose<G: GraphicsContext>(ctx: &G, mut handle: ImageHandle<G::Texture>) {
    if !ctx.is_available() {
        debug!(path = %handle.path().display(), "context unavailable; skipping texture release");
        return;
    }
    if let Err(err) = handle.release() {
        warn!(path = %handle.path().display(), "texture release failed: {err}");
    }
}

/// Reject images the device cannot hold as a single RGBA8 2D texture.
fn check_upload(image: &RawImage, max_dimension: u32) -> Result<(), GpuError> {
    let (w, h) = (image.width, image.height);
    if w == 0 || h == 0 {
        return Err(GpuError::Upload("zero-sized image".into()));
    }
    if w > max_dimension || h > max_dimension {
        return Err(GpuError::Upload(format!(
            "{w}x{h} exceeds the device texture limit of {max_dimension}"
        )));
    }
    let expected = (w as usize) * (h as usize) * 4;
    if image.pixels.len() != expected {
        return Err(GpuError::Upload(format!(
            "expected {expected} bytes for {w}x{h} RGBA8, got {}",
            image.pixels.len()
        )));
    }
    Ok(())
}

/// Headless `wgpu` device used for texture residency.
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    alive: Arc<AtomicBool>,
}

impl WgpuContext {
    pub fn headless() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;
        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("picview-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to acquire GPU device")?;
        info!(adapter = ?adapter.get_info().name, "gpu context ready");
        Ok(Self::from_parts(device, queue))
    }

    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        device.set_device_lost_callback(move |reason, message| {
            warn!(?reason, "gpu device lost: {message}");
            flag.store(false, Ordering::Release);
        });
        Self {
            device,
            queue,
            alive,
        }
    }

    /// Treat the device as gone, e.g. when the window is closing.
    pub fn mark_lost(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }
}

impl GraphicsContext for WgpuContext {
    type Texture = WgpuTexture;

    fn is_available(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn upload(&self, image: &RawImage) -> Result<WgpuTexture, GpuError> {
        check_upload(image, self.device.limits().max_texture_dimension_2d)?;
        let (w, h) = (image.width, image.height);
        let size = wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("photo"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            texture.as_image_copy(),
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(WgpuTexture {
            texture,
            view,
            released: false,
        })
    }
}

pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    released: bool,
}

impl WgpuTexture {
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

impl std::fmt::Debug for WgpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuTexture")
            .field("size", &self.texture.size())
            .field("released", &self.released)
            .finish()
    }
}

impl Releasable for WgpuTexture {
    fn release(&mut self) -> Result<(), GpuError> {
        if !self.released {
            self.texture.destroy();
            self.released = true;
        }
        Ok(())
    }

    fn is_released(&self) -> bool {
        self.released
    }
}
