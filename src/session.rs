//! One object per viewing session that owns every cache.
//!
//! Construct it once on the thread that owns the graphics context, hand it
//! to the presentation layer, and call [`ImageCache::pump`] once per frame.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use tracing::info;

use crate::config::Configuration;
use crate::error::Error;
use crate::gpu::{GraphicsContext, ImageHandle};
use crate::processing::decode::Decode;
use crate::processing::layout::GridLayout;
use crate::tasks::thumbnails::{DisplaySlot, PipelineStats, ThumbnailPipeline};
use crate::texture_cache::TextureCache;

/// Resident counts across both caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub full_images: usize,
    pub thumbnails: PipelineStats,
}

pub struct ImageCache<G: GraphicsContext> {
    ctx: Rc<G>,
    images: Arc<[PathBuf]>,
    textures: TextureCache<G>,
    thumbnails: ThumbnailPipeline<G>,
    shut_down: bool,
}

impl<G: GraphicsContext> ImageCache<G> {
    pub fn new(
        cfg: &Configuration,
        ctx: G,
        decoder: Arc<dyn Decode>,
        images: Vec<PathBuf>,
        viewport: (u32, u32),
    ) -> Result<Self, Error> {
        let ctx = Rc::new(ctx);
        let images: Arc<[PathBuf]> = images.into();
        let textures = TextureCache::new(
            Rc::clone(&ctx),
            Arc::clone(&decoder),
            cfg.cache_capacity(),
            viewport,
            cfg.sharpen.active(),
        );
        let thumbnails = ThumbnailPipeline::new(
            Rc::clone(&ctx),
            decoder,
            Arc::clone(&images),
            GridLayout::from(cfg.grid),
            cfg.thumbnail_bound(),
            cfg.thread_pool_size,
        )?;
        info!(
            images = images.len(),
            max_images = cfg.max_images,
            workers = cfg.thread_pool_size,
            "image cache ready"
        );
        Ok(Self {
            ctx,
            images,
            textures,
            thumbnails,
            shut_down: false,
        })
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn context(&self) -> &G {
        &self.ctx
    }

    pub fn layout(&self) -> GridLayout {
        self.thumbnails.layout()
    }

    pub fn textures(&self) -> &TextureCache<G> {
        &self.textures
    }

    pub fn thumbnails(&self) -> &ThumbnailPipeline<G> {
        &self.thumbnails
    }

    /// Size future full-image decodes fit into.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.textures.set_target_size(width, height);
    }

    /// Full-size texture for `path`. Fails with [`Error::ShutDown`] once
    /// [`ImageCache::shutdown`] has run.
    pub fn acquire_full(&mut self, path: &Path) -> Result<&ImageHandle<G::Texture>, Error> {
        if self.shut_down {
            return Err(Error::ShutDown);
        }
        self.textures.acquire(path)
    }

    pub fn get_thumbnail_page(
        &mut self,
        start: usize,
        viewport_w: u32,
        viewport_h: u32,
    ) -> &[DisplaySlot<G::Texture>] {
        self.thumbnails.get_page(start, viewport_w, viewport_h)
    }

    /// Call on resize, page navigation, and leaving the grid.
    pub fn invalidate_thumbnails(&mut self) {
        self.thumbnails.invalidate();
    }

    /// Apply finished thumbnail decodes. Returns slots filled.
    pub fn pump(&mut self) -> usize {
        if self.shut_down {
            return 0;
        }
        self.thumbnails.pump()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            full_images: self.textures.len(),
            thumbnails: self.thumbnails.stats(),
        }
    }

    /// Release everything and stop the workers. Safe to call more than once
    /// and after the graphics context is gone.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.thumbnails.shutdown();
        self.textures.clear();
        info!(context_available = self.ctx.is_available(), "image cache shut down");
    }
}

impl<G: GraphicsContext> Drop for ImageCache<G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
