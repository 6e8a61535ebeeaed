//! Bounded LRU of full-size textures, keyed by source path.
//!
//! The cache holds an `Rc` to the graphics context, so it cannot leave the
//! thread that owns the context.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use lru::LruCache;
use tracing::{debug, info, warn};

use crate::config::SharpenOptions;
use crate::error::{DecodeError, Error};
use crate::events::RawImage;
use crate::gpu::{GraphicsContext, ImageHandle, dispose, upload_handle};
use crate::processing::decode::{Constraints, Decode};

pub struct TextureCache<G: GraphicsContext> {
    ctx: Rc<G>,
    decoder: Arc<dyn Decode>,
    entries: LruCache<PathBuf, ImageHandle<G::Texture>>,
    capacity: NonZeroUsize,
    target: (u32, u32),
    sharpen: Option<SharpenOptions>,
}

impl<G: GraphicsContext> TextureCache<G> {
    pub fn new(
        ctx: Rc<G>,
        decoder: Arc<dyn Decode>,
        capacity: NonZeroUsize,
        target: (u32, u32),
        sharpen: Option<SharpenOptions>,
    ) -> Self {
        Self {
            ctx,
            decoder,
            entries: LruCache::unbounded(),
            capacity,
            target,
            sharpen,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains(path)
    }

    /// Look at a resident handle without touching recency.
    pub fn peek(&self, path: &Path) -> Option<&ImageHandle<G::Texture>> {
        self.entries.peek(path)
    }

    /// Paths from most to least recently used.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(p, _)| p.as_path())
    }

    /// Window size new decodes are fitted into. Resident entries keep
    /// the size they were decoded at.
    pub fn set_target_size(&mut self, width: u32, height: u32) {
        self.target = (width.max(1), height.max(1));
    }

    /// Return the texture for `path`, decoding and uploading it on a miss.
    ///
    /// A hit only refreshes recency. A miss loads first and then evicts down
    /// to `capacity - 1` entries, so the cache never holds more than
    /// `capacity` and a failed load leaves the resident set untouched.
    pub fn acquire(&mut self, path: &Path) -> Result<&ImageHandle<G::Texture>, Error> {
        let mut fresh = None;
        if self.entries.contains(path) {
            debug!(path = %path.display(), "texture cache hit");
        } else {
            let handle =
                load_handle(&*self.ctx, &*self.decoder, self.target, self.sharpen, path)?;
            self.make_room();
            debug!(
                path = %path.display(),
                width = handle.width(),
                height = handle.height(),
                "texture cache insert"
            );
            fresh = Some(handle);
        }
        // Promotes a hit to most recently used. A hit never reaches the loader.
        let Self {
            ctx,
            decoder,
            entries,
            target,
            sharpen,
            ..
        } = self;
        entries.try_get_or_insert(path.to_path_buf(), || match fresh {
            Some(handle) => Ok(handle),
            None => load_handle(&**ctx, &**decoder, *target, *sharpen, path),
        })
    }

    // Evict least recently used entries until one more fits.
    fn make_room(&mut self) {
        while self.entries.len() >= self.capacity.get() {
            let Some((path, handle)) = self.entries.pop_lru() else {
                break;
            };
            debug!(path = %path.display(), "evicting texture");
            dispose(&*self.ctx, handle);
        }
    }

    /// Release every resident texture.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        while let Some((_, handle)) = self.entries.pop_lru() {
            dispose(&*self.ctx, handle);
        }
        if count > 0 {
            info!(released = count, "texture cache cleared");
        }
    }
}

fn load_handle<G: GraphicsContext>(
    ctx: &G,
    decoder: &dyn Decode,
    target: (u32, u32),
    sharpen: Option<SharpenOptions>,
    path: &Path,
) -> Result<ImageHandle<G::Texture>, Error> {
    let fit = Constraints::Fit {
        width: target.0,
        height: target.1,
        sharpen,
    };
    let image = load(decoder, path, &fit)?;
    Ok(upload_handle(ctx, path, &image)?)
}

// Decode fitted to the window; on failure retry without resample or sharpen.
fn load(decoder: &dyn Decode, path: &Path, fit: &Constraints) -> Result<RawImage, DecodeError> {
    match decoder.decode(path, fit) {
        Ok(image) => Ok(image),
        Err(err) => {
            warn!(path = %path.display(), "processed decode failed ({err}); loading unprocessed");
            decoder.decode(path, &Constraints::Original)
        }
    }
}
