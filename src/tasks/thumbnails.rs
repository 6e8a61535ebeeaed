//! Page-keyed thumbnail generation.
//!
//! [`ThumbnailPipeline::get_page`] answers immediately: slots whose pixels
//! are already decoded come back ready, the rest come back as placeholders
//! while the worker pool decodes them. [`ThumbnailPipeline::pump`] drains
//! finished decodes on the owning thread and swaps placeholders in place.
//!
//! Every submission captures the current epoch. Invalidation bumps the epoch
//! and cancels the epoch's token, so a completion that arrives late is
//! recognised as stale: its pixels are kept for reuse but no texture is
//! created from it and no page is touched.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::events::{JobResult, PageKey, RawImage, ThumbnailJob};
use crate::gpu::{GraphicsContext, ImageHandle, dispose, upload_handle};
use crate::processing::decode::Decode;
use crate::processing::layout::{GridLayout, Rect};
use crate::tasks::pool::WorkerPool;

/// One cell of a thumbnail page.
#[derive(Debug)]
pub enum DisplaySlot<T> {
    /// Transparent stand-in at the nominal thumbnail size.
    Placeholder { width: u32, height: u32 },
    Ready(Thumbnail<T>),
}

impl<T> DisplaySlot<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn thumbnail(&self) -> Option<&Thumbnail<T>> {
        match self {
            Self::Ready(thumb) => Some(thumb),
            Self::Placeholder { .. } => None,
        }
    }
}

/// A thumbnail texture placed in its grid cell.
#[derive(Debug)]
pub struct Thumbnail<T> {
    pub handle: ImageHandle<T>,
    pub rect: Rect,
}

/// Counters for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub pages: usize,
    pub decoded: usize,
    pub pending: usize,
    pub epoch: u64,
}

pub struct ThumbnailPipeline<G: GraphicsContext> {
    ctx: Rc<G>,
    images: Arc<[PathBuf]>,
    layout: GridLayout,
    bound: (u32, u32),
    pool: WorkerPool,
    results: Receiver<JobResult>,
    pages: HashMap<PageKey, Vec<DisplaySlot<G::Texture>>>,
    // decoded pixels not tied to any page; survives invalidation
    decoded: HashMap<PathBuf, RawImage>,
    // path -> slots waiting on its in-flight decode, current epoch only
    pending: HashMap<PathBuf, Vec<(PageKey, usize)>>,
    epoch: u64,
    cancel: CancellationToken,
}

impl<G: GraphicsContext> ThumbnailPipeline<G> {
    pub fn new(
        ctx: Rc<G>,
        decoder: Arc<dyn Decode>,
        images: Arc<[PathBuf]>,
        layout: GridLayout,
        bound: (u32, u32),
        workers: usize,
    ) -> io::Result<Self> {
        let (tx, results) = crossbeam_channel::unbounded();
        let pool = WorkerPool::spawn(workers, decoder, tx)?;
        Ok(Self {
            ctx,
            images,
            layout,
            bound,
            pool,
            results,
            pages: HashMap::new(),
            decoded: HashMap::new(),
            pending: HashMap::new(),
            epoch: 0,
            cancel: CancellationToken::new(),
        })
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            pages: self.pages.len(),
            decoded: self.decoded.len(),
            pending: self.pending.len(),
            epoch: self.epoch,
        }
    }

    pub fn is_decoded(&self, path: &Path) -> bool {
        self.decoded.contains_key(path)
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    /// The cached page for `key`, if it has been generated this epoch.
    pub fn page(&self, key: &PageKey) -> Option<&[DisplaySlot<G::Texture>]> {
        self.pages.get(key).map(Vec::as_slice)
    }

    /// Slots for `[start, start + page_size)` clipped to the image list.
    ///
    /// Repeated calls with the same key return the same cached slots and
    /// submit nothing new.
    pub fn get_page(
        &mut self,
        start: usize,
        viewport_w: u32,
        viewport_h: u32,
    ) -> &[DisplaySlot<G::Texture>] {
        let key = PageKey::new(start, viewport_w, viewport_h);
        if !self.pages.contains_key(&key) {
            let slots = self.build_page(key);
            self.pages.insert(key, slots);
        }
        self.pages.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    fn build_page(&mut self, key: PageKey) -> Vec<DisplaySlot<G::Texture>> {
        let images = Arc::clone(&self.images);
        let end = key.start.saturating_add(self.layout.page_size()).min(images.len());
        let mut slots = Vec::with_capacity(end.saturating_sub(key.start));
        let mut submitted = 0usize;

        for (pos, path) in images.get(key.start..end).unwrap_or(&[]).iter().enumerate() {
            if let Some(image) = self.decoded.get(path) {
                match self.place(path, image, key, pos) {
                    Some(thumb) => slots.push(DisplaySlot::Ready(thumb)),
                    None => slots.push(self.placeholder()),
                }
                continue;
            }
            if self.enqueue(path, key, pos) {
                submitted += 1;
            }
            slots.push(self.placeholder());
        }

        debug!(
            start = key.start,
            width = key.width,
            height = key.height,
            slots = slots.len(),
            submitted,
            epoch = self.epoch,
            "generated thumbnail page"
        );
        slots
    }

    fn placeholder(&self) -> DisplaySlot<G::Texture> {
        DisplaySlot::Placeholder {
            width: self.bound.0,
            height: self.bound.1,
        }
    }

    // Register (key, pos) as waiting on `path`; submit a job only for the
    // first waiter. Returns whether a job was submitted.
    fn enqueue(&mut self, path: &Path, key: PageKey, pos: usize) -> bool {
        if let Some(waiters) = self.pending.get_mut(path) {
            waiters.push((key, pos));
            return false;
        }
        let job = ThumbnailJob {
            key,
            path: path.to_path_buf(),
            bound: self.bound,
            epoch: self.epoch,
            cancel: self.cancel.clone(),
        };
        if !self.pool.submit(job) {
            debug!(path = %path.display(), "thumbnail pool closed; slot stays a placeholder");
            return false;
        }
        self.pending.insert(path.to_path_buf(), vec![(key, pos)]);
        true
    }

    // Upload and position a thumbnail. Upload failures leave a placeholder.
    fn place(
        &self,
        path: &Path,
        image: &RawImage,
        key: PageKey,
        pos: usize,
    ) -> Option<Thumbnail<G::Texture>> {
        match upload_handle(&*self.ctx, path, image) {
            Ok(handle) => {
                let rect = self
                    .layout
                    .place(pos, image.width, image.height, key.width, key.height);
                Some(Thumbnail { handle, rect })
            }
            Err(err) => {
                debug!(path = %path.display(), "thumbnail upload failed: {err}");
                None
            }
        }
    }

    /// Apply every completion that has arrived. Call once per frame on the
    /// thread that owns the graphics context. Returns slots filled.
    pub fn pump(&mut self) -> usize {
        let mut filled = 0;
        while let Ok(result) = self.results.try_recv() {
            filled += self.apply(result);
        }
        filled
    }

    /// Apply one completion.
    pub fn apply(&mut self, result: JobResult) -> usize {
        let JobResult {
            key,
            path,
            epoch,
            outcome,
        } = result;
        let stale = epoch != self.epoch;

        let image = match outcome {
            Ok(image) => image,
            Err(err) => {
                debug!(path = %path.display(), stale, "thumbnail decode failed: {err}");
                if !stale {
                    self.pending.remove(&path);
                }
                return 0;
            }
        };

        if stale {
            debug!(
                path = %path.display(),
                start = key.start,
                epoch,
                current = self.epoch,
                "discarding stale thumbnail completion"
            );
            self.decoded.insert(path, image);
            return 0;
        }

        let mut filled = 0;
        for (key, pos) in self.pending.remove(&path).unwrap_or_default() {
            if !self.pages.contains_key(&key) {
                continue;
            }
            let Some(thumb) = self.place(&path, &image, key, pos) else {
                continue;
            };
            let slot = self.pages.get_mut(&key).and_then(|slots| slots.get_mut(pos));
            match slot {
                Some(slot) if !slot.is_ready() => {
                    *slot = DisplaySlot::Ready(thumb);
                    filled += 1;
                }
                _ => dispose(&*self.ctx, thumb.handle),
            }
        }
        trace!(path = %path.display(), filled, "thumbnail ready");
        self.decoded.insert(path, image);
        filled
    }

    /// Drop every page: cancel queued jobs, orphan in-flight ones, and
    /// release all thumbnail textures. Decoded pixels are kept.
    pub fn invalidate(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
        let abandoned = self.pending.len();
        self.pending.clear();

        let pages = self.pages.len();
        let mut released = 0usize;
        for (_, slots) in self.pages.drain() {
            for slot in slots {
                if let DisplaySlot::Ready(thumb) = slot {
                    dispose(&*self.ctx, thumb.handle);
                    released += 1;
                }
            }
        }
        debug!(
            epoch = self.epoch,
            pages, abandoned, released, "thumbnail pages invalidated"
        );
    }

    /// Invalidate, forget decoded pixels, and stop the workers.
    pub fn shutdown(&mut self) {
        self.invalidate();
        self.decoded.clear();
        self.pool.shutdown();
        let dropped = self.results.try_iter().count();
        info!(dropped, "thumbnail pipeline shut down");
    }
}
