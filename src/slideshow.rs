//! Presentation state machine: auto-play, manual stepping and the
//! thumbnail grid. It decides what to show and keeps the caches in step;
//! drawing is left to whoever owns the window.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::gpu::GraphicsContext;
use crate::processing::layout::{Rect, center_offset, fit_within};
use crate::session::ImageCache;
use crate::tasks::thumbnails::DisplaySlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    AutoPlay,
    Manual,
    Thumbnails,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    /// Nothing to show (empty library).
    Empty,
    Single { index: usize },
    /// `to` slides in over `from`; `progress` is eased, 0..=1.
    Transition { from: usize, to: usize, progress: f32 },
    Grid { start: usize },
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    from: usize,
    to: usize,
    started: Instant,
}

pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * (2.0 - t)
}

pub struct Slideshow<G: GraphicsContext> {
    cache: ImageCache<G>,
    mode: Mode,
    current: usize,
    page_start: usize,
    viewport: (u32, u32),
    slide_duration: Duration,
    transition_duration: Duration,
    last_advance: Instant,
    transition: Option<Transition>,
}

impl<G: GraphicsContext> Slideshow<G> {
    pub fn new(cache: ImageCache<G>, cfg: &Configuration, viewport: (u32, u32), now: Instant) -> Self {
        let mut show = Self {
            cache,
            mode: Mode::AutoPlay,
            current: 0,
            page_start: 0,
            viewport,
            slide_duration: cfg.slide_duration,
            transition_duration: cfg.transition,
            last_advance: now,
            transition: None,
        };
        show.cache.set_viewport(viewport.0, viewport.1);
        show.load(0);
        show
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn page_start(&self) -> usize {
        self.page_start
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn len(&self) -> usize {
        self.cache.images().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.images().is_empty()
    }

    pub fn cache(&self) -> &ImageCache<G> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ImageCache<G> {
        &mut self.cache
    }

    fn page_size(&self) -> usize {
        self.cache.layout().page_size()
    }

    // Make sure slide `index` is resident. A failed decode leaves a blank
    // frame; the slideshow keeps going.
    fn load(&mut self, index: usize) {
        let Some(path) = self.cache.images().get(index).cloned() else {
            return;
        };
        if let Err(err) = self.cache.acquire_full(&path) {
            warn!(path = %path.display(), "failed to load slide: {err}");
        }
    }

    /// Advance the clock. Returns the new index when auto-play moved on.
    pub fn tick(&mut self, now: Instant) -> Option<usize> {
        if let Some(t) = self.transition
            && now.duration_since(t.started) >= self.transition_duration
        {
            self.transition = None;
        }
        if self.mode != Mode::AutoPlay || self.is_empty() {
            return None;
        }
        if now.duration_since(self.last_advance) < self.slide_duration {
            return None;
        }
        let from = self.current;
        let to = (from + 1) % self.len();
        self.load(to);
        self.current = to;
        self.last_advance = now;
        self.transition = Some(Transition {
            from,
            to,
            started: now,
        });
        debug!(from, to, "auto-play advance");
        Some(to)
    }

    /// Eased progress of the running transition.
    pub fn transition_progress(&self, now: Instant) -> Option<f32> {
        let t = self.transition?;
        if self.transition_duration.is_zero() {
            return Some(1.0);
        }
        let raw = now.duration_since(t.started).as_secs_f32() / self.transition_duration.as_secs_f32();
        Some(ease_out_quad(raw))
    }

    /// Step forward; stops at the last slide.
    pub fn next(&mut self) -> bool {
        if self.mode == Mode::Thumbnails || self.current + 1 >= self.len() {
            return false;
        }
        self.step_to(self.current + 1);
        true
    }

    /// Step back; stops at the first slide.
    pub fn prev(&mut self) -> bool {
        if self.mode == Mode::Thumbnails || self.current == 0 {
            return false;
        }
        self.step_to(self.current - 1);
        true
    }

    fn step_to(&mut self, index: usize) {
        self.transition = None;
        self.mode = Mode::Manual;
        self.current = index;
        self.load(index);
    }

    /// Leave manual mode and resume auto-play from `now`.
    pub fn resume(&mut self, now: Instant) {
        if self.mode == Mode::Manual {
            self.mode = Mode::AutoPlay;
            self.last_advance = now;
        }
    }

    /// Enter the grid at the current slide, or leave it at the page start.
    pub fn toggle_thumbnails(&mut self, now: Instant) {
        if self.mode == Mode::Thumbnails {
            self.exit_thumbnails(now);
        } else {
            self.transition = None;
            self.mode = Mode::Thumbnails;
            self.page_start = self.current;
            info!(page_start = self.page_start, "entered thumbnail mode");
        }
    }

    fn exit_thumbnails(&mut self, now: Instant) {
        self.mode = Mode::AutoPlay;
        self.current = if self.page_start < self.len() {
            self.page_start
        } else {
            0
        };
        self.last_advance = now;
        self.load(self.current);
        self.cache.invalidate_thumbnails();
        info!(current = self.current, "left thumbnail mode");
    }

    /// Previous page of the grid.
    pub fn page_up(&mut self) -> bool {
        let size = self.page_size();
        if self.mode != Mode::Thumbnails || self.page_start < size {
            return false;
        }
        self.page_start -= size;
        self.cache.invalidate_thumbnails();
        true
    }

    /// Next page of the grid.
    pub fn page_down(&mut self) -> bool {
        let size = self.page_size();
        if self.mode != Mode::Thumbnails || self.page_start + size >= self.len() {
            return false;
        }
        self.page_start += size;
        self.cache.invalidate_thumbnails();
        true
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.viewport == (width, height) {
            return;
        }
        self.viewport = (width, height);
        self.cache.set_viewport(width, height);
        if self.mode == Mode::Thumbnails {
            self.cache.invalidate_thumbnails();
        }
    }

    /// Slots of the visible grid page, generating it if needed.
    pub fn thumbnails(&mut self) -> &[DisplaySlot<G::Texture>] {
        let (w, h) = self.viewport;
        self.cache.get_thumbnail_page(self.page_start, w, h)
    }

    /// Position in the library while auto-playing.
    pub fn progress(&self) -> Option<f32> {
        if self.mode != Mode::AutoPlay || self.is_empty() {
            return None;
        }
        Some((self.current + 1) as f32 / self.len() as f32)
    }

    pub fn frame(&self, now: Instant) -> Frame {
        if self.is_empty() {
            return Frame::Empty;
        }
        match (self.mode, self.transition) {
            (Mode::Thumbnails, _) => Frame::Grid {
                start: self.page_start,
            },
            (_, Some(t)) => Frame::Transition {
                from: t.from,
                to: t.to,
                progress: self.transition_progress(now).unwrap_or(1.0),
            },
            (_, None) => Frame::Single {
                index: self.current,
            },
        }
    }

    /// Where slide `index` sits in the viewport: its texture scaled to fit
    /// the current window and centred. `None` unless its texture is resident.
    pub fn slide_rect(&self, index: usize) -> Option<Rect> {
        let path = self.cache.images().get(index)?;
        let handle = self.cache.textures().peek(path)?;
        let (vw, vh) = self.viewport;
        // Textures keep the size they were decoded at; the window may have
        // changed since.
        let (w, h) = fit_within(handle.width(), handle.height(), vw, vh);
        let (x, y) = center_offset(w, h, vw, vh);
        Some(Rect {
            x: x as f32,
            y: y as f32,
            width: w as f32,
            height: h as f32,
        })
    }

    /// Apply finished thumbnail decodes; call once per frame.
    pub fn pump(&mut self) -> usize {
        self.cache.pump()
    }

    pub fn shutdown(&mut self) {
        self.cache.shutdown();
    }
}
