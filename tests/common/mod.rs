#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use picview::error::{DecodeError, DecodeErrorKind, GpuError};
use picview::events::RawImage;
use picview::gpu::{GraphicsContext, Releasable};
use picview::processing::decode::{Constraints, Decode};
use picview::processing::layout::{fit_within, shrink_within};

/// Every fake source image is 400x300.
pub const SRC: (u32, u32) = (400, 300);

#[derive(Debug, Default)]
pub struct GpuCounters {
    pub uploads: AtomicUsize,
    pub releases: AtomicUsize,
    pub lost: AtomicBool,
}

impl GpuCounters {
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Textures created and not yet released.
    pub fn live(&self) -> usize {
        self.uploads() - self.releases()
    }
}

/// Graphics context that only counts.
#[derive(Debug, Clone, Default)]
pub struct RecordingContext {
    pub counters: Arc<GpuCounters>,
}

impl RecordingContext {
    pub fn mark_lost(&self) {
        self.counters.lost.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct FakeTexture {
    counters: Arc<GpuCounters>,
    released: bool,
}

impl Releasable for FakeTexture {
    fn release(&mut self) -> Result<(), GpuError> {
        if !self.released {
            self.released = true;
            self.counters.releases.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

impl GraphicsContext for RecordingContext {
    type Texture = FakeTexture;

    fn is_available(&self) -> bool {
        !self.counters.lost.load(Ordering::SeqCst)
    }

    fn upload(&self, _image: &RawImage) -> Result<FakeTexture, GpuError> {
        self.counters.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(FakeTexture {
            counters: Arc::clone(&self.counters),
            released: false,
        })
    }
}

/// Decoder that synthesises images without touching the filesystem.
///
/// Paths containing `corrupt` never decode. Paths containing `nofit` fail
/// fitted decodes but load unprocessed.
#[derive(Debug, Default)]
pub struct FakeDecoder {
    calls: Mutex<HashMap<PathBuf, usize>>,
    total: AtomicUsize,
}

impl FakeDecoder {
    pub fn calls(&self, path: impl AsRef<Path>) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Decode for FakeDecoder {
    fn decode(&self, path: &Path, constraints: &Constraints) -> Result<RawImage, DecodeError> {
        *self.calls.lock().unwrap().entry(path.to_path_buf()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        let name = path.to_string_lossy();
        if name.contains("corrupt") {
            return Err(DecodeError::new(path, DecodeErrorKind::Empty));
        }
        let (w, h) = match *constraints {
            Constraints::Fit { .. } if name.contains("nofit") => {
                return Err(DecodeError::new(path, DecodeErrorKind::Resize("nope".into())));
            }
            Constraints::Fit { width, height, .. } => fit_within(SRC.0, SRC.1, width, height),
            Constraints::Thumbnail {
                max_width,
                max_height,
            } => shrink_within(SRC.0, SRC.1, max_width, max_height),
            Constraints::Original => SRC,
        };
        Ok(RawImage::new(w, h, vec![128; (w * h * 4) as usize]))
    }
}

/// Wraps [`FakeDecoder`]; decodes of `blocked` paths report on `started`
/// and then wait until the gate sender is dropped.
pub struct GatedDecoder {
    pub inner: FakeDecoder,
    blocked: Vec<PathBuf>,
    gate: Receiver<()>,
    started: Sender<PathBuf>,
}

pub struct Gate {
    open: Option<Sender<()>>,
    pub started: Receiver<PathBuf>,
}

impl Gate {
    pub fn open(&mut self) {
        self.open.take();
    }

    pub fn wait_started(&self) -> PathBuf {
        self.started
            .recv_timeout(Duration::from_secs(5))
            .expect("gated decode never started")
    }
}

impl Drop for Gate {
    fn drop(&mut self) {
        self.open();
    }
}

impl GatedDecoder {
    pub fn new(blocked: Vec<PathBuf>) -> (Arc<Self>, Gate) {
        let (open, gate) = crossbeam_channel::bounded::<()>(0);
        let (started_tx, started) = crossbeam_channel::unbounded();
        let decoder = Arc::new(Self {
            inner: FakeDecoder::default(),
            blocked,
            gate,
            started: started_tx,
        });
        (
            decoder,
            Gate {
                open: Some(open),
                started,
            },
        )
    }
}

impl Decode for GatedDecoder {
    fn decode(&self, path: &Path, constraints: &Constraints) -> Result<RawImage, DecodeError> {
        if self.blocked.iter().any(|p| p == path) {
            let _ = self.started.send(path.to_path_buf());
            // Returns once every sender is dropped.
            let _ = self.gate.recv();
        }
        self.inner.decode(path, constraints)
    }
}

pub fn paths(n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| PathBuf::from(format!("img{i:02}.png"))).collect()
}

/// Repeatedly run `step` until `done` holds or five seconds pass.
pub fn settle<T>(target: &mut T, mut step: impl FnMut(&mut T), done: impl Fn(&T) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        step(target);
        if done(target) {
            return;
        }
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(2));
    }
}
