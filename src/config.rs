use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Unsharp-mask parameters applied after resampling full-size images.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SharpenOptions {
    pub enabled: bool,
    /// Gaussian radius in pixels.
    pub radius: f32,
    /// Fraction of the high-pass signal added back (0.6 = 60%).
    pub amount: f32,
    /// Minimum per-channel difference before sharpening applies.
    pub threshold: u8,
}

impl Default for SharpenOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 1.5,
            amount: 0.6,
            threshold: 3,
        }
    }
}

impl SharpenOptions {
    /// `None` when sharpening is switched off.
    pub fn active(&self) -> Option<Self> {
        self.enabled.then_some(*self)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.radius.is_finite() && self.radius >= 0.0,
            "sharpen.radius must be a non-negative number"
        );
        ensure!(
            self.amount.is_finite() && self.amount >= 0.0,
            "sharpen.amount must be a non-negative number"
        );
        Ok(())
    }
}

/// Thumbnail grid geometry.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GridOptions {
    pub columns: u32,
    pub rows: u32,
    pub padding: f32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            columns: 5,
            rows: 2,
            padding: 10.0,
        }
    }
}

impl GridOptions {
    fn validate(&self) -> Result<()> {
        ensure!(self.columns > 0, "grid.columns must be greater than zero");
        ensure!(self.rows > 0, "grid.rows must be greater than zero");
        ensure!(
            self.padding.is_finite() && self.padding >= 0.0,
            "grid.padding must be a non-negative number"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Root directory to scan recursively for images.
    pub photo_library_path: PathBuf,
    /// Number of full-size textures kept resident.
    pub max_images: usize,
    /// Bounding box (width, height) thumbnails are decoded into.
    pub thumbnail_size: [u32; 2],
    /// Background decode workers for thumbnails.
    pub thread_pool_size: usize,
    pub grid: GridOptions,
    pub sharpen: SharpenOptions,
    /// Time a slide stays up in auto-play.
    #[serde(with = "humantime_serde")]
    pub slide_duration: Duration,
    /// Slide-in transition length.
    #[serde(with = "humantime_serde")]
    pub transition: Duration,
    /// Shuffle the library after scanning.
    pub shuffle: bool,
    /// Optional deterministic seed for the startup shuffle.
    pub shuffle_seed: Option<u64>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&s)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        // An empty document means "all defaults".
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(self.max_images > 0, "max-images must be greater than zero");
        ensure!(
            self.thread_pool_size > 0,
            "thread-pool-size must be greater than zero"
        );
        ensure!(
            self.thumbnail_size[0] > 0 && self.thumbnail_size[1] > 0,
            "thumbnail-size must be positive in both dimensions"
        );
        ensure!(
            self.slide_duration > Duration::ZERO,
            "slide-duration must be positive"
        );
        self.grid.validate().context("invalid grid configuration")?;
        self.sharpen
            .validate()
            .context("invalid sharpen configuration")?;
        Ok(self)
    }

    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_images).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn thumbnail_bound(&self) -> (u32, u32) {
        (self.thumbnail_size[0], self.thumbnail_size[1])
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::new(),
            max_images: 20,
            thumbnail_size: [200, 200],
            thread_pool_size: 4,
            grid: GridOptions::default(),
            sharpen: SharpenOptions::default(),
            slide_duration: Duration::from_secs(5),
            transition: Duration::from_secs(1),
            shuffle: true,
            shuffle_seed: None,
        }
    }
}
