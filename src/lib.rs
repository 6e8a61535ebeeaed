pub mod config;
pub mod error;
pub mod events;
pub mod gpu;
pub mod scan;
pub mod session;
pub mod slideshow;
pub mod texture_cache;
pub mod processing {
    pub mod decode;
    pub mod layout;
    pub mod sharpen;
}
pub mod tasks {
    pub mod pool;
    pub mod thumbnails;
}

pub use session::{CacheStats, ImageCache};
