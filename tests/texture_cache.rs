mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{FakeDecoder, RecordingContext, SRC};
use picview::ImageCache;
use picview::config::Configuration;
use picview::error::Error;

fn cache_with(max_images: usize) -> (ImageCache<RecordingContext>, RecordingContext, Arc<FakeDecoder>) {
    let cfg = Configuration {
        max_images,
        thread_pool_size: 1,
        ..Configuration::default()
    };
    let ctx = RecordingContext::default();
    let decoder = Arc::new(FakeDecoder::default());
    let cache = ImageCache::new(&cfg, ctx.clone(), decoder.clone(), Vec::new(), (800, 600)).unwrap();
    (cache, ctx, decoder)
}

fn p(name: &str) -> PathBuf {
    PathBuf::from(name)
}

fn resident(cache: &ImageCache<RecordingContext>) -> Vec<PathBuf> {
    cache.textures().paths().map(Path::to_path_buf).collect()
}

#[test]
fn never_exceeds_capacity() {
    let (mut cache, ctx, _) = cache_with(3);
    for i in 0..10 {
        cache.acquire_full(&p(&format!("{i}.png"))).unwrap();
        assert!(cache.textures().len() <= 3);
    }
    assert_eq!(cache.textures().len(), 3);
    assert_eq!(ctx.counters.uploads(), 10);
    assert_eq!(ctx.counters.releases(), 7);
    assert_eq!(ctx.counters.live(), 3);
}

#[test]
fn evicts_least_recently_used() {
    let (mut cache, ctx, _) = cache_with(3);
    for name in ["a", "b", "c", "a", "d"] {
        cache.acquire_full(&p(name)).unwrap();
    }
    assert_eq!(resident(&cache), vec![p("d"), p("a"), p("c")]);
    assert_eq!(ctx.counters.releases(), 1);
}

#[test]
fn evicted_path_reloads_from_decoder() {
    let (mut cache, _, decoder) = cache_with(2);
    for name in ["A", "B", "C"] {
        cache.acquire_full(&p(name)).unwrap();
    }
    assert!(!cache.textures().contains(&p("A")));
    assert!(cache.textures().contains(&p("B")));

    cache.acquire_full(&p("A")).unwrap();
    assert_eq!(decoder.calls("A"), 2);
    assert!(!cache.textures().contains(&p("B")));
}

#[test]
fn hit_does_not_reload() {
    let (mut cache, ctx, decoder) = cache_with(4);
    let first = cache.acquire_full(&p("a")).unwrap().path().to_path_buf();
    let again = cache.acquire_full(&p("a")).unwrap();
    assert_eq!(again.path(), first);
    assert_eq!(decoder.calls("a"), 1);
    assert_eq!(ctx.counters.uploads(), 1);
}

#[test]
fn hit_returns_resident_handle_and_refreshes_recency() {
    let (mut cache, ctx, decoder) = cache_with(2);
    cache.acquire_full(&p("a")).unwrap();
    cache.acquire_full(&p("b")).unwrap();
    let resident_a: *const _ = cache.textures().peek(&p("a")).unwrap();

    ctx.mark_lost();
    let hit: *const _ = cache.acquire_full(&p("a")).unwrap();
    assert_eq!(hit, resident_a);
    assert_eq!(resident(&cache), vec![p("a"), p("b")]);
    assert_eq!(decoder.total(), 2);
    assert_eq!(ctx.counters.uploads(), 2);
}

#[test]
fn capacity_of_one() {
    let (mut cache, ctx, _) = cache_with(1);
    cache.acquire_full(&p("a")).unwrap();
    cache.acquire_full(&p("a")).unwrap();
    cache.acquire_full(&p("b")).unwrap();
    cache.acquire_full(&p("a")).unwrap();
    assert_eq!(resident(&cache), vec![p("a")]);
    assert_eq!(ctx.counters.uploads(), 3);
    assert_eq!(ctx.counters.releases(), 2);
}

#[test]
fn fits_to_viewport_and_follows_resizes() {
    let (mut cache, _, _) = cache_with(4);
    let handle = cache.acquire_full(&p("a")).unwrap();
    assert_eq!((handle.width(), handle.height()), (800, 600));

    cache.set_viewport(200, 300);
    let handle = cache.acquire_full(&p("b")).unwrap();
    assert_eq!((handle.width(), handle.height()), (200, 150));
}

#[test]
fn falls_back_to_unprocessed_decode() {
    let (mut cache, _, decoder) = cache_with(2);
    let handle = cache.acquire_full(&p("nofit.jpg")).unwrap();
    assert_eq!((handle.width(), handle.height()), SRC);
    assert_eq!(decoder.calls("nofit.jpg"), 2);
}

#[test]
fn failed_load_keeps_resident_set() {
    let (mut cache, ctx, _) = cache_with(2);
    cache.acquire_full(&p("a")).unwrap();
    cache.acquire_full(&p("b")).unwrap();

    let err = cache.acquire_full(&p("corrupt.jpg")).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert_eq!(resident(&cache), vec![p("b"), p("a")]);
    assert_eq!(ctx.counters.releases(), 0);
}

#[test]
fn shutdown_releases_everything_once() {
    let (mut cache, ctx, _) = cache_with(3);
    for name in ["a", "b", "c"] {
        cache.acquire_full(&p(name)).unwrap();
    }
    cache.shutdown();
    cache.shutdown();
    assert!(cache.textures().is_empty());
    assert_eq!(ctx.counters.releases(), 3);
    drop(cache);
    assert_eq!(ctx.counters.releases(), 3);
}

#[test]
fn acquire_after_shutdown_creates_nothing() {
    let (mut cache, ctx, decoder) = cache_with(3);
    cache.acquire_full(&p("a")).unwrap();
    cache.shutdown();

    assert!(matches!(cache.acquire_full(&p("b")), Err(Error::ShutDown)));
    assert!(matches!(cache.acquire_full(&p("a")), Err(Error::ShutDown)));
    assert!(cache.textures().is_empty());
    assert_eq!(decoder.total(), 1);
    assert_eq!(ctx.counters.uploads(), 1);
    drop(cache);
    assert_eq!(ctx.counters.live(), 0);
}

#[test]
fn shutdown_after_context_loss_skips_release() {
    let (mut cache, ctx, _) = cache_with(3);
    cache.acquire_full(&p("a")).unwrap();
    cache.acquire_full(&p("b")).unwrap();
    ctx.mark_lost();

    cache.shutdown();
    assert!(cache.textures().is_empty());
    assert_eq!(ctx.counters.releases(), 0);
}

#[test]
fn upload_fails_once_context_is_gone() {
    let (mut cache, ctx, _) = cache_with(3);
    ctx.mark_lost();
    let err = cache.acquire_full(&p("a")).unwrap_err();
    assert!(matches!(err, Error::Gpu(_)));
    assert!(cache.textures().is_empty());
}
