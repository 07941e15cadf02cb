//! Cached PNG overview of the current map.
//!
//! There is exactly one overview at a time, so the cache is a single slot
//! keyed implicitly by "has the world changed enough to warrant a new
//! render". [`staleness`] decides that, in this order:
//!
//! 1. nothing has been rendered yet,
//! 2. the map identity differs from the one the cached image was rendered for,
//! 3. more than the refresh interval has elapsed since the last render.
//!
//! The cached bytes, render time, and map identity live together in one
//! [`CachedOverview`] record that is replaced whole, never patched. A failed
//! render or encode leaves the previous record untouched.
//!
//! # Concurrency
//!
//! [`MapRenderer::render`] may suspend, so renders are serialized behind a
//! single-slot gate. Cache hits never touch the gate. A caller that waited
//! on the gate re-checks staleness first and reuses the image the previous
//! holder just published instead of rendering again.
//!
//! Time is measured on Tokio's monotonic clock, so wall-clock adjustments
//! cannot force or suppress a refresh.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use status_types::MapIdentity;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::provider::{GameStateProvider, MapRenderer, OVERVIEW_SIZE, RenderError};

/// MIME type of the encoded overview.
pub const OVERVIEW_CONTENT_TYPE: &str = "image/png";

/// Errors that can occur while refreshing the overview.
#[derive(Debug, thiserror::Error)]
pub enum OverviewError {
    /// The map renderer failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The rendered pixels could not be encoded as PNG.
    #[error("overview encoding failed: {0}")]
    Encoding(#[from] image::ImageError),

    /// The renderer returned an image of the wrong size.
    #[error("overview is {width}x{height}, expected {expected}x{expected}")]
    Dimensions {
        /// Width of the rejected image.
        width: u32,
        /// Height of the rejected image.
        height: u32,
        /// Required edge length.
        expected: u32,
    },
}

/// Why the cached overview can or cannot be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// The cached image is current.
    Fresh,
    /// Nothing has been rendered yet.
    Empty,
    /// The map changed since the last render.
    MapChanged,
    /// The refresh interval elapsed since the last render.
    Expired,
}

impl Staleness {
    /// Whether a new render is required.
    pub const fn is_stale(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// One successful render: encoded bytes plus the state they were rendered for.
#[derive(Debug, Clone)]
pub struct CachedOverview {
    /// PNG-encoded overview.
    pub bytes: Bytes,
    /// When the render was started.
    pub rendered_at: Instant,
    /// Map the image shows.
    pub map: MapIdentity,
}

/// Evaluate the staleness predicate against the cached record.
///
/// The interval comparison is strict: an entry exactly `refresh_interval`
/// old is still fresh.
pub fn staleness(
    entry: Option<&CachedOverview>,
    current_map: &MapIdentity,
    now: Instant,
    refresh_interval: Duration,
) -> Staleness {
    let Some(entry) = entry else {
        return Staleness::Empty;
    };
    if entry.map != *current_map {
        return Staleness::MapChanged;
    }
    if now.saturating_duration_since(entry.rendered_at) > refresh_interval {
        Staleness::Expired
    } else {
        Staleness::Fresh
    }
}

/// Encode a rendered overview as PNG with an alpha channel.
///
/// # Errors
///
/// Returns [`OverviewError::Dimensions`] unless the image is
/// [`OVERVIEW_SIZE`] pixels square, or [`OverviewError::Encoding`] if the
/// PNG encoder fails.
pub fn encode_png(pixels: &RgbaImage) -> Result<Bytes, OverviewError> {
    let (width, height) = pixels.dimensions();
    if width != OVERVIEW_SIZE || height != OVERVIEW_SIZE {
        return Err(OverviewError::Dimensions {
            width,
            height,
            expected: OVERVIEW_SIZE,
        });
    }

    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        pixels.as_raw(),
        width,
        height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(Bytes::from(buf))
}

enum Probe {
    Hit(Bytes),
    Miss(Staleness),
}

/// Lazily refreshed, write-through cache of the map overview.
pub struct OverviewCache {
    game: Arc<dyn GameStateProvider>,
    renderer: Arc<dyn MapRenderer>,
    refresh_interval: Duration,
    published: RwLock<Option<Arc<CachedOverview>>>,
    render_gate: Mutex<()>,
}

impl OverviewCache {
    /// Create an empty cache. Nothing is rendered until the first [`get`].
    ///
    /// [`get`]: OverviewCache::get
    pub fn new(
        game: Arc<dyn GameStateProvider>,
        renderer: Arc<dyn MapRenderer>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            game,
            renderer,
            refresh_interval,
            published: RwLock::new(None),
            render_gate: Mutex::new(()),
        }
    }

    /// The currently published record, if any render has succeeded.
    pub async fn cached(&self) -> Option<Arc<CachedOverview>> {
        self.published.read().await.clone()
    }

    /// Return the overview PNG, rendering first if the cached one is stale.
    ///
    /// # Errors
    ///
    /// Propagates renderer and encoder failures. The previously cached
    /// image and its metadata are left as they were, so the next call
    /// judges staleness against the same values and retries.
    pub async fn get(&self) -> Result<Bytes, OverviewError> {
        let current_map = self.game.current_map();
        if let Probe::Hit(bytes) = self.probe(&current_map, Instant::now()).await {
            return Ok(bytes);
        }

        let _gate = self.render_gate.lock().await;

        // Whoever held the gate before us may already have refreshed.
        let current_map = self.game.current_map();
        let now = Instant::now();
        let reason = match self.probe(&current_map, now).await {
            Probe::Hit(bytes) => return Ok(bytes),
            Probe::Miss(reason) => reason,
        };

        debug!(map = %current_map, ?reason, "Rendering map overview");
        let entry = self.render(current_map, now).await.inspect_err(|e| {
            warn!(error = %e, "Overview refresh failed, keeping previous image");
        })?;

        let bytes = entry.bytes.clone();
        *self.published.write().await = Some(Arc::new(entry));
        Ok(bytes)
    }

    async fn probe(&self, current_map: &MapIdentity, now: Instant) -> Probe {
        let published = self.published.read().await;
        match (
            staleness(published.as_deref(), current_map, now, self.refresh_interval),
            published.as_ref(),
        ) {
            (Staleness::Fresh, Some(entry)) => Probe::Hit(entry.bytes.clone()),
            (Staleness::Fresh, None) => Probe::Miss(Staleness::Empty),
            (reason, _) => Probe::Miss(reason),
        }
    }

    async fn render(
        &self,
        map: MapIdentity,
        now: Instant,
    ) -> Result<CachedOverview, OverviewError> {
        let pixels = self.renderer.render().await?;
        let bytes = encode_png(&pixels)?;
        Ok(CachedOverview {
            bytes,
            rendered_at: now,
            map,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unimplemented, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use futures::FutureExt as _;
    use futures::future::{BoxFuture, join_all};
    use image::Rgba;
    use status_types::GameStateSnapshot;

    use super::*;

    /// PNG file signature.
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    struct FakeGame {
        map: StdMutex<MapIdentity>,
    }

    impl FakeGame {
        fn new(map: &str) -> Arc<Self> {
            Arc::new(Self {
                map: StdMutex::new(MapIdentity::from(map)),
            })
        }

        fn switch_map(&self, map: &str) {
            *self.map.lock().unwrap() = MapIdentity::from(map);
        }
    }

    impl GameStateProvider for FakeGame {
        fn current_map(&self) -> MapIdentity {
            self.map.lock().unwrap().clone()
        }

        fn snapshot(&self) -> GameStateSnapshot {
            unimplemented!("not used by the cache")
        }
    }

    #[derive(Default)]
    struct FakeRenderer {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Option<Duration>,
        size: Option<u32>,
    }

    impl FakeRenderer {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MapRenderer for FakeRenderer {
        fn render(&self) -> BoxFuture<'_, Result<RgbaImage, RenderError>> {
            async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if self.fail.load(Ordering::SeqCst) {
                    return Err(RenderError::new("renderer offline"));
                }
                let shade = u8::try_from(call % 256).unwrap();
                let size = self.size.unwrap_or(OVERVIEW_SIZE);
                Ok(RgbaImage::from_pixel(size, size, Rgba([shade, 64, 32, 255])))
            }
            .boxed()
        }
    }

    fn cache_with(game: &Arc<FakeGame>, renderer: &Arc<FakeRenderer>) -> OverviewCache {
        OverviewCache::new(
            Arc::clone(game) as Arc<dyn GameStateProvider>,
            Arc::clone(renderer) as Arc<dyn MapRenderer>,
            Duration::from_secs(60),
        )
    }

    #[test]
    fn staleness_checks_in_order() {
        let now = Instant::now();
        let classic = MapIdentity::from("classicgen");
        let interval = Duration::from_secs(60);

        assert_eq!(staleness(None, &classic, now, interval), Staleness::Empty);

        let entry = CachedOverview {
            bytes: Bytes::from_static(b"png"),
            rendered_at: now,
            map: classic.clone(),
        };
        assert_eq!(
            staleness(Some(&entry), &classic, now, interval),
            Staleness::Fresh
        );
        assert_eq!(
            staleness(Some(&entry), &MapIdentity::from("arena"), now, interval),
            Staleness::MapChanged
        );

        let later = now + Duration::from_secs(61);
        assert_eq!(
            staleness(Some(&entry), &classic, later, interval),
            Staleness::Expired
        );
        // A map change wins over expiry.
        assert_eq!(
            staleness(Some(&entry), &MapIdentity::from("arena"), later, interval),
            Staleness::MapChanged
        );
    }

    #[test]
    fn staleness_interval_is_strict() {
        let now = Instant::now();
        let map = MapIdentity::from("classicgen");
        let entry = CachedOverview {
            bytes: Bytes::new(),
            rendered_at: now,
            map: map.clone(),
        };
        let interval = Duration::from_secs(60);
        assert_eq!(
            staleness(Some(&entry), &map, now + interval, interval),
            Staleness::Fresh
        );
        assert!(
            staleness(Some(&entry), &map, now + interval + Duration::from_millis(1), interval)
                .is_stale()
        );
    }

    #[test]
    fn encode_rejects_wrong_dimensions() {
        let small = RgbaImage::new(64, 64);
        assert!(matches!(
            encode_png(&small),
            Err(OverviewError::Dimensions {
                width: 64,
                height: 64,
                expected: 512
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn first_get_renders_and_encodes_png() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer::default());
        let cache = cache_with(&game, &renderer);

        assert!(cache.cached().await.is_none());
        let bytes = cache.get().await.unwrap();

        assert_eq!(renderer.calls(), 1);
        assert!(bytes.starts_with(PNG_MAGIC));
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), OVERVIEW_SIZE);
        assert_eq!(decoded.height(), OVERVIEW_SIZE);
        assert!(decoded.color().has_alpha());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_hits_are_identical_and_do_not_render() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer::default());
        let cache = cache_with(&game, &renderer);

        let first = cache.get().await.unwrap();
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(5)).await;
            assert_eq!(cache.get().await.unwrap(), first);
        }
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn map_change_rerenders_immediately() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer::default());
        let cache = cache_with(&game, &renderer);

        let classic = cache.get().await.unwrap();
        game.switch_map("arena");
        let arena = cache.get().await.unwrap();

        assert_eq!(renderer.calls(), 2);
        assert_ne!(classic, arena);
        assert_eq!(cache.cached().await.unwrap().map, MapIdentity::from("arena"));

        // Switching back is a change too.
        game.switch_map("classicgen");
        cache.get().await.unwrap();
        assert_eq!(renderer.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_boundary_is_strict() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer::default());
        let cache = cache_with(&game, &renderer);

        cache.get().await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        cache.get().await.unwrap();
        assert_eq!(renderer.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        cache.get().await.unwrap();
        assert_eq!(renderer.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_timeline() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer::default());
        let cache = cache_with(&game, &renderer);
        let start = Instant::now();

        // t=0
        let b0 = cache.get().await.unwrap();
        assert_eq!(renderer.calls(), 1);
        assert_eq!(cache.cached().await.unwrap().rendered_at, start);

        // t=10
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get().await.unwrap(), b0);
        assert_eq!(renderer.calls(), 1);

        // t=70
        tokio::time::advance(Duration::from_secs(60)).await;
        let b1 = cache.get().await.unwrap();
        assert_eq!(renderer.calls(), 2);
        assert_ne!(b0, b1);
        let entry = cache.cached().await.unwrap();
        assert_eq!(entry.rendered_at, start + Duration::from_secs(70));

        // t=71, map switches
        tokio::time::advance(Duration::from_secs(1)).await;
        game.switch_map("arena");
        cache.get().await.unwrap();
        assert_eq!(renderer.calls(), 3);
        let entry = cache.cached().await.unwrap();
        assert_eq!(entry.map, MapIdentity::from("arena"));
        assert_eq!(entry.rendered_at, start + Duration::from_secs(71));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_render_leaves_cache_empty_and_retries() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer::default());
        renderer.fail.store(true, Ordering::SeqCst);
        let cache = cache_with(&game, &renderer);

        assert!(matches!(cache.get().await, Err(OverviewError::Render(_))));
        assert!(cache.cached().await.is_none());

        renderer.fail.store(false, Ordering::SeqCst);
        cache.get().await.unwrap();
        assert_eq!(renderer.calls(), 2);
        assert!(cache.cached().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_previous_record() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer::default());
        let cache = cache_with(&game, &renderer);

        let before = cache.get().await.unwrap();
        let rendered_at = cache.cached().await.unwrap().rendered_at;

        renderer.fail.store(true, Ordering::SeqCst);
        game.switch_map("arena");
        assert!(cache.get().await.is_err());

        let entry = cache.cached().await.unwrap();
        assert_eq!(entry.bytes, before);
        assert_eq!(entry.rendered_at, rendered_at);
        assert_eq!(entry.map, MapIdentity::from("classicgen"));

        // Still judged against the old map, so the next call retries.
        renderer.fail.store(false, Ordering::SeqCst);
        cache.get().await.unwrap();
        assert_eq!(renderer.calls(), 3);
        assert_eq!(cache.cached().await.unwrap().map, MapIdentity::from("arena"));
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_size_render_is_an_encoding_failure() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer {
            size: Some(256),
            ..FakeRenderer::default()
        });
        let cache = cache_with(&game, &renderer);

        assert!(matches!(
            cache.get().await,
            Err(OverviewError::Dimensions { .. })
        ));
        assert!(cache.cached().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_gets_share_one_suspended_render() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer {
            delay: Some(Duration::from_millis(250)),
            ..FakeRenderer::default()
        });
        let cache = Arc::new(cache_with(&game, &renderer));

        let results = join_all((0..8).map(|_| {
            let cache = Arc::clone(&cache);
            async move { cache.get().await.unwrap() }
        }))
        .await;

        assert_eq!(renderer.calls(), 1);
        assert!(results.iter().all(|bytes| *bytes == results[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn published_record_stays_whole_during_refresh() {
        let game = FakeGame::new("classicgen");
        let renderer = Arc::new(FakeRenderer {
            delay: Some(Duration::from_secs(5)),
            ..FakeRenderer::default()
        });
        let cache = Arc::new(cache_with(&game, &renderer));
        let classic = cache.get().await.unwrap();

        game.switch_map("arena");
        let refreshing = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get().await.unwrap() }
        });
        tokio::task::yield_now().await;

        // The published record still describes classicgen until the
        // in-flight render completes.
        let entry = cache.cached().await.unwrap();
        assert_eq!(entry.bytes, classic);

        let arena = refreshing.await.unwrap();
        assert_ne!(arena, classic);
        assert_eq!(renderer.calls(), 2);
    }
}
