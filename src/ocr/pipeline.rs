//! Recognition Orchestrator: one capture, every strategy, one selection.

use image::RgbaImage;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use super::adapter::OcrAdapter;
use super::select::{select_cleaned, OcrCandidate, Recognition};
use super::variants::{run_strategy, Strategy, CATALOGUE};
use crate::automation::config::CaptureConfig;
use crate::capture::detect::RegionDetector;
use crate::capture::region::{RegionResolver, ResolvedRegion};
use crate::capture::source::{CaptureSource, WindowState};

/// Resolves, pads and captures the captcha region.
///
/// Returns `None` for every kind of capture failure, including a rectangle
/// that clamps to nothing and an empty image.
pub fn capture_region(
    capture: &dyn CaptureSource,
    detector: Option<&dyn RegionDetector>,
    config: &CaptureConfig,
    window: &WindowState,
) -> Option<(ResolvedRegion, RgbaImage)> {
    let region = RegionResolver::new(capture, detector).resolve(config, window);

    let Some(rect) = region.padded(window) else {
        warn!(
            "Capture failed: {} rectangle {} lies outside its bounds",
            region.method, region.rect
        );
        return None;
    };

    let Some(image) = capture.capture(window.handle, rect) else {
        warn!("Capture failed for {} ({})", rect, region.method);
        return None;
    };

    if image.width() == 0 || image.height() == 0 {
        warn!("Capture failed: empty image for {}", rect);
        return None;
    }

    debug!(
        "Captured {}x{} via {} from {}",
        image.width(),
        image.height(),
        region.method,
        rect
    );
    Some((region, image))
}

/// Owns the collaborators for recognition attempts. Cloning is cheap.
#[derive(Clone)]
pub struct Recognizer {
    capture: Arc<dyn CaptureSource>,
    detector: Option<Arc<dyn RegionDetector>>,
    adapter: OcrAdapter,
    catalogue: Vec<Strategy>,
}

impl Recognizer {
    pub fn new(
        capture: Arc<dyn CaptureSource>,
        detector: Option<Arc<dyn RegionDetector>>,
        adapter: OcrAdapter,
    ) -> Self {
        Self {
            capture,
            detector,
            adapter,
            catalogue: CATALOGUE.to_vec(),
        }
    }

    pub fn with_catalogue(mut self, catalogue: Vec<Strategy>) -> Self {
        self.catalogue = catalogue;
        self
    }

    /// One full recognition attempt. `None` means capture failed or no
    /// candidate survived selection.
    pub async fn recognize_once(
        &self,
        config: &CaptureConfig,
        window: &WindowState,
    ) -> Option<Recognition> {
        let capture = Arc::clone(&self.capture);
        let detector = self.detector.clone();
        let (config, window) = (*config, *window);

        let captured = spawn_blocking(move || {
            capture_region(capture.as_ref(), detector.as_deref(), &config, &window)
        })
        .await;

        let (_, image) = match captured {
            Ok(Some(captured)) => captured,
            Ok(None) => return None,
            Err(e) => {
                warn!("Capture task failed: {}", e);
                return None;
            }
        };

        self.recognize_image(image).await
    }

    /// Runs every strategy and its OCR call on the blocking pool, then
    /// selects over the results in catalogue order.
    pub async fn recognize_image(&self, image: RgbaImage) -> Option<Recognition> {
        let source = Arc::new(image);

        let handles: Vec<_> = self
            .catalogue
            .iter()
            .map(|&strategy| {
                let source = Arc::clone(&source);
                let adapter = self.adapter.clone();
                spawn_blocking(move || {
                    run_strategy(&strategy, &source)
                        .map(|variant| adapter.recognize(&variant.image, variant.strategy))
                })
            })
            .collect();

        let mut candidates = Vec::with_capacity(handles.len());
        for (strategy, handle) in self.catalogue.iter().zip(handles) {
            match handle.await {
                Ok(Ok(text)) => candidates.push(OcrCandidate::new(strategy.name, text)),
                Ok(Err(e)) => warn!("Strategy {} skipped: {}", strategy.name, e),
                Err(e) => warn!("Strategy {} task failed: {}", strategy.name, e),
            }
        }

        let result = select_cleaned(&candidates);
        match &result {
            Some(r) => info!("Recognized {:?} via {}", r.text, r.strategy),
            None => info!("No valid candidate among {} OCR results", candidates.len()),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::rect::{CaptureRect, PixelRect};
    use crate::capture::source::{StillImageCapture, WindowHandle};
    use crate::ocr::engine::OcrEngine;
    use image::GrayImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    static COUNTED_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counted(_: &RgbaImage) -> GrayImage {
        COUNTED_CALLS.fetch_add(1, Ordering::SeqCst);
        GrayImage::new(300, 60)
    }

    fn narrow(_: &RgbaImage) -> GrayImage {
        GrayImage::new(300, 60)
    }

    fn wide(_: &RgbaImage) -> GrayImage {
        GrayImage::new(400, 60)
    }

    fn slow_wide(_: &RgbaImage) -> GrayImage {
        std::thread::sleep(Duration::from_millis(50));
        GrayImage::new(400, 60)
    }

    fn exploding(_: &RgbaImage) -> GrayImage {
        panic!("strategy failure")
    }

    /// Answers by image width so tests can tell strategies apart.
    #[derive(Default)]
    struct WidthEngine {
        calls: AtomicUsize,
    }

    impl OcrEngine for WidthEngine {
        fn process(&self, img: &GrayImage) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match img.width() {
                300 => "ab".to_string(),
                400 => "abcd".to_string(),
                _ => String::new(),
            })
        }
    }

    struct NullCapture;

    impl CaptureSource for NullCapture {
        fn capture(&self, _: Option<WindowHandle>, _: CaptureRect) -> Option<RgbaImage> {
            None
        }
    }

    fn window() -> WindowState {
        WindowState {
            handle: Some(WindowHandle(1)),
            client_size: Some((800, 600)),
            virtual_screen: CaptureRect::screen(0, 0, 800, 600),
        }
    }

    fn recognizer(capture: Arc<dyn CaptureSource>, engine: Arc<WidthEngine>, catalogue: Vec<Strategy>) -> Recognizer {
        Recognizer::new(capture, None, OcrAdapter::new(engine)).with_catalogue(catalogue)
    }

    #[tokio::test]
    async fn test_capture_failure_skips_variants() {
        let engine = Arc::new(WidthEngine::default());
        let r = recognizer(
            Arc::new(NullCapture),
            engine.clone(),
            vec![Strategy { name: "counted", apply: counted }],
        );

        let result = r.recognize_once(&CaptureConfig::default(), &window()).await;

        assert_eq!(result, None);
        assert_eq!(COUNTED_CALLS.load(Ordering::SeqCst), 0);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_bounds_region_is_capture_failure() {
        let engine = Arc::new(WidthEngine::default());
        let r = recognizer(
            Arc::new(StillImageCapture::new(RgbaImage::new(800, 600))),
            engine.clone(),
            vec![Strategy { name: "narrow", apply: narrow }],
        );
        let mut config = CaptureConfig::default();
        config.fixed_coords = PixelRect::new(5000, 5000, 100, 40);

        assert_eq!(r.recognize_once(&config, &window()).await, None);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_best_candidate_selected() {
        let engine = Arc::new(WidthEngine::default());
        let r = recognizer(
            Arc::new(StillImageCapture::new(RgbaImage::new(800, 600))),
            engine.clone(),
            vec![
                Strategy { name: "narrow", apply: narrow },
                Strategy { name: "exploding", apply: exploding },
                Strategy { name: "wide", apply: wide },
            ],
        );

        let result = r.recognize_once(&CaptureConfig::default(), &window()).await.unwrap();

        assert_eq!(result.text, "abcd");
        assert_eq!(result.strategy, "wide");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tie_break_ignores_completion_order() {
        let engine = Arc::new(WidthEngine::default());
        let r = recognizer(
            Arc::new(StillImageCapture::new(RgbaImage::new(800, 600))),
            engine,
            vec![
                Strategy { name: "slow", apply: slow_wide },
                Strategy { name: "fast", apply: wide },
            ],
        );

        let result = r.recognize_image(RgbaImage::new(120, 40)).await.unwrap();
        assert_eq!(result.strategy, "slow");
    }
}
