//! Captcha Solver
//!
//! Solves the distorted-text captcha shown inside a target application
//! window: the captcha region is captured, run through a catalogue of image
//! transformations and Tesseract, and the best answer is typed back.

mod automation;
mod calibration;
mod capture;
mod error;
mod logging;
mod ocr;
mod paths;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use automation::config::{load_config, SolverConfig};
use capture::{HueRegionDetector, RegionDetector, StillImageCapture};
use ocr::{OcrAdapter, OcrEngine, Recognizer, TesseractEngine};

#[derive(Parser)]
#[command(name = "captcha-solver", version, about = "Recognizes and submits in-app captchas")]
struct Cli {
    /// Configuration file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Register global hotkeys and solve captchas in the target window (Windows only)
    Watch,
    /// Recognize the captcha in a saved screenshot of the target window's client area
    Recognize {
        image: PathBuf,
        /// Write every catalogue variant of the captured region into this directory
        #[arg(long)]
        dump_variants: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    paths::ensure_directories()?;
    logging::init()?;

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(paths::get_config_path);

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch::run(config_path),
        Command::Recognize {
            image,
            dump_variants,
        } => run_recognize(&config_path, &image, dump_variants.as_deref()),
    }
}

/// Builds the shared OCR adapter, provisioning Tesseract if necessary.
fn build_adapter(config: &SolverConfig) -> Result<OcrAdapter> {
    let tesseract = ocr::ensure_tesseract(&config.ocr).context("Tesseract is not available")?;
    let engine: Arc<dyn OcrEngine> = Arc::new(TesseractEngine::new(tesseract, &config.ocr.language));

    let adapter = OcrAdapter::new(engine);
    Ok(if config.save_debug_images {
        adapter.with_debug_dir(paths::get_debug_dir())
    } else {
        adapter
    })
}

fn run_recognize(config_path: &Path, image: &Path, dump: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let source = Arc::new(StillImageCapture::open(image)?);
    let window = source.window_state();
    let detector: Arc<dyn RegionDetector> = Arc::new(HueRegionDetector::default());

    let (region, captured) =
        ocr::capture_region(source.as_ref(), Some(detector.as_ref()), &config.capture, &window)
            .ok_or_else(|| anyhow!("Could not capture the captcha region from {}", image.display()))?;
    info!("Captcha region: {} ({})", region.rect, region.method);

    if let Some(dir) = dump {
        dump_variants(&captured, dir)?;
    }

    let recognizer = Recognizer::new(source, Some(detector), build_adapter(&config)?);
    let runtime = tokio::runtime::Runtime::new()?;
    let recognition = runtime
        .block_on(recognizer.recognize_image(captured))
        .ok_or_else(|| anyhow!("No captcha text recognized"))?;

    println!("{}\t{}", recognition.text, recognition.strategy);
    Ok(())
}

fn dump_variants(captured: &RgbaImage, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    captured.save(dir.join("00_source.png"))?;

    let variants = ocr::generate_variants(captured, ocr::CATALOGUE);
    for (index, variant) in variants.iter().enumerate() {
        let path = dir.join(format!("{:02}_{}.png", index + 1, variant.strategy));
        variant
            .image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    info!("Wrote {} variants to {}", variants.len(), dir.display());
    Ok(())
}

#[cfg(not(windows))]
mod watch {
    use anyhow::{anyhow, Result};
    use std::path::PathBuf;

    pub fn run(_config_path: PathBuf) -> Result<()> {
        Err(anyhow!(
            "watch mode needs Windows; use `recognize <image>` for saved screenshots"
        ))
    }
}

#[cfg(windows)]
mod watch {
    use anyhow::{anyhow, Result};
    use std::path::PathBuf;
    use std::sync::{Arc, OnceLock};
    use tracing::{info, warn};

    use windows::core::w;
    use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        RegisterHotKey, UnregisterHotKey, MOD_CONTROL, MOD_NOREPEAT, MOD_SHIFT,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
        PostQuitMessage, RegisterClassW, TranslateMessage, CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT,
        MSG, WM_DESTROY, WM_HOTKEY, WNDCLASSW, WS_OVERLAPPEDWINDOW,
    };

    use crate::automation::{AttemptController, ConfigStore, SendInputInjector};
    use crate::calibration;
    use crate::capture::screenshot::GdiCapture;
    use crate::capture::window::probe;
    use crate::capture::{HueRegionDetector, RegionDetector};
    use crate::ocr::Recognizer;

    const HOTKEY_SOLVE: i32 = 1;
    const HOTKEY_ABORT: i32 = 2;

    struct WatchContext {
        runtime: tokio::runtime::Runtime,
        store: ConfigStore,
        controller: Arc<AttemptController>,
    }

    static CONTEXT: OnceLock<WatchContext> = OnceLock::new();

    pub fn run(config_path: PathBuf) -> Result<()> {
        let store = ConfigStore::open(config_path);
        let adapter = super::build_adapter(&store.snapshot())?;
        let detector: Arc<dyn RegionDetector> = Arc::new(HueRegionDetector::default());
        let recognizer = Recognizer::new(Arc::new(GdiCapture), Some(detector), adapter);
        let controller = Arc::new(AttemptController::new(recognizer, Arc::new(SendInputInjector)));
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

        CONTEXT
            .set(WatchContext {
                runtime,
                store,
                controller,
            })
            .map_err(|_| anyhow!("Watch mode already started"))?;

        let hwnd = create_message_window()?;
        unsafe {
            RegisterHotKey(hwnd, HOTKEY_SOLVE, MOD_CONTROL | MOD_SHIFT | MOD_NOREPEAT, 0x43)?; // 'C'
            RegisterHotKey(hwnd, HOTKEY_ABORT, MOD_CONTROL | MOD_SHIFT | MOD_NOREPEAT, 0x51)?; // 'Q'
        }
        calibration::register_calibration_hotkeys(hwnd)?;

        info!("Captcha solver started");
        info!("Hotkey: Ctrl+Shift+C (solve captcha)");
        info!("Hotkey: Ctrl+Shift+Q (abort solve)");
        info!("Press Ctrl+C in this console to exit");

        let mut msg = MSG::default();
        unsafe {
            while GetMessageW(&mut msg, HWND::default(), 0, 0).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }

            let _ = UnregisterHotKey(hwnd, HOTKEY_SOLVE);
            let _ = UnregisterHotKey(hwnd, HOTKEY_ABORT);
            calibration::unregister_calibration_hotkeys(hwnd);
            let _ = DestroyWindow(hwnd);
        }

        Ok(())
    }

    fn start_solve(ctx: &WatchContext) {
        if ctx.controller.is_running() {
            info!("A solve run is already in progress");
            return;
        }

        let config = ctx.store.snapshot();
        let controller = Arc::clone(&ctx.controller);
        ctx.runtime.spawn(async move {
            let target = config.target_process.clone();
            let window = match tokio::task::spawn_blocking(move || probe(&target)).await {
                Ok(window) => window,
                Err(e) => {
                    warn!("Window probe failed: {}", e);
                    return;
                }
            };

            match controller.run(&config, window).await {
                Ok(solved) => info!("Submitted {:?} ({})", solved.text, controller.stats()),
                Err(e) => warn!("Solve run failed: {}", e),
            }
        });
    }

    fn create_message_window() -> Result<HWND> {
        unsafe {
            let hinstance = GetModuleHandleW(None)?;
            let class_name = w!("CaptchaSolverClass");

            let wc = WNDCLASSW {
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(window_proc),
                hInstance: hinstance.into(),
                lpszClassName: class_name,
                ..Default::default()
            };

            if RegisterClassW(&wc) == 0 {
                return Err(anyhow!("Failed to register window class"));
            }

            let hwnd = CreateWindowExW(
                Default::default(),
                class_name,
                w!("Captcha Solver"),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                None,
                None,
                hinstance,
                None,
            )?;

            Ok(hwnd)
        }
    }

    unsafe extern "system" fn window_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        unsafe {
            match msg {
                WM_HOTKEY => {
                    let hotkey_id = wparam.0 as i32;
                    let Some(ctx) = CONTEXT.get() else {
                        return LRESULT(0);
                    };

                    if calibration::step_for_hotkey(hotkey_id).is_some() {
                        if let Err(e) = calibration::handle_calibration_hotkey(hotkey_id, &ctx.store) {
                            warn!("Calibration error: {:#}", e);
                        }
                    } else if hotkey_id == HOTKEY_SOLVE {
                        info!("Solve hotkey pressed");
                        start_solve(ctx);
                    } else if hotkey_id == HOTKEY_ABORT {
                        if ctx.controller.is_running() {
                            ctx.controller.abort();
                        } else {
                            info!("Abort hotkey pressed but no solve run is active");
                        }
                    }
                    LRESULT(0)
                }
                WM_DESTROY => {
                    PostQuitMessage(0);
                    LRESULT(0)
                }
                _ => DefWindowProcW(hwnd, msg, wparam, lparam),
            }
        }
    }
}
