//! Captcha text recognition.
//!
//! A captured region is run through every strategy in the variant
//! catalogue, each result goes through Tesseract once, and the selector
//! picks a single answer from the cleaned outputs.

pub mod adapter;
pub mod engine;
pub mod pipeline;
pub mod preprocess;
pub mod select;
pub mod setup;
pub mod variants;

pub use adapter::OcrAdapter;
pub use engine::{OcrEngine, TesseractEngine};
pub use pipeline::{capture_region, Recognizer};
pub use select::{select, Recognition};
pub use setup::ensure_tesseract;
pub use variants::{generate_variants, CATALOGUE};
