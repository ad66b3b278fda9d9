pub mod config;
pub mod error;
pub mod ocr;

pub use config::Config;
pub use error::{Result, TessrunError};
pub use ocr::{OcrOptions, OcrOverrides, OcrProcessor};
