//! OCR via the Tesseract command-line binary
//!
//! Each call to [`OcrProcessor::process`] runs the engine once:
//!
//! 1. merge the caller's [`OcrOverrides`] over the processor's default [`OcrOptions`]
//! 2. pick a fresh output stem under the temp directory and register it in [`PendingOutputs`]
//! 3. run `<binary> <image> <stem> [flags...]` (see [`EngineCommand`])
//! 4. find `<stem>.hocr`, `<stem>.html` or `<stem>.txt`, in that order
//! 5. read it, release the stem, delete the file and return the text
//!
//! A stem that never reaches step 5 stays registered. Its files are deleted
//! by [`OcrProcessor::shutdown`], or when the last processor clone is dropped.
//!
//! # Usage
//!
//! ```rust,ignore
//! let processor = OcrProcessor::new(&config);
//! let text = processor
//!     .process("scan.png", Some(&OcrOverrides::default().language("fra").psm(6)))
//!     .await?;
//! processor.shutdown();
//! ```

mod command;
mod options;
mod processor;
mod registry;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub use command::EngineCommand;
pub use options::{
    OcrOptions, OcrOverrides, DEFAULT_BINARY, DEFAULT_LANGUAGE, DEFAULT_OEM, DEFAULT_PSM,
};
pub use processor::OcrProcessor;
pub use registry::PendingOutputs;

/// Extensions the engine may write, in lookup order.
pub const OUTPUT_EXTENSIONS: [&str; 3] = ["hocr", "html", "txt"];

/// `<stem>.<ext>`. Appends rather than replacing anything after a dot in the stem.
pub fn output_path(stem: &Path, ext: &str) -> PathBuf {
    let mut path = OsString::from(stem.as_os_str());
    path.push(".");
    path.push(ext);
    PathBuf::from(path)
}
