#![allow(dead_code)]

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tessrun::config::OutputConfig;
use tessrun::{OcrOptions, OcrProcessor};
use tracing::subscriber::DefaultGuard;

pub const STEM_PREFIX: &str = "it-";

/// A shell script standing in for the tesseract binary.
///
/// The script is called as `<script> <image> <stem> [flags...]`. It records
/// the flags, one per line, in `args.log` and then runs `body` with `$stem`
/// set.
pub struct FakeEngine {
    dir: TempDir,
    script: PathBuf,
}

impl FakeEngine {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        Self::in_dir(dir, body)
    }

    /// Engine that writes `content` to `<stem>.<ext>`.
    pub fn writing(ext: &str, content: &[u8]) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let fixture = dir.path().join(format!("fixture.{ext}"));
        fs::write(&fixture, content).expect("Failed to write fixture");

        Self::in_dir(dir, &format!("cat '{}' > \"$stem.{ext}\"", fixture.display()))
    }

    fn in_dir(dir: TempDir, body: &str) -> Self {
        fs::create_dir(dir.path().join("out")).expect("Failed to create output dir");

        let args_log = dir.path().join("args.log");
        let script = dir.path().join("fake-tesseract");
        let source = format!(
            "#!/bin/sh\nimage=\"$1\"\nstem=\"$2\"\nshift 2\nprintf '%s\\n' \"$@\" > '{}'\n{}\n",
            args_log.display(),
            body
        );
        fs::write(&script, source).expect("Failed to write fake engine");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake engine executable");

        Self { dir, script }
    }

    pub fn binary(&self) -> String {
        self.script.display().to_string()
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn options(&self) -> OcrOptions {
        OcrOptions {
            binary: self.binary(),
            ..OcrOptions::default()
        }
    }

    pub fn processor(&self) -> OcrProcessor {
        OcrProcessor::new(
            &self.options(),
            &OutputConfig {
                tmp_dir: self.out_dir(),
                stem_prefix: STEM_PREFIX.to_string(),
            },
        )
    }

    /// Flags passed after `<image> <stem>` on the last run.
    pub fn recorded_flags(&self) -> Vec<String> {
        let log = fs::read_to_string(self.dir.path().join("args.log"))
            .expect("Fake engine did not record its arguments");
        log.lines()
            .map(str::to_string)
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Files the engine left in the output directory.
    pub fn leftovers(&self) -> Vec<PathBuf> {
        list_files(&self.out_dir())
    }
}

pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("Failed to list directory")
        .map(|entry| entry.expect("Failed to read dir entry").path())
        .collect();
    files.sort();
    files
}

/// Collects formatted `tracing` output from the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `info` and above on this thread into the buffer until the guard
    /// is dropped. Needs a current-thread runtime, which `#[tokio::test]` uses.
    pub fn set_default(&self) -> DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().expect("Log buffer poisoned");
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("Log buffer poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
