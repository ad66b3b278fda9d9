use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use super::{output_path, OUTPUT_EXTENSIONS};

/// Output stems of invocations whose result file has not been consumed yet.
///
/// An entry is added when an invocation starts and released once its output
/// has been read. Anything still listed when [`drain`](Self::drain) runs, or
/// when the registry is dropped, has its output files deleted on a best-effort
/// basis.
#[derive(Debug, Default)]
pub struct PendingOutputs {
    stems: Mutex<Vec<PathBuf>>,
}

impl PendingOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere must not stop cleanup, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.stems.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns false if the stem was already registered.
    pub fn register(&self, stem: &Path) -> bool {
        let mut stems = self.lock();
        if stems.iter().any(|s| s == stem) {
            return false;
        }
        stems.push(stem.to_path_buf());
        true
    }

    /// Returns false if the stem was not registered.
    pub fn release(&self, stem: &Path) -> bool {
        let mut stems = self.lock();
        match stems.iter().position(|s| s == stem) {
            Some(index) => {
                stems.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, stem: &Path) -> bool {
        self.lock().iter().any(|s| s == stem)
    }

    /// Registered stems in insertion order.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Delete the output files of every pending stem and clear the registry.
    ///
    /// Never fails; files that are already gone are skipped silently. Safe to
    /// call repeatedly, a second call finds nothing to do. Returns the number
    /// of stems cleared.
    pub fn drain(&self) -> usize {
        let stems = std::mem::take(&mut *self.lock());
        if stems.is_empty() {
            return 0;
        }

        for stem in &stems {
            for ext in OUTPUT_EXTENSIONS {
                let path = output_path(stem, ext);
                match std::fs::remove_file(&path) {
                    Ok(()) => debug!(path = %path.display(), "Removed abandoned OCR output"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "Could not remove OCR output")
                    }
                }
            }
        }

        info!(count = stems.len(), "Cleared pending OCR outputs");
        stems.len()
    }
}

impl Drop for PendingOutputs {
    fn drop(&mut self) {
        self.drain();
    }
}
