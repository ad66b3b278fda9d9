use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OutputConfig;
use crate::error::{ExecutionFailure, Result, TessrunError};

use super::command::EngineCommand;
use super::options::{OcrOptions, OcrOverrides};
use super::registry::PendingOutputs;
use super::{output_path, OUTPUT_EXTENSIONS};

/// Runs the OCR engine binary and collects its output.
///
/// Clones share the same [`PendingOutputs`], so cleanup covers every call
/// made through any of them.
#[derive(Debug, Clone)]
pub struct OcrProcessor {
    defaults: OcrOptions,
    tmp_dir: PathBuf,
    stem_prefix: String,
    pending: Arc<PendingOutputs>,
}

impl OcrProcessor {
    pub fn new(defaults: &OcrOptions, output: &OutputConfig) -> Self {
        info!(
            binary = %defaults.binary,
            tmp_dir = %output.tmp_dir.display(),
            "OCR processor initialized"
        );
        Self {
            defaults: defaults.clone(),
            tmp_dir: output.tmp_dir.clone(),
            stem_prefix: output.stem_prefix.clone(),
            pending: Arc::new(PendingOutputs::new()),
        }
    }

    pub fn defaults(&self) -> &OcrOptions {
        &self.defaults
    }

    pub fn pending(&self) -> &PendingOutputs {
        &self.pending
    }

    /// Delete the outputs of every invocation that has not completed.
    /// Idempotent; returns the number of stems cleared.
    pub fn shutdown(&self) -> usize {
        self.pending.drain()
    }

    fn next_stem(&self) -> PathBuf {
        self.tmp_dir.join(format!("{}{}", self.stem_prefix, Uuid::new_v4()))
    }

    /// Recognise the text in `image`.
    ///
    /// `overrides` are merged over the processor defaults. Fails with
    /// [`TessrunError::Execution`] if the engine cannot be started or exits
    /// non-zero, [`TessrunError::OutputNotFound`] if it produced no output
    /// file, and [`TessrunError::Read`] if the output cannot be read as UTF-8.
    pub async fn process(
        &self,
        image: impl AsRef<Path>,
        overrides: Option<&OcrOverrides>,
    ) -> Result<String> {
        let image = image.as_ref();
        let options = match overrides {
            Some(overrides) => self.defaults.merge(overrides),
            None => self.defaults.clone(),
        };

        let stem = self.next_stem();
        let command = EngineCommand::build(image, &stem, &options).map_err(|e| {
            TessrunError::Execution {
                command: format!(
                    "{} {}",
                    options.binary,
                    options.config.as_deref().unwrap_or_default()
                ),
                source: ExecutionFailure::Arguments(e),
            }
        })?;

        let fresh = self.pending.register(&stem);
        debug_assert!(fresh, "output stem registered twice: {}", stem.display());

        if options.print_cmd {
            info!(command = %command, "Used tesseract command");
        }
        debug!(image = %image.display(), stem = %stem.display(), "Running OCR engine");

        let output = command
            .to_command()
            .output()
            .await
            .map_err(|e| TessrunError::Execution {
                command: command.to_string(),
                source: ExecutionFailure::Spawn(e),
            })?;

        if !output.status.success() {
            return Err(TessrunError::Execution {
                command: command.to_string(),
                source: ExecutionFailure::Exit {
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                },
            });
        }

        if options.print_stdout {
            info!(stdout = %String::from_utf8_lossy(&output.stdout), "Engine stdout");
        }
        if options.print_stderr {
            info!(stderr = %String::from_utf8_lossy(&output.stderr), "Engine stderr");
        }

        let path = find_output(&stem).await?;
        let text = read_output(&path).await?;

        self.pending.release(&stem);

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to delete OCR output");
        }

        Ok(text)
    }
}

async fn find_output(stem: &Path) -> Result<PathBuf> {
    for ext in OUTPUT_EXTENSIONS {
        let candidate = output_path(stem, ext);
        match tokio::fs::try_exists(&candidate).await {
            Ok(true) => return Ok(candidate),
            Ok(false) => {}
            Err(e) => {
                return Err(TessrunError::OutputNotFound {
                    stem: stem.to_path_buf(),
                    source: Some(e),
                })
            }
        }
    }

    Err(TessrunError::OutputNotFound {
        stem: stem.to_path_buf(),
        source: None,
    })
}

async fn read_output(path: &Path) -> Result<String> {
    let read_error = |source: io::Error| TessrunError::Read {
        path: path.to_path_buf(),
        source,
    };

    let bytes = tokio::fs::read(path).await.map_err(read_error)?;
    String::from_utf8(bytes).map_err(|e| read_error(io::Error::new(io::ErrorKind::InvalidData, e)))
}
