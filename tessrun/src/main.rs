use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tessrun::config::{Config, LogFormat};
use tessrun::{OcrOverrides, OcrProcessor};

#[derive(Parser)]
#[command(name = "tessrun")]
#[command(about = "Run Tesseract on images and print the recognised text")]
struct Args {
    /// Images to recognise
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Engine options as a JSON object, e.g. '{"l":"fra","psm":6,"oem":null}'
    #[arg(long, value_name = "JSON")]
    options: Option<String>,

    /// Language code passed with `-l`
    #[arg(short = 'l', long, conflicts_with = "no_lang")]
    lang: Option<String>,

    /// Leave out `-l`
    #[arg(long)]
    no_lang: bool,

    /// Page segmentation mode
    #[arg(long)]
    psm: Option<u32>,

    /// OCR engine mode
    #[arg(long)]
    oem: Option<u32>,

    /// Extra engine arguments, appended as-is (e.g. "hocr")
    #[arg(long, value_name = "ARGS")]
    engine_config: Option<String>,

    /// Engine executable name or path
    #[arg(long)]
    binary: Option<String>,

    #[arg(long)]
    print_parameters: bool,

    #[arg(long)]
    print_cmd: bool,

    #[arg(long)]
    print_stdout: bool,

    #[arg(long)]
    print_stderr: bool,

    /// Give up on an image after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Args {
    /// `--options` first, then the individual flags on top.
    fn overrides(&self) -> tessrun::Result<OcrOverrides> {
        let mut overrides = match &self.options {
            Some(json) => OcrOverrides::from_json(json)?,
            None => OcrOverrides::default(),
        };

        if let Some(lang) = &self.lang {
            overrides.l = Some(Some(lang.clone()));
        }
        if self.no_lang {
            overrides.l = Some(None);
        }
        if let Some(psm) = self.psm {
            overrides.psm = Some(Some(psm));
        }
        if let Some(oem) = self.oem {
            overrides.oem = Some(Some(oem));
        }
        if let Some(config) = &self.engine_config {
            overrides.config = Some(Some(config.clone()));
        }
        if let Some(binary) = &self.binary {
            overrides.binary = Some(binary.clone());
        }
        if self.print_parameters {
            overrides.print_parameters = Some(true);
        }
        if self.print_cmd {
            overrides.print_cmd = Some(true);
        }
        if self.print_stdout {
            overrides.print_stdout = Some(true);
        }
        if self.print_stderr {
            overrides.print_stderr = Some(true);
        }

        Ok(overrides)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    init_tracing(LogFormat::from_env());

    let config = Config::from_env();
    let overrides = args.overrides().context("Invalid --options")?;
    let processor = OcrProcessor::new(&config.ocr, &config.output);

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    let timeout = args.timeout_secs.map(Duration::from_secs);
    let jobs = args
        .images
        .iter()
        .map(|image| recognise(&processor, image, &overrides, timeout));

    // Dropping the jobs on cancellation kills any running engine processes.
    let results = tokio::select! {
        results = join_all(jobs) => results,
        _ = cancel_token.cancelled() => {
            let cleared = processor.shutdown();
            tracing::warn!(cleared, "Interrupted, removed pending OCR outputs");
            anyhow::bail!("interrupted");
        }
    };

    let multiple = args.images.len() > 1;
    let mut failures = 0;
    for (image, result) in args.images.iter().zip(results) {
        match result {
            Ok(text) => {
                if multiple {
                    println!("==> {} <==", image.display());
                }
                print!("{text}");
            }
            Err(e) => {
                tracing::error!(image = %image.display(), "OCR failed: {:#}", e);
                failures += 1;
            }
        }
    }

    let cleared = processor.shutdown();
    if cleared > 0 {
        tracing::debug!(cleared, "Removed outputs of failed invocations");
    }

    if failures > 0 {
        anyhow::bail!("{} of {} images failed", failures, args.images.len());
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tessrun=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the recognised text
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn recognise(
    processor: &OcrProcessor,
    image: &Path,
    overrides: &OcrOverrides,
    timeout: Option<Duration>,
) -> anyhow::Result<String> {
    let call = processor.process(image, Some(overrides));
    let text = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| anyhow::anyhow!("timed out after {} seconds", limit.as_secs()))??,
        None => call.await?,
    };
    Ok(text)
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cleaning up...");
    cancel_token.cancel();
}
