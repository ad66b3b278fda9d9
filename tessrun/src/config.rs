use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::ocr::{OcrOptions, DEFAULT_BINARY, DEFAULT_LANGUAGE, DEFAULT_OEM, DEFAULT_PSM};

pub const DEFAULT_STEM_PREFIX: &str = "tessrun-";

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Like `parse_env_or`, but `none`, `null` or an empty value disable the
/// setting instead of falling back to the default.
fn parse_env_nullable<T: std::str::FromStr>(var: &str, default: Option<T>) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) if is_null(&val) => None,
        Ok(val) => match val.trim().parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn is_null(val: &str) -> bool {
    let val = val.trim();
    val.is_empty() || val.eq_ignore_ascii_case("none") || val.eq_ignore_ascii_case("null")
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ocr: OcrOptions,
    pub output: OutputConfig,
}

/// Where output stems are created.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub tmp_dir: PathBuf,
    pub stem_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl LogFormat {
    /// Read before `Config`, so that warnings from config parsing are logged.
    pub fn from_env() -> Self {
        parse_env_or("TESSRUN_LOG_FORMAT", LogFormat::Text)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tmp_dir: env::temp_dir(),
            stem_prefix: DEFAULT_STEM_PREFIX.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ocr: OcrOptions {
                l: parse_env_nullable("TESSRUN_LANG", Some(DEFAULT_LANGUAGE.to_string())),
                psm: parse_env_nullable("TESSRUN_PSM", Some(DEFAULT_PSM)),
                oem: parse_env_nullable("TESSRUN_OEM", Some(DEFAULT_OEM)),
                config: parse_env_nullable("TESSRUN_CONFIG", None),
                binary: env::var("TESSRUN_BINARY").unwrap_or_else(|_| DEFAULT_BINARY.to_string()),
                print_parameters: false,
                print_cmd: false,
                print_stdout: false,
                print_stderr: false,
                env: HashMap::new(),
            },
            output: OutputConfig {
                tmp_dir: env::var("TESSRUN_TMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| env::temp_dir()),
                stem_prefix: env::var("TESSRUN_STEM_PREFIX")
                    .unwrap_or_else(|_| DEFAULT_STEM_PREFIX.to_string()),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
