use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::error::Result;

pub const DEFAULT_BINARY: &str = "tesseract";
pub const DEFAULT_LANGUAGE: &str = "eng";
/// Fully automatic page segmentation, but no OSD.
pub const DEFAULT_PSM: u32 = 3;
/// Original Tesseract engine only.
pub const DEFAULT_OEM: u32 = 0;

/// Fully resolved engine options for one invocation.
///
/// The nullable flags (`l`, `psm`, `oem`, `config`) are omitted from the
/// command line when `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOptions {
    pub l: Option<String>,
    pub psm: Option<u32>,
    pub oem: Option<u32>,
    pub config: Option<String>,
    pub binary: String,
    /// Adds `--print-parameters` to the engine command line.
    pub print_parameters: bool,
    // The three flags below only gate `tracing` events at `info` level. They
    // print nothing unless a subscriber that accepts `info` is installed.
    /// Log the engine command line.
    pub print_cmd: bool,
    /// Log the engine's stdout after a successful run.
    pub print_stdout: bool,
    /// Log the engine's stderr after a successful run.
    pub print_stderr: bool,
    pub env: HashMap<String, String>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            l: Some(DEFAULT_LANGUAGE.to_string()),
            psm: Some(DEFAULT_PSM),
            oem: Some(DEFAULT_OEM),
            config: None,
            binary: DEFAULT_BINARY.to_string(),
            print_parameters: false,
            print_cmd: false,
            print_stdout: false,
            print_stderr: false,
            env: HashMap::new(),
        }
    }
}

impl OcrOptions {
    /// Shallow merge: every key the caller set wins, every other key keeps
    /// the value from `self`. `env` is replaced as a whole, not merged.
    pub fn merge(&self, overrides: &OcrOverrides) -> OcrOptions {
        OcrOptions {
            l: overrides.l.clone().unwrap_or_else(|| self.l.clone()),
            psm: overrides.psm.unwrap_or(self.psm),
            oem: overrides.oem.unwrap_or(self.oem),
            config: overrides.config.clone().unwrap_or_else(|| self.config.clone()),
            binary: overrides
                .binary
                .clone()
                .unwrap_or_else(|| self.binary.clone()),
            print_parameters: overrides.print_parameters.unwrap_or(self.print_parameters),
            print_cmd: overrides.print_cmd.unwrap_or(self.print_cmd),
            print_stdout: overrides.print_stdout.unwrap_or(self.print_stdout),
            print_stderr: overrides.print_stderr.unwrap_or(self.print_stderr),
            env: overrides.env.clone().unwrap_or_else(|| self.env.clone()),
        }
    }
}

/// Caller-supplied options, layered over [`OcrOptions`] with [`OcrOptions::merge`].
///
/// Nullable keys are tri-state: `None` keeps the default, `Some(None)`
/// disables the flag, `Some(Some(v))` sets it. In JSON this is
/// absent / `null` / value, using the camelCase key names
/// (`printParameters`, `printCmd`, `printStdout`, `printStderr`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrOverrides {
    #[serde(default, deserialize_with = "explicit")]
    pub l: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub psm: Option<Option<u32>>,
    #[serde(default, deserialize_with = "explicit")]
    pub oem: Option<Option<u32>>,
    #[serde(default, deserialize_with = "explicit")]
    pub config: Option<Option<String>>,
    pub binary: Option<String>,
    pub print_parameters: Option<bool>,
    pub print_cmd: Option<bool>,
    pub print_stdout: Option<bool>,
    pub print_stderr: Option<bool>,
    pub env: Option<HashMap<String, String>>,
}

// A present key, even `null`, becomes `Some(..)`; a missing key falls back to
// `#[serde(default)]` and stays `None`.
fn explicit<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl OcrOverrides {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.l = Some(Some(lang.into()));
        self
    }

    pub fn psm(mut self, mode: u32) -> Self {
        self.psm = Some(Some(mode));
        self
    }

    pub fn oem(mut self, mode: u32) -> Self {
        self.oem = Some(Some(mode));
        self
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = Some(binary.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let defaults = OcrOptions::default();
        assert_eq!(defaults.l.as_deref(), Some("eng"));
        assert_eq!(defaults.psm, Some(3));
        assert_eq!(defaults.oem, Some(0));
        assert!(defaults.config.is_none());
        assert_eq!(defaults.binary, "tesseract");
        assert!(!defaults.print_parameters);
        assert!(!defaults.print_cmd);
        assert!(!defaults.print_stdout);
        assert!(!defaults.print_stderr);
        assert!(defaults.env.is_empty());
    }

    #[test]
    fn test_empty_overrides_keep_defaults() {
        let defaults = OcrOptions::default();
        assert_eq!(defaults.merge(&OcrOverrides::default()), defaults);
    }

    #[test]
    fn test_caller_keys_win_over_defaults() {
        let overrides = OcrOverrides::default()
            .language("fra")
            .psm(6)
            .binary("/opt/tesseract/bin/tesseract");

        let merged = OcrOptions::default().merge(&overrides);

        assert_eq!(merged.l.as_deref(), Some("fra"));
        assert_eq!(merged.psm, Some(6));
        assert_eq!(merged.binary, "/opt/tesseract/bin/tesseract");
        // untouched keys keep their defaults
        assert_eq!(merged.oem, Some(0));
        assert!(merged.config.is_none());
    }

    #[test]
    fn test_explicit_null_disables_flag() {
        let overrides = OcrOverrides {
            oem: Some(None),
            l: Some(None),
            ..Default::default()
        };

        let merged = OcrOptions::default().merge(&overrides);

        assert!(merged.oem.is_none());
        assert!(merged.l.is_none());
        assert_eq!(merged.psm, Some(3));
    }

    #[test]
    fn test_env_is_replaced_not_merged() {
        let mut base = OcrOptions::default();
        base.env.insert("OMP_THREAD_LIMIT".to_string(), "1".to_string());

        let overrides = OcrOverrides {
            env: Some(HashMap::from([(
                "TESSDATA_PREFIX".to_string(),
                "/usr/share/tessdata".to_string(),
            )])),
            ..Default::default()
        };

        let merged = base.merge(&overrides);
        assert_eq!(merged.env.len(), 1);
        assert_eq!(
            merged.env.get("TESSDATA_PREFIX").map(String::as_str),
            Some("/usr/share/tessdata")
        );
    }

    #[test]
    fn test_from_json_distinguishes_null_from_absent() {
        let overrides =
            OcrOverrides::from_json(r#"{"l": "fra", "psm": 6, "oem": null, "printCmd": true}"#)
                .unwrap();

        assert_eq!(overrides.l, Some(Some("fra".to_string())));
        assert_eq!(overrides.psm, Some(Some(6)));
        assert_eq!(overrides.oem, Some(None));
        assert_eq!(overrides.config, None);
        assert_eq!(overrides.print_cmd, Some(true));
        assert_eq!(overrides.print_stdout, None);
    }

    #[test]
    fn test_from_json_ignores_unknown_keys() {
        let overrides = OcrOverrides::from_json(r#"{"dpi": 300, "psm": 11}"#).unwrap();
        assert_eq!(overrides.psm, Some(Some(11)));
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        let result = OcrOverrides::from_json(r#"{"psm": "six"}"#);
        assert!(matches!(
            result,
            Err(crate::error::TessrunError::InvalidOptions(_))
        ));
    }
}
