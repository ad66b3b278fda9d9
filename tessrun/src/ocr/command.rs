use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use super::options::OcrOptions;

pub const PRINT_PARAMETERS_FLAG: &str = "--print-parameters";

/// Engine command line for a single invocation:
/// `<binary> <image> <stem> [-l <lang>] [-psm <mode>] [-oem <mode>] [<config>...] [--print-parameters]`
#[derive(Debug, Clone)]
pub struct EngineCommand {
    program: String,
    args: Vec<OsString>,
    envs: HashMap<String, String>,
}

impl EngineCommand {
    /// Fails only if `options.config` has an unbalanced quote or a trailing
    /// backslash.
    pub fn build(
        image: &Path,
        stem: &Path,
        options: &OcrOptions,
    ) -> Result<Self, shell_words::ParseError> {
        let mut args: Vec<OsString> = vec![image.into(), stem.into()];

        if let Some(lang) = &options.l {
            args.push("-l".into());
            args.push(lang.into());
        }

        if let Some(psm) = options.psm {
            args.push("-psm".into());
            args.push(psm.to_string().into());
        }

        if let Some(oem) = options.oem {
            args.push("-oem".into());
            args.push(oem.to_string().into());
        }

        // Tokenized with POSIX shell rules, so quoted values keep their spaces.
        if let Some(config) = &options.config {
            args.extend(shell_words::split(config)?.into_iter().map(OsString::from));
        }

        if options.print_parameters {
            args.push(PRINT_PARAMETERS_FLAG.into());
        }

        Ok(Self {
            program: options.binary.clone(),
            args,
            envs: options.env.clone(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Child process with captured output. The child is killed if the
    /// future awaiting it is dropped.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_words::quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}
