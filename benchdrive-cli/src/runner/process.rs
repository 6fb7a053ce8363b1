//! Subprocess plumbing
//!
//! Scoped temporary script files and blocking command execution with
//! stdout and stderr captured into one stream.

use super::RunError;
use std::ffi::OsString;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

const SCRIPT_PREFIX: &str = "benchdrive-";
const SCRIPT_SUFFIX: &str = ".rb";

/// Write `script` to a fresh temporary file and hand its path to `f`.
///
/// The file is removed when `f` returns, whether it succeeded or not.
pub(crate) fn with_script<T, F>(script: &str, verbose: u8, f: F) -> Result<T, RunError>
where
    F: FnOnce(&Path) -> Result<T, RunError>,
{
    with_script_echoed(script, verbose, &mut io::stderr(), f)
}

/// `with_script`, echoing the script to `diagnostics` at verbosity 2 and up.
pub(crate) fn with_script_echoed<T, F, W>(
    script: &str,
    verbose: u8,
    diagnostics: &mut W,
    f: F,
) -> Result<T, RunError>
where
    F: FnOnce(&Path) -> Result<T, RunError>,
    W: Write,
{
    if verbose >= 2 {
        let sep = "-".repeat(30);
        write!(
            diagnostics,
            "\n\n{sep}[Script begin]{sep}\n{script}{sep}[Script end]{sep}\n\n"
        )?;
    }

    let mut file = tempfile::Builder::new()
        .prefix(SCRIPT_PREFIX)
        .suffix(SCRIPT_SUFFIX)
        .tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;
    let path = file.into_temp_path();

    let result = f(&path);
    let removed = path.close();
    let value = result?;
    removed?;
    Ok(value)
}

/// Run `command` to completion and return its combined output.
///
/// A non-zero exit is an error carrying the exit status and the output.
pub(crate) fn execute(command: &[OsString]) -> Result<String, RunError> {
    let shown = shell_join(command);
    let Some((program, args)) = command.split_first() else {
        return Err(RunError::Spawn {
            command: shown,
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    };
    debug!(command = %shown, "Executing");

    // One file behind both descriptors keeps the two streams interleaved.
    let mut capture = tempfile::tempfile()?;
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(capture.try_clone()?)
        .stderr(capture.try_clone()?)
        .status()
        .map_err(|source| RunError::Spawn {
            command: shown.clone(),
            source,
        })?;

    capture.seek(SeekFrom::Start(0))?;
    let mut raw = Vec::new();
    capture.read_to_end(&mut raw)?;
    let output = String::from_utf8_lossy(&raw).into_owned();

    if !status.success() {
        return Err(RunError::CommandFailed {
            command: shown,
            status: describe_status(status),
            output,
        });
    }
    Ok(output)
}

fn describe_status(status: ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => code.to_string(),
        (None, Some(signal)) => format!("signal {signal}"),
        (None, None) => "unknown".to_string(),
    }
}

fn shell_join(command: &[OsString]) -> String {
    command
        .iter()
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'') {
                format!("'{}'", arg.replace('\'', r"'\''"))
            } else {
                arg.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
