use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};
use tempfile::{NamedTempFile, TempPath};

use crate::{HashMap, PathEncodingError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Command template has no {{output}} placeholder")]
    NoOutputPlaceholder,
    #[error("Unbound placeholder {{{0}}} in command template")]
    UnboundPlaceholder(String),
    #[error("Unclosed placeholder in command template: {0}")]
    UnclosedPlaceholder(String),
    #[error("External step exited with {status}: {cmd}")]
    StepFailed { status: ExitStatus, cmd: String },
}

/// Run an external transformation step.
///
/// The template is rendered by binding one `{key}` placeholder per named
/// input path, plus the mandatory `{output}` placeholder, which is bound to
/// a private scratch file created in `scratch_dir`. The rendered command is
/// handed to `bash -o pipefail -c`, so multi-stage pipelines (decompress,
/// cut, sort, compress) fail as a unit and stream without loading inputs
/// into memory.
///
/// Returns the scratch path on exit status zero; the caller is expected to
/// promote it via [`OutputTarget::publish`], which is why the scratch file
/// must live on the same volume as the final artifact. On a non-zero exit
/// the scratch file is dropped and never promoted.
///
/// [`OutputTarget::publish`]: crate::OutputTarget::publish
pub fn shellout(template: &str, inputs: &[(&str, &Path)], scratch_dir: &Path) -> Result<TempPath> {
    if !template.contains("{output}") {
        return Err(Error::NoOutputPlaceholder.into());
    }

    let scratch = NamedTempFile::new_in(scratch_dir)
        .with_context(|| format!("creating scratch file in {scratch_dir:?}"))?
        .into_temp_path();

    // owned, so `scratch` itself can be moved out on success:
    let output = path_str(&scratch)?.to_owned();
    let mut bindings: HashMap<&str, &str> = HashMap::default();
    for &(name, path) in inputs {
        bindings.insert(name, path_str(path)?);
    }
    bindings.insert("output", &output);

    let cmd = render(template, &bindings)?;
    log::debug!("external step: {cmd}");

    let status = Command::new("bash")
        .arg("-o")
        .arg("pipefail")
        .arg("-c")
        .arg(&cmd)
        .stdin(Stdio::null())
        .status()
        .with_context(|| format!("spawning external step: {cmd}"))?;

    if status.success() {
        Ok(scratch)
    } else {
        Err(Error::StepFailed { status, cmd }.into())
    }
}

/// Substitute `{key}` placeholders; an unknown key is a configuration error.
fn render(template: &str, bindings: &HashMap<&str, &str>) -> Result<String, Error> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::UnclosedPlaceholder(rest.to_owned()))?;
        let key = &after[..end];
        let value = bindings
            .get(key)
            .ok_or_else(|| Error::UnboundPlaceholder(key.to_owned()))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn path_str(path: &Path) -> Result<&str, PathEncodingError> {
    path.to_str().ok_or(PathEncodingError)
}
