//! Run-directory population: links, copies, and per-step file edits.

use crate::edit::{nml_replace, update_stream_node};
use crate::plan::{Directive, Inputs};
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::symlink;
#[cfg(windows)]
use std::os::windows::fs::symlink_file as symlink;

/// Creates `dir` if missing. Returns `true` when it was created.
pub fn create_directory(dir: &Path) -> anyhow::Result<bool> {
    if dir.exists() {
        println!("Directory {} already exists.", dir.display());
        return Ok(false);
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;
    println!("Directory {} created.", dir.display());
    Ok(true)
}

pub fn file_name(path: &str) -> anyhow::Result<&str> {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("path '{path}' has no file name"))
}

/// Links `target` at `link`, replacing whatever a previous run left there.
pub fn replace_symlink(target: &Path, link: &Path) -> anyhow::Result<()> {
    if link.symlink_metadata().is_ok() {
        std::fs::remove_file(link)
            .with_context(|| format!("failed to remove stale {}", link.display()))?;
    }
    symlink(target, link).with_context(|| {
        format!(
            "failed to link {} -> {}",
            link.display(),
            target.display()
        )
    })?;
    tracing::debug!(event = "symlink", link = %link.display(), target = %target.display());
    Ok(())
}

fn copy_into(src: &str, dir: &Path) -> anyhow::Result<PathBuf> {
    let dest = dir.join(file_name(src)?);
    if dest.symlink_metadata().is_ok() {
        std::fs::remove_file(&dest)
            .with_context(|| format!("failed to remove stale {}", dest.display()))?;
    }
    std::fs::copy(src, &dest)
        .with_context(|| format!("failed to copy {src} to {}", dest.display()))?;
    Ok(dest)
}

/// Links the executable, mesh, initial conditions, and partition files into
/// `dir` and copies the editable namelist and stream files.
pub fn populate(dir: &Path, inputs: &Inputs, executable: &str) -> anyhow::Result<()> {
    replace_symlink(Path::new(&inputs.model), &dir.join(executable))?;
    println!("Symbolic link to compiled program created in {}", dir.display());

    for p in [&inputs.grid, &inputs.init] {
        replace_symlink(Path::new(p), &dir.join(file_name(p)?))?;
    }

    if let Some(pattern) = &inputs.partition {
        let mut n = 0;
        for entry in glob::glob(pattern).with_context(|| format!("bad partition glob '{pattern}'"))? {
            let path = entry?;
            let name = path
                .file_name()
                .with_context(|| format!("partition match {} has no file name", path.display()))?;
            replace_symlink(&path, &dir.join(name))?;
            n += 1;
        }
        if n == 0 {
            tracing::warn!(event = "partition_glob_empty", pattern = %pattern);
        }
    }

    copy_into(&inputs.nml, dir)?;
    copy_into(&inputs.stream, dir)?;
    if let Some(p) = &inputs.stream_out {
        copy_into(p, dir)?;
    }
    Ok(())
}

pub fn apply_directive(dir: &Path, inputs: &Inputs, d: &Directive) -> anyhow::Result<()> {
    match d {
        Directive::Symlink(targets) => {
            for t in targets {
                replace_symlink(Path::new(t), &dir.join(file_name(t)?))?;
            }
        }
        Directive::UpdateNml(pairs) => {
            let nml = dir.join(file_name(&inputs.nml)?);
            for (key, value) in pairs {
                if nml_replace(&nml, key, value)? == 0 {
                    tracing::warn!(event = "nml_key_missing", key = %key, path = %nml.display());
                }
            }
        }
        Directive::UpdateStream(edits) => {
            let streams = dir.join(file_name(&inputs.stream)?);
            if !streams.is_file() {
                bail!("streams file {} missing", streams.display());
            }
            for e in edits {
                if !update_stream_node(&streams, &e.node, &e.attr, &e.value)? {
                    tracing::warn!(event = "stream_node_missing", node = %e.node, path = %streams.display());
                }
            }
        }
    }
    Ok(())
}
