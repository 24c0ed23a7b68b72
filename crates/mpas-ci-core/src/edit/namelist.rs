use anyhow::Context;
use std::path::Path;

/// Rewrites every line whose trimmed text starts with `key` as `key = value`.
///
/// Matching is a plain prefix test: `config_dt` also hits a
/// `config_dt_max = ...` line. Anything after the value on a matched line,
/// comments included, is dropped. Other lines are written back untouched.
/// Returns the number of replaced lines.
pub fn nml_replace(path: &Path, key: &str, value: &str) -> anyhow::Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read namelist {}", path.display()))?;

    let (out, replaced) = replace_lines(&raw, key, value);

    std::fs::write(path, out)
        .with_context(|| format!("failed to write namelist {}", path.display()))?;
    tracing::debug!(event = "nml_replace", path = %path.display(), key, value, replaced);
    Ok(replaced)
}

pub(crate) fn replace_lines(raw: &str, key: &str, value: &str) -> (String, usize) {
    let mut out = String::with_capacity(raw.len());
    let mut replaced = 0;
    for line in raw.split_inclusive('\n') {
        if line.trim().starts_with(key) {
            out.push_str(&format!("{key} = {value}\n"));
            replaced += 1;
        } else {
            out.push_str(line);
        }
    }
    (out, replaced)
}
