use anyhow::Context;
use std::path::Path;

/// Sets `attr` on the first element (document order, root excluded) whose
/// `name` attribute equals `node`, then writes the file back.
///
/// The edit is spliced into the original text, so formatting and comments
/// elsewhere in the file survive. Returns `false` when nothing matched, in
/// which case the file is left as is.
pub fn update_stream_node(
    path: &Path,
    node: &str,
    attr: &str,
    value: &str,
) -> anyhow::Result<bool> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read streams file {}", path.display()))?;

    let Some(out) = set_attribute(&raw, node, attr, value)? else {
        tracing::debug!(event = "stream_node_missing", path = %path.display(), node);
        return Ok(false);
    };

    std::fs::write(path, out)
        .with_context(|| format!("failed to write streams file {}", path.display()))?;
    tracing::debug!(event = "stream_update", path = %path.display(), node, attr, value);
    Ok(true)
}

pub(crate) fn set_attribute(
    raw: &str,
    node: &str,
    attr: &str,
    value: &str,
) -> anyhow::Result<Option<String>> {
    let doc = roxmltree::Document::parse(raw).context("failed to parse streams XML")?;

    let Some(target) = doc
        .root_element()
        .descendants()
        .skip(1)
        .filter(|n| n.is_element())
        .find(|n| n.attribute("name") == Some(node))
    else {
        return Ok(None);
    };

    let escaped = escape_attr(value);
    let mut out = String::with_capacity(raw.len() + escaped.len() + attr.len() + 4);

    if let Some(existing) = target.attributes().find(|a| a.name() == attr) {
        let range = existing.range();
        let qname = raw[range.clone()]
            .split('=')
            .next()
            .unwrap_or(attr)
            .trim_end();
        out.push_str(&raw[..range.start]);
        out.push_str(&format!("{qname}=\"{escaped}\""));
        out.push_str(&raw[range.end..]);
    } else {
        let at = match target.attributes().last() {
            Some(a) => a.range().end,
            None => tag_name_end(raw, target.range().start),
        };
        out.push_str(&raw[..at]);
        out.push_str(&format!(" {attr}=\"{escaped}\""));
        out.push_str(&raw[at..]);
    }

    Ok(Some(out))
}

fn tag_name_end(raw: &str, tag_start: usize) -> usize {
    let name_start = tag_start + 1;
    raw[name_start..]
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .map(|i| name_start + i)
        .unwrap_or(raw.len())
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
