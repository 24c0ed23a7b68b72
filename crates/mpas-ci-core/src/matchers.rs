use regex::Regex;

/// First capture group of the first match of `pattern` in `text`.
///
/// An invalid pattern is treated like no match; callers pass literal
/// patterns only.
pub fn match_regex(pattern: &str, text: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
