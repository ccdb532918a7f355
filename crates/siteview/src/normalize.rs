const DEFAULT_SCHEME: &str = "https://";

/// Prefix `https://` unless the input already carries an http(s) scheme.
///
/// Nothing else is checked: a malformed address is handed to the renderer
/// as-is and comes back as a load error.
pub fn normalize_url(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{raw}")
    }
}
