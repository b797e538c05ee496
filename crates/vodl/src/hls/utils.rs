use std::sync::LazyLock;

use regex::Regex;

static SCHEME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid scheme regex"));

/// Directory part of a playlist URI, used as the base of its relative entries.
///
/// `https://example.com/a/index.m3u8?token=1` -> `https://example.com/a`
pub fn base_uri(uri: &str) -> &str {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    let path = &uri[..end];
    match path.rsplit_once('/') {
        // keep `https://host` intact when the playlist sits at the root
        Some((base, _)) if !base.ends_with('/') => base,
        _ => path,
    }
}

pub fn has_scheme(uri: &str) -> bool {
    SCHEME_REGEX.is_match(uri)
}

/// Resolve a playlist entry against its base.
///
/// Relative entries are appended to the base with a `/`; `.` and `..` are left as is.
/// Entries starting with `/` are resolved against the origin of the base.
/// With an empty base the entry is returned unchanged, so `a.ts` stays `a.ts`.
pub fn resolve_uri(base: &str, uri: &str) -> String {
    if has_scheme(uri) || base.is_empty() {
        return uri.to_string();
    }

    if let Some(path) = uri.strip_prefix('/') {
        return format!("{}/{path}", origin(base));
    }

    format!("{}/{uri}", base.trim_end_matches('/'))
}

/// `scheme://host[:port]` of an absolute URI.
fn origin(uri: &str) -> &str {
    let Some(scheme_end) = uri.find("://") else {
        return uri.trim_end_matches('/');
    };
    let authority_start = scheme_end + 3;
    match uri[authority_start..].find('/') {
        Some(slash) => &uri[..authority_start + slash],
        None => uri,
    }
}
