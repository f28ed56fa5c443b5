//! Repository URL handling shared by discovery and inspection.

/// Normalize a repository URL into a dedup key like `github.com/owner/repo`.
/// Strips protocol, credentials, trailing `.git`, and folds SSH `host:path` into `host/path`.
pub fn normalize(url: &str) -> String {
    let mut s = url.trim().to_lowercase();

    for prefix in &["https://", "http://", "ssh://", "git://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
            break;
        }
    }

    // user@ or token@ before the host
    if let Some(at_pos) = s.find('@') {
        let slash_pos = s.find('/').unwrap_or(s.len());
        if at_pos < slash_pos {
            s = s[at_pos + 1..].to_string();
        }
    }

    if let Some(colon_pos) = s.find(':') {
        if !s[..colon_pos].contains('/') {
            let rest = &s[colon_pos + 1..];
            // host:port/path keeps the port out of the key
            let rest = match rest.split_once('/') {
                Some((port, path)) if port.chars().all(|c| c.is_ascii_digit()) => path,
                _ => rest,
            };
            s = format!("{}/{}", &s[..colon_pos], rest);
        }
    }

    if let Some(q) = s.find(['?', '#']) {
        s.truncate(q);
    }

    s = s.trim_end_matches('/').to_string();
    if let Some(stripped) = s.strip_suffix(".git") {
        s = stripped.to_string();
    }

    s
}

/// Trailing two path segments of the URL, as `(owner, repo)`.
pub fn owner_and_name(url: &str) -> Option<(String, String)> {
    let normalized = normalize(url);
    let mut segments = normalized.rsplit('/').filter(|s| !s.is_empty());
    let name = segments.next()?;
    let owner = segments.next()?;
    // a bare host has no owner segment left after the name
    segments.next()?;
    Some((owner.to_string(), name.to_string()))
}
